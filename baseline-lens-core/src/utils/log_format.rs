use std::fmt::{self, Write};

// ======================== 日志片段预览 ========================
/// 源码片段日志预览：空白折叠 + 按字符截断，超长补省略号
/// 惰性格式化，不分配中间 String
#[inline]
pub fn preview_compact(s: &str, max_chars: usize) -> impl fmt::Display + '_ {
    struct CompactView<'a> {
        source: &'a str,
        max_chars: usize,
    }

    impl fmt::Display for CompactView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let mut written = 0;
            let mut in_whitespace = false;

            for ch in self.source.trim().chars() {
                if written >= self.max_chars {
                    f.write_char('…')?;
                    break;
                }
                if ch.is_whitespace() {
                    if in_whitespace {
                        continue;
                    }
                    f.write_char(' ')?;
                    in_whitespace = true;
                } else {
                    f.write_char(ch)?;
                    in_whitespace = false;
                }
                written += 1;
            }
            Ok(())
        }
    }

    CompactView {
        source: s,
        max_chars,
    }
}

/// 键列表日志格式：[k1, k2, …] (total: N)
pub fn compress_key_list<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    const MAX_COUNT: usize = 8;
    const MAX_KEY_LEN: usize = 48;

    let mut result = String::from("[");
    let mut total = 0usize;
    for key in keys {
        if total < MAX_COUNT {
            if total > 0 {
                result.push_str(", ");
            }
            let _ = write!(result, "{}", preview_compact(key, MAX_KEY_LEN));
        }
        total += 1;
    }
    if total == 0 {
        return "[empty]".to_string();
    }
    if total > MAX_COUNT {
        let _ = write!(result, ", … (total: {})", total);
    }
    result.push(']');
    result
}
