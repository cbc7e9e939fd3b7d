//! 词法定位器：把分词器产出的开始标签顺序映射回源码字节区间
//! 分词器负责语义（名称、解码后的属性值），定位器只负责位置

/// 属性在源码中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrSpan {
    /// 小写属性名
    pub name: String,
    pub name_start: usize,
    pub name_end: usize,
    /// 原始值区间（不含引号）；无值属性为 None
    pub value_span: Option<(usize, usize)>,
    /// 整个属性的结束偏移（含结尾引号）
    pub end: usize,
}

impl AttrSpan {
    pub fn value<'s>(&self, source: &'s str) -> &'s str {
        self.value_span
            .map(|(s, e)| &source[s..e])
            .unwrap_or("")
    }
}

/// 开始标签在源码中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan {
    /// `<` 所在偏移
    pub start: usize,
    pub name_end: usize,
    /// `>` 之后的偏移
    pub end: usize,
    pub attrs: Vec<AttrSpan>,
}

impl TagSpan {
    pub fn attr(&self, name: &str) -> Option<&AttrSpan> {
        self.attrs.iter().find(|a| a.name == name)
    }
}

/// ASCII 大小写不敏感查找
pub fn find_ci(source: &str, needle: &str, from: usize) -> Option<usize> {
    let hay = source.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || needle.len() > hay.len() || from > hay.len() - needle.len() {
        return None;
    }
    (from..=hay.len() - needle.len())
        .find(|&i| hay[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

#[inline]
fn is_tag_name_byte(b: u8) -> bool {
    !(b.is_ascii_whitespace() || b == b'/' || b == b'>')
}

/// 从 `start`（`<`）解析开始标签；未闭合返回 None
pub fn parse_open_tag(source: &str, start: usize) -> Option<TagSpan> {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() && is_tag_name_byte(bytes[i]) {
        i += 1;
    }
    let name_end = i;
    let mut attrs = Vec::new();

    loop {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        match bytes.get(i) {
            None => return None,
            Some(b'>') => {
                return Some(TagSpan {
                    start,
                    name_end,
                    end: i + 1,
                    attrs,
                })
            }
            Some(_) => {}
        }

        let name_start = i;
        // 属性名首字符可以是 `=`（HTML 规范允许），之后遇 `=` 截止
        i += 1;
        while i < bytes.len()
            && !(bytes[i].is_ascii_whitespace() || matches!(bytes[i], b'/' | b'>' | b'='))
        {
            i += 1;
        }
        let name_end_attr = i;

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let mut value_span = None;
        let mut attr_end = name_end_attr;
        if bytes.get(j) == Some(&b'=') {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let close = source[j + 1..].find(q as char).map(|p| j + 1 + p)?;
                    value_span = Some((j + 1, close));
                    i = close + 1;
                    attr_end = i;
                }
                Some(_) => {
                    let vs = j;
                    while j < bytes.len() && !(bytes[j].is_ascii_whitespace() || bytes[j] == b'>') {
                        j += 1;
                    }
                    value_span = Some((vs, j));
                    i = j;
                    attr_end = j;
                }
                None => return None,
            }
        }

        attrs.push(AttrSpan {
            name: source[name_start..name_end_attr].to_ascii_lowercase(),
            name_start,
            name_end: name_end_attr,
            value_span,
            end: attr_end,
        });
    }
}

/// 顺序定位器：游标只前进，与分词器的标签流同步
#[derive(Debug)]
pub struct TagLocator<'s> {
    source: &'s str,
    cursor: usize,
}

impl<'s> TagLocator<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source, cursor: 0 }
    }

    /// 定位下一个名为 `name` 的开始标签；跳过注释、声明、结束标签和其他标签
    /// 找不到时游标不动
    pub fn next_start_tag(&mut self, name: &str) -> Option<TagSpan> {
        let bytes = self.source.as_bytes();
        let mut i = self.cursor;

        while let Some(rel) = self.source.get(i..)?.find('<') {
            let lt = i + rel;
            let rest = &self.source[lt..];
            if rest.starts_with("<!--") {
                // `<!-->` 与 `<!--->` 本身即完整的空注释
                i = if rest.starts_with("<!-->") {
                    lt + 5
                } else if rest.starts_with("<!--->") {
                    lt + 6
                } else {
                    rest[4..].find("-->").map_or(bytes.len(), |p| lt + 4 + p + 3)
                };
                continue;
            }
            match bytes.get(lt + 1) {
                Some(b'!') | Some(b'?') | Some(b'/') => {
                    i = rest.find('>').map_or(bytes.len(), |p| lt + p + 1);
                    continue;
                }
                Some(b) if b.is_ascii_alphabetic() => {}
                _ => {
                    i = lt + 1;
                    continue;
                }
            }

            let Some(tag) = parse_open_tag(self.source, lt) else {
                return None;
            };
            let tag_name = &self.source[lt + 1..tag.name_end];
            if tag_name.eq_ignore_ascii_case(name) {
                self.cursor = tag.end;
                return Some(tag);
            }
            i = tag.end;
        }
        None
    }

    /// 原始文本元素（script / style 等）：内容区间为当前游标到 `</name`
    pub fn skip_raw_text(&mut self, name: &str) -> (usize, usize) {
        let start = self.cursor;
        let close = find_ci(self.source, &format!("</{}", name), start).unwrap_or(self.source.len());
        self.cursor = close;
        (start, close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_tag_attributes() {
        let src = r#"<input type="date" disabled data-x=1 title='a > b'>"#;
        let tag = parse_open_tag(src, 0).unwrap();
        assert_eq!(tag.name_end, 6);
        assert_eq!(tag.end, src.len());
        let names: Vec<_> = tag.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["type", "disabled", "data-x", "title"]);
        assert_eq!(tag.attr("type").unwrap().value(src), "date");
        assert_eq!(tag.attr("disabled").unwrap().value_span, None);
        assert_eq!(tag.attr("data-x").unwrap().value(src), "1");
        assert_eq!(tag.attr("title").unwrap().value(src), "a > b");
        assert_eq!(tag.attr("type").unwrap().end, 18);
        assert_eq!(tag.attr("disabled").unwrap().end, 27);
    }

    #[test]
    fn test_locator_skips_comments_and_other_tags() {
        let src = "<!-- <dialog> --><div class=a><DIALOG open></dialog></div>";
        let mut locator = TagLocator::new(src);
        let div = locator.next_start_tag("div").unwrap();
        assert_eq!(div.start, 17);
        let dialog = locator.next_start_tag("dialog").unwrap();
        assert_eq!(&src[dialog.start..dialog.name_end], "<DIALOG");
        assert!(locator.next_start_tag("dialog").is_none());
    }

    #[test]
    fn test_abruptly_closed_comments() {
        let src = "<!--><dialog></dialog><!---><p><!---- <b> -->";
        let mut locator = TagLocator::new(src);
        let dialog = locator.next_start_tag("dialog").unwrap();
        assert_eq!(dialog.start, 5);
        let p = locator.next_start_tag("p").unwrap();
        assert_eq!(p.start, 28);
        assert!(locator.next_start_tag("b").is_none());
    }

    #[test]
    fn test_raw_text_span() {
        let src = "<style>a < b {}</STYLE><p>";
        let mut locator = TagLocator::new(src);
        locator.next_start_tag("style").unwrap();
        let (start, end) = locator.skip_raw_text("style");
        assert_eq!(&src[start..end], "a < b {}");
        assert!(locator.next_start_tag("p").is_some());
    }

    #[test]
    fn test_find_ci() {
        assert_eq!(find_ci("abcABC", "abc", 1), Some(3));
        assert_eq!(find_ci("abc", "abcd", 0), None);
    }
}
