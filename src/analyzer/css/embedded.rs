//! CSS-in-JS 片段提取
//! - 标签模板：styled.x`…` / styled(X)`…` / css`…` / createGlobalStyle / keyframes / injectGlobal
//! - 对象字面量：style={{…}} / sx={{…}} / css({…}) / styled.x({…})

use super::{CssAnalyzer, CssDialect};
use crate::engine::CancelFlag;
use crate::error::BlResult;
use crate::model::DetectedFeature;
use crate::utils::SpanMapper;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

pub const CSS_IN_JS_CONTEXT: &str = "CSS-in-JS";

static TAGGED_TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:styled\s*\.\s*[A-Za-z_$][\w$]*|styled\s*\(\s*[\w$.]+\s*\)|css|createGlobalStyle|keyframes|injectGlobal)\s*`",
    )
    .unwrap()
});

static OBJECT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\b(?:style|sx)\s*=\s*\{\s*\{|\b(?:css|styled\s*\.\s*[A-Za-z_$][\w$]*|styled\s*\(\s*[\w$.]+\s*\))\s*\(\s*\{)",
    )
    .unwrap()
});

/// 对象字面量中的字面量键值对（嵌套对象的值不匹配）
static STYLE_PAIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:^|[{,\s])([A-Za-z_$][\w$]*|'[^'\n]*'|"[^"\n]*")\s*:\s*('[^'\n]*'|"[^"\n]*"|-?\d[\w.%]*)"#,
    )
    .unwrap()
});

impl CssAnalyzer {
    /// 扫描脚本源码中的嵌入样式；`mapper` 把 `source` 内偏移映射到外层文档
    pub fn scan_embedded(
        &self,
        source: &str,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let mut features = Vec::new();

        for m in TAGGED_TEMPLATE.find_iter(source) {
            cancel.check()?;
            let body_start = m.end();
            let Some((body_end, blanked)) = template_body(source, body_start) else {
                continue;
            };
            debug!("CSS-in-JS template at {}..{}", body_start, body_end);
            let found =
                self.analyze_fragment(&blanked, CssDialect::Scss, mapper.shift(body_start), cancel)?;
            features.extend(found);
        }

        for m in OBJECT_STYLE.find_iter(source) {
            cancel.check()?;
            let open = m.end() - 1;
            let Some(close) = matching_brace(source, open) else {
                continue;
            };
            let object = &source[open..=close];
            for caps in STYLE_PAIR.captures_iter(object) {
                let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let property = css_property_name(strip_quotes(key.as_str()));
                let declaration = format!("{}: {};", property, strip_quotes(value.as_str()));
                let pinned = SpanMapper::Pinned(mapper.range(open + key.start(), open + value.end()));
                let found =
                    self.analyze_fragment(&declaration, CssDialect::Scss, pinned, cancel)?;
                features.extend(found);
            }
        }

        Ok(features
            .into_iter()
            .map(|f| f.with_default_context(CSS_IN_JS_CONTEXT))
            .collect())
    }
}

/// 模板体：从反引号后开始到闭合反引号，`${…}` 插值置空（保留换行与偏移）
fn template_body(source: &str, start: usize) -> Option<(usize, String)> {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(64);
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b'`' => return Some((i, String::from_utf8(out).ok()?)),
            b'\\' => {
                out.push(b' ');
                i += 1;
                // 被转义的多字节字符整体保留，保证输出仍是合法 UTF-8
                let escaped = source[i..].chars().next();
                match escaped {
                    Some('\n') => out.push(b'\n'),
                    Some(c) if c.is_ascii() => out.push(b' '),
                    Some(c) => out.extend_from_slice(&bytes[i..i + c.len_utf8()]),
                    None => {}
                }
                i += escaped.map_or(0, char::len_utf8);
            }
            b'$' if bytes.get(i + 1) == Some(&b'{') => {
                let close = matching_brace(source, i + 1)?;
                for &b in &bytes[i..=close] {
                    out.push(if b == b'\n' { b'\n' } else { b' ' });
                }
                i = close + 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    None
}

/// 从 `open` 处的 `{` 找到配对的 `}`（跳过字符串与模板字面量）
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' | b'`' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn strip_quotes(raw: &str) -> &str {
    raw.trim_matches(|c| c == '\'' || c == '"')
}

/// camelCase → kebab-case；`Webkit` / `Moz` / `ms` 前缀补 `-`
pub fn css_property_name(key: &str) -> String {
    if key.starts_with("--") || !key.chars().any(|c| c.is_ascii_uppercase()) {
        return key.to_string();
    }
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    let out = out.trim_start_matches('-').to_string();
    if out.starts_with("webkit-") || out.starts_with("moz-") || out.starts_with("ms-") {
        format!("-{}", out)
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Range;
    use crate::taxonomy::TaxonomyService;
    use crate::utils::LineIndex;
    use std::sync::Arc;

    fn scan(source: &str) -> Vec<DetectedFeature> {
        let analyzer = CssAnalyzer::new(Arc::new(TaxonomyService::embedded()));
        let index = LineIndex::new(source);
        analyzer
            .scan_embedded(source, SpanMapper::root(&index), &CancelFlag::new())
            .unwrap()
    }

    #[test]
    fn test_styled_template_with_interpolation() {
        let source = "const Box = styled.div`\n  color: ${p => p.c};\n  display: grid;\n`;";
        let features = scan(source);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "css.properties.display.grid");
        assert_eq!(features[0].range, Range::single_line(2, 2, 15));
        assert_eq!(features[0].context.as_deref(), Some(CSS_IN_JS_CONTEXT));
    }

    #[test]
    fn test_object_literal_styles_are_pinned() {
        let source = "<div style={{ containerType: 'inline-size', color: 'red' }} />";
        let features = scan(source);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "css.properties.container-type");
        let start = source.find("containerType").unwrap() as u32;
        let end = source.find("'inline-size'").unwrap() as u32 + 13;
        assert_eq!(features[0].range, Range::single_line(0, start, end));
    }

    #[test]
    fn test_broken_fragment_is_skipped() {
        let source = "css`a { color: red;` + css`gap: 1px;`";
        let features = scan(source);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "css.properties.gap");
    }

    #[test]
    fn test_escaped_multibyte_character() {
        let source = "const s = css`content: \"\\é\"; gap: 1px;`;";
        let features = scan(source);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "css.properties.gap");
        let start = source[..source.find("gap").unwrap()].chars().count() as u32;
        assert_eq!(features[0].range, Range::single_line(0, start, start + 8));

        let (end, body) = template_body("\\é a`", 0).unwrap();
        assert_eq!(end, 5);
        assert_eq!(body, " é a");
    }

    #[test]
    fn test_property_names() {
        assert_eq!(css_property_name("backgroundColor"), "background-color");
        assert_eq!(css_property_name("WebkitLineClamp"), "-webkit-line-clamp");
        assert_eq!(css_property_name("msTransform"), "-ms-transform");
        assert_eq!(css_property_name("gap"), "gap");
        assert_eq!(css_property_name("--x"), "--x");
    }

    #[test]
    fn test_template_body_blanks_nested_braces() {
        let (end, body) = template_body("a: ${ {x: 1}.x }px`", 0).unwrap();
        assert_eq!(end, 18);
        assert_eq!(body.len(), 18);
        assert!(body.starts_with("a: "));
        assert!(body.ends_with("px"));
    }
}
