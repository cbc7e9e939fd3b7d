//! 基于 cssparser 词法流的带源码偏移 CST
//! 只区分三类节点：声明 / 规则 / at 规则，足够特性检测使用
//! 所有偏移均为片段内字节偏移

use cssparser::{ParseError, ParseErrorKind, Parser, ParserInput, Token};
use std::fmt;

/// 样式方言
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssDialect {
    Css,
    Scss,
    Less,
}

impl CssDialect {
    /// 预处理器允许无冒号语句（mixin 调用等）
    fn allows_bare_statements(self) -> bool {
        !matches!(self, CssDialect::Css)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// 原样属性名（未转小写）
    pub property: String,
    pub property_span: Span,
    /// 冒号后的原始值文本（已去首尾空白）
    pub value: String,
    pub value_span: Span,
    /// 值中的第一个标识符
    pub first_ident: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub selector: String,
    pub selector_span: Span,
    pub children: Vec<CssNode>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    pub name: String,
    /// `@name` 关键字区间
    pub name_span: Span,
    pub prelude: String,
    pub prelude_span: Span,
    pub block: Option<Vec<CssNode>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Declaration(Declaration),
    Rule(Rule),
    AtRule(AtRule),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub nodes: Vec<CssNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssErrorKind {
    UnclosedBlock,
    UnexpectedClose(char),
    UnterminatedString,
    UnterminatedComment,
    BadUrl,
    MissingColon,
}

/// 语法错误（片段内字节偏移）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CssSyntaxError {
    pub kind: CssErrorKind,
    pub offset: usize,
}

impl fmt::Display for CssSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            CssErrorKind::UnclosedBlock => f.write_str("Unclosed block"),
            CssErrorKind::UnexpectedClose(c) => write!(f, "Unexpected '{}'", c),
            CssErrorKind::UnterminatedString => f.write_str("Unclosed string"),
            CssErrorKind::UnterminatedComment => f.write_str("Unclosed comment"),
            CssErrorKind::BadUrl => f.write_str("Malformed url()"),
            CssErrorKind::MissingColon => f.write_str("Unknown word"),
        }
    }
}

impl std::error::Error for CssSyntaxError {}

type ItemsResult<'i, T> = Result<T, ParseError<'i, CssSyntaxError>>;

/// 解析整个样式表；任一语法错误即失败
pub fn parse_stylesheet(source: &str, dialect: CssDialect) -> Result<Stylesheet, CssSyntaxError> {
    let prepared;
    let text = if dialect.allows_bare_statements() {
        prepared = blank_preprocessor_syntax(source);
        prepared.as_str()
    } else {
        source
    };

    let ctx = ParseContext { text, dialect };
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    parse_items(&mut parser, &ctx)
        .map(|nodes| Stylesheet { nodes })
        .map_err(|e| match e.kind {
            ParseErrorKind::Custom(err) => err,
            ParseErrorKind::Basic(_) => CssSyntaxError {
                kind: CssErrorKind::UnclosedBlock,
                offset: text.len(),
            },
        })
}

/// 嵌套解析器共享的只读上下文
struct ParseContext<'s> {
    text: &'s str,
    dialect: CssDialect,
}

impl ParseContext<'_> {
    /// 取 [start, end) 文本并去首尾空白，返回新区间
    fn trimmed(&self, start: usize, end: usize) -> (String, Span) {
        let end = end.min(self.text.len());
        let start = start.min(end);
        let raw = self.text.get(start..end).unwrap_or("");
        let leading = raw.len() - raw.trim_start().len();
        let trimmed = raw.trim();
        (
            trimmed.to_string(),
            Span::new(start + leading, start + leading + trimmed.len()),
        )
    }

    fn at_rule_prelude(&self, item_start: usize, name: &str, end: usize) -> (String, Span) {
        self.trimmed(item_start + 1 + name.len(), end)
    }
}

/// 当前语句的累积状态
#[derive(Default)]
struct Pending {
    start: Option<usize>,
    at_keyword: Option<String>,
    colon: Option<usize>,
    first_ident: Option<String>,
}

fn syntax_error<'i>(p: &Parser<'i, '_>, kind: CssErrorKind, offset: usize) -> ParseError<'i, CssSyntaxError> {
    p.new_custom_error(CssSyntaxError { kind, offset })
}

fn parse_items<'i>(p: &mut Parser<'i, '_>, ctx: &ParseContext<'_>) -> ItemsResult<'i, Vec<CssNode>> {
    let mut nodes = Vec::new();
    let mut pending = Pending::default();

    loop {
        let before = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => {
                let end = p.position().byte_index();
                if let Some(node) = finish_statement(p, ctx, &mut pending, end)? {
                    nodes.push(node);
                }
                return Ok(nodes);
            }
        };
        let start = before.byte_index();
        let end = p.position().byte_index();

        match token {
            Token::WhiteSpace(_) => {}
            Token::Comment(_) => {
                if end - start < 4 || !p.slice_from(before).ends_with("*/") {
                    return Err(syntax_error(p, CssErrorKind::UnterminatedComment, start));
                }
            }
            Token::Semicolon => {
                if let Some(node) = finish_statement(p, ctx, &mut pending, start)? {
                    nodes.push(node);
                }
            }
            Token::CurlyBracketBlock => {
                // 块体结束位置：闭合时停在 `}` 之前，未闭合时停在输入末尾
                let (children, body_end) = p.parse_nested_block(|nested| {
                    let children = parse_items(nested, ctx)?;
                    Ok::<_, ParseError<'i, CssSyntaxError>>((children, nested.position().byte_index()))
                })?;
                let block_end = p.position().byte_index();
                if block_end <= body_end {
                    return Err(syntax_error(p, CssErrorKind::UnclosedBlock, start));
                }
                let item_start = pending.start.unwrap_or(start);
                let node = match pending.at_keyword.take() {
                    Some(name) => {
                        let (prelude, prelude_span) = ctx.at_rule_prelude(item_start, &name, start);
                        CssNode::AtRule(AtRule {
                            name_span: Span::new(item_start, item_start + 1 + name.len()),
                            name,
                            prelude,
                            prelude_span,
                            block: Some(children),
                            span: Span::new(item_start, block_end),
                        })
                    }
                    None => {
                        let (selector, selector_span) = ctx.trimmed(item_start, start);
                        CssNode::Rule(Rule {
                            selector,
                            selector_span,
                            children,
                            span: Span::new(item_start, block_end),
                        })
                    }
                };
                nodes.push(node);
                pending = Pending::default();
            }
            Token::CloseCurlyBracket => {
                return Err(syntax_error(p, CssErrorKind::UnexpectedClose('}'), start))
            }
            Token::CloseParenthesis => {
                return Err(syntax_error(p, CssErrorKind::UnexpectedClose(')'), start))
            }
            Token::CloseSquareBracket => {
                return Err(syntax_error(p, CssErrorKind::UnexpectedClose(']'), start))
            }
            Token::BadString(_) => {
                return Err(syntax_error(p, CssErrorKind::UnterminatedString, start))
            }
            Token::BadUrl(_) => return Err(syntax_error(p, CssErrorKind::BadUrl, start)),
            Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock => {
                pending.start.get_or_insert(start);
                p.parse_nested_block(skip_block)?;
            }
            Token::QuotedString(_) => {
                pending.start.get_or_insert(start);
                if !is_terminated_string(p.slice_from(before)) {
                    return Err(syntax_error(p, CssErrorKind::UnterminatedString, start));
                }
            }
            Token::AtKeyword(name) => {
                if pending.start.is_none() {
                    pending.start = Some(start);
                    pending.at_keyword = Some(name.to_string());
                }
            }
            Token::Colon => {
                pending.start.get_or_insert(start);
                if pending.colon.is_none() && pending.at_keyword.is_none() {
                    pending.colon = Some(start);
                }
            }
            Token::Ident(ident) => {
                pending.start.get_or_insert(start);
                if pending.colon.is_some() && pending.first_ident.is_none() {
                    pending.first_ident = Some(ident.to_string());
                }
            }
            _ => {
                pending.start.get_or_insert(start);
            }
        }
    }
}

/// 块内容只做错误检查，不建节点（函数参数 / 圆括号 / 方括号）
fn skip_block<'i>(p: &mut Parser<'i, '_>) -> ItemsResult<'i, ()> {
    loop {
        let before = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(()),
        };
        let start = before.byte_index();
        match token {
            Token::BadString(_) => {
                return Err(syntax_error(p, CssErrorKind::UnterminatedString, start))
            }
            Token::BadUrl(_) => return Err(syntax_error(p, CssErrorKind::BadUrl, start)),
            Token::CloseCurlyBracket => {
                return Err(syntax_error(p, CssErrorKind::UnexpectedClose('}'), start))
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => p.parse_nested_block(skip_block)?,
            _ => {}
        }
    }
}

/// 语句结束（`;` 或块尾）：有 at 关键字 → 无块 at 规则；有冒号 → 声明
fn finish_statement<'i>(
    p: &Parser<'i, '_>,
    ctx: &ParseContext<'_>,
    pending: &mut Pending,
    terminator: usize,
) -> ItemsResult<'i, Option<CssNode>> {
    let state = std::mem::take(pending);
    let Some(item_start) = state.start else {
        return Ok(None);
    };

    if let Some(name) = state.at_keyword {
        let (prelude, prelude_span) = ctx.at_rule_prelude(item_start, &name, terminator);
        return Ok(Some(CssNode::AtRule(AtRule {
            name_span: Span::new(item_start, item_start + 1 + name.len()),
            name,
            prelude,
            prelude_span,
            block: None,
            span: Span::new(item_start, terminator),
        })));
    }

    match state.colon {
        Some(colon) => {
            let (property, property_span) = ctx.trimmed(item_start, colon);
            let (value, value_span) = ctx.trimmed(colon + 1, terminator);
            let span_end = if value.is_empty() { colon + 1 } else { value_span.end };
            Ok(Some(CssNode::Declaration(Declaration {
                property,
                property_span,
                value,
                value_span,
                first_ident: state.first_ident,
                span: Span::new(item_start, span_end),
            })))
        }
        None if ctx.dialect.allows_bare_statements() => Ok(None),
        None => Err(syntax_error(p, CssErrorKind::MissingColon, item_start)),
    }
}

/// 引号闭合且结尾引号未被转义
fn is_terminated_string(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() < 2 || bytes[0] != bytes[bytes.len() - 1] {
        return false;
    }
    let escapes = bytes[1..bytes.len() - 1]
        .iter()
        .rev()
        .take_while(|&&b| b == b'\\')
        .count();
    escapes % 2 == 0
}

/// 预处理器语法置空（保持偏移）：`//` 行注释、`#{…}` / `@{…}` 插值
pub fn blank_preprocessor_syntax(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut i = 0;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q || b == b'\n' {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => {
                quote = Some(b);
                i += 1;
            }
            // 未加引号的 url(...) 内容原样跳过，`//` 不视为注释
            b'u' | b'U' if starts_unquoted_url(bytes, i) => {
                while i < bytes.len() && bytes[i] != b')' && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let close = source[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                i = close;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') && (i == 0 || bytes[i - 1] != b':') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
            }
            b'#' | b'@' if bytes.get(i + 1) == Some(&b'{') => {
                let mut depth = 0usize;
                while i < bytes.len() {
                    match bytes[i] {
                        b'{' => depth += 1,
                        b'}' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    let done = bytes[i] == b'}' && depth == 0;
                    if bytes[i] != b'\n' {
                        out[i] = b' ';
                    }
                    i += 1;
                    if done {
                        break;
                    }
                }
            }
            _ => i += 1,
        }
    }
    blank_to_string(out, source)
}

/// `url(` 起始且其后首个非空白字符不是引号（带引号的交给引号跟踪）
fn starts_unquoted_url(bytes: &[u8], i: usize) -> bool {
    let Some(head) = bytes.get(i..i + 4) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(b"url(") {
        return false;
    }
    if i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'-' || bytes[i - 1] == b'_') {
        return false;
    }
    let rest = bytes[i + 4..].iter().find(|b| !b.is_ascii_whitespace());
    !matches!(rest, Some(b'"') | Some(b'\''))
}

/// 被置空的都是 ASCII 字节，多字节字符原样保留
fn blank_to_string(bytes: Vec<u8>, original: &str) -> String {
    String::from_utf8(bytes).unwrap_or_else(|_| original.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(css: &str) -> Stylesheet {
        parse_stylesheet(css, CssDialect::Css).unwrap()
    }

    fn error(css: &str) -> CssSyntaxError {
        parse_stylesheet(css, CssDialect::Css).unwrap_err()
    }

    #[test]
    fn test_rule_with_declarations() {
        let css = ".container { display: grid; gap: 1rem; }";
        let sheet = parse(css);
        assert_eq!(sheet.nodes.len(), 1);
        let CssNode::Rule(rule) = &sheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".container");
        assert_eq!(rule.children.len(), 2);

        let CssNode::Declaration(display) = &rule.children[0] else {
            panic!("expected declaration");
        };
        assert_eq!(display.property, "display");
        assert_eq!(display.value, "grid");
        assert_eq!(display.first_ident.as_deref(), Some("grid"));
        assert_eq!(&css[display.span.start..display.span.end], "display: grid");

        let CssNode::Declaration(gap) = &rule.children[1] else {
            panic!("expected declaration");
        };
        assert_eq!(gap.first_ident, None);
        assert_eq!(&css[gap.value_span.start..gap.value_span.end], "1rem");
    }

    #[test]
    fn test_at_rule_prelude_and_nested_rules() {
        let css = "@container card (min-width: 400px) { .a:has(> img) { color: red } }\n@import \"x.css\";";
        let sheet = parse(css);
        assert_eq!(sheet.nodes.len(), 2);
        let CssNode::AtRule(container) = &sheet.nodes[0] else {
            panic!("expected at-rule");
        };
        assert_eq!(container.name, "container");
        assert_eq!(container.prelude, "card (min-width: 400px)");
        assert_eq!(&css[container.name_span.start..container.name_span.end], "@container");
        let block = container.block.as_ref().unwrap();
        let CssNode::Rule(rule) = &block[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".a:has(> img)");

        let CssNode::AtRule(import) = &sheet.nodes[1] else {
            panic!("expected at-rule");
        };
        assert!(import.block.is_none());
    }

    #[test]
    fn test_function_values_are_kept_whole() {
        let css = "a { color: rgb(1 2 3 / 50%); }";
        let CssNode::Rule(rule) = &parse(css).nodes[0] else {
            panic!("expected rule");
        };
        let CssNode::Declaration(decl) = &rule.children[0] else {
            panic!("expected declaration");
        };
        assert_eq!(decl.value, "rgb(1 2 3 / 50%)");
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(error(".a { display: grid;").kind, CssErrorKind::UnclosedBlock);
        assert_eq!(error(".a { b { } ").kind, CssErrorKind::UnclosedBlock);
        assert_eq!(error(".a { } }").kind, CssErrorKind::UnexpectedClose('}'));
        assert_eq!(error(".a { color red; }").kind, CssErrorKind::MissingColon);
        assert_eq!(error("a { content: \"x\n }").kind, CssErrorKind::UnterminatedString);
        assert_eq!(error("a { } /* open").kind, CssErrorKind::UnterminatedComment);
        assert_eq!(error(".a { color red; }").offset, 5);
    }

    #[test]
    fn test_preprocessor_comments_and_interpolation() {
        let scss = "// header\n.a-#{$x} { width: #{$w}px; @include mixin; }";
        let sheet = parse_stylesheet(scss, CssDialect::Scss).unwrap();
        let CssNode::Rule(rule) = &sheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ".a-");
        assert_eq!(rule.children.len(), 2);

        let less = ".a { .mixin(); color: red; }";
        assert!(parse_stylesheet(less, CssDialect::Less).is_ok());
        assert!(parse_stylesheet(less, CssDialect::Css).is_err());
    }

    #[test]
    fn test_blank_keeps_offsets() {
        let src = "a { b: url(http://x) } // c\n";
        let blanked = blank_preprocessor_syntax(src);
        assert_eq!(blanked.len(), src.len());
        assert!(blanked.contains("http://x"));
        assert!(!blanked.contains("// c"));
    }

    #[test]
    fn test_protocol_relative_url_is_not_a_comment() {
        let scss = ".a { background: url(//cdn.example.com/x.png); display: grid; } // tail";
        let blanked = blank_preprocessor_syntax(scss);
        assert!(blanked.contains("url(//cdn.example.com/x.png)"));
        assert!(!blanked.contains("// tail"));

        let sheet = parse_stylesheet(scss, CssDialect::Scss).unwrap();
        let CssNode::Rule(rule) = &sheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.children.len(), 2);

        let quoted = ".b { background: URL( \"//cdn/y.png\" ); }";
        assert!(parse_stylesheet(quoted, CssDialect::Less).is_ok());
    }
}
