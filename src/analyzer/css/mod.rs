//! CSS 分析器
//! 1. 声明 → 属性键（属性 + 首个值标识符）
//! 2. 规则 → 选择器中的现代伪类/伪元素
//! 3. at 规则 → `css.at-rules.<name>`
//! 4. 声明值 → `name(` 函数调用
//! 2~4 只上报非 widely available 的特性
pub mod embedded;
pub mod parser;

use crate::analyzer::DocumentAnalyzer;
use crate::engine::CancelFlag;
use crate::error::{BaselineLensError, BlResult};
use crate::model::{DetectedFeature, DocumentLanguage, FeatureCategory, TextDocument};
use crate::taxonomy::TaxonomyService;
use crate::utils::{LineIndex, SpanMapper};
use baseline_lens_core::{keys, utils::preview_compact};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

pub use parser::{parse_stylesheet, CssDialect, CssSyntaxError};
use parser::{AtRule, CssNode, Declaration, Rule, Span};

/// 选择器中检测的现代伪类/伪元素：(匹配文本, 键名)
const MODERN_SELECTORS: &[(&str, &str)] = &[
    (":has(", "has"),
    (":is(", "is"),
    (":where(", "where"),
    (":not(", "not"),
    (":focus-visible", "focus-visible"),
    (":focus-within", "focus-within"),
    (":any-link", "any-link"),
    (":autofill", "autofill"),
    (":modal", "modal"),
    (":popover-open", "popover-open"),
    (":user-valid", "user-valid"),
    (":user-invalid", "user-invalid"),
    (":placeholder-shown", "placeholder-shown"),
    (":has-slotted", "has-slotted"),
    (":dir(", "dir"),
    (":open", "open"),
    (":state(", "state"),
    ("::backdrop", "backdrop"),
    ("::marker", "marker"),
    ("::part(", "part"),
    ("::slotted(", "slotted"),
    ("::target-text", "target-text"),
    ("::view-transition", "view-transition"),
];

static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(-?[a-z][a-z0-9-]*)\(").unwrap());

#[inline]
fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

impl From<DocumentLanguage> for CssDialect {
    fn from(language: DocumentLanguage) -> Self {
        match language {
            DocumentLanguage::Scss => CssDialect::Scss,
            DocumentLanguage::Less => CssDialect::Less,
            _ => CssDialect::Css,
        }
    }
}

pub struct CssAnalyzer {
    taxonomy: Arc<TaxonomyService>,
}

impl CssAnalyzer {
    pub fn new(taxonomy: Arc<TaxonomyService>) -> Self {
        Self { taxonomy }
    }

    /// 分析完整样式文本；解析失败返回 `ParsingError`（位置已映射到外层文档）
    pub fn analyze_source(
        &self,
        text: &str,
        dialect: CssDialect,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let sheet = parse_stylesheet(text, dialect).map_err(|e| {
            let at = mapper.range(e.offset, e.offset).start;
            BaselineLensError::parsing(e.to_string(), Some(at.line), Some(at.character))
        })?;

        let mut walker = CssWalker {
            taxonomy: &self.taxonomy,
            mapper,
            cancel,
            dialect,
            features: Vec::new(),
        };
        walker.walk(&sheet.nodes, 0)?;
        Ok(walker.features)
    }

    /// 嵌入片段：解析失败直接跳过，只有取消会向上传递
    pub fn analyze_fragment(
        &self,
        text: &str,
        dialect: CssDialect,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        match self.analyze_source(text, dialect, mapper, cancel) {
            Ok(features) => Ok(features),
            Err(BaselineLensError::Cancelled) => Err(BaselineLensError::Cancelled),
            Err(e) => {
                debug!(
                    "Skipping CSS fragment [{}]: {}",
                    preview_compact(text, 40),
                    e
                );
                Ok(Vec::new())
            }
        }
    }
}

impl DocumentAnalyzer for CssAnalyzer {
    fn category(&self) -> FeatureCategory {
        FeatureCategory::Css
    }

    fn analyze(&self, document: &TextDocument, cancel: &CancelFlag) -> BlResult<Vec<DetectedFeature>> {
        let index = LineIndex::new(&document.text);
        self.analyze_source(
            &document.text,
            CssDialect::from(document.language),
            SpanMapper::root(&index),
            cancel,
        )
    }
}

struct CssWalker<'a> {
    taxonomy: &'a TaxonomyService,
    mapper: SpanMapper<'a>,
    cancel: &'a CancelFlag,
    dialect: CssDialect,
    features: Vec<DetectedFeature>,
}

impl CssWalker<'_> {
    fn walk(&mut self, nodes: &[CssNode], depth: usize) -> BlResult<()> {
        for node in nodes {
            self.cancel.check()?;
            match node {
                CssNode::Declaration(decl) => self.visit_declaration(decl),
                CssNode::Rule(rule) => {
                    self.visit_selector(rule, depth);
                    self.walk(&rule.children, depth + 1)?;
                }
                CssNode::AtRule(at_rule) => {
                    self.visit_at_rule(at_rule);
                    if let Some(block) = &at_rule.block {
                        self.walk(block, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn emit(&mut self, key: String, name: String, span: Span, gate_widely: bool) {
        let Some(status) = self.taxonomy.get_status(&key) else {
            return;
        };
        if gate_widely && status.is_widely_available() {
            return;
        }
        debug!("CSS feature [{}] detected as {}", key, status.status);
        let range = self.mapper.range(span.start, span.end);
        self.features.push(DetectedFeature::new(
            key,
            name,
            FeatureCategory::Css,
            range,
            status,
        ));
    }

    fn visit_declaration(&mut self, decl: &Declaration) {
        let property = decl.property.to_lowercase();
        if property.is_empty() {
            return;
        }
        let value = decl.first_ident.as_deref().map(str::to_lowercase);
        let key = self
            .taxonomy
            .map_css_property_to_key(&property, value.as_deref());
        let name = match (&value, keys::is_custom_property(&property)) {
            (Some(v), false) => format!("{}: {}", property, v),
            _ => property.clone(),
        };
        self.emit(key, name, decl.span, false);
        self.visit_functions(&decl.value, decl.value_span.start);
    }

    fn visit_functions(&mut self, value: &str, base: usize) {
        let bytes = value.as_bytes();
        for caps in FUNCTION_CALL.captures_iter(value) {
            let Some(name) = caps.get(1) else {
                continue;
            };
            if name.start() > 0 && is_name_byte(bytes[name.start() - 1]) {
                continue;
            }
            let function = name.as_str().to_lowercase();
            let Some(key) = self
                .taxonomy
                .resolve_first(keys::css_function_candidates(&function))
            else {
                continue;
            };
            let span = Span {
                start: base + name.start(),
                end: base + name.end() + 1,
            };
            self.emit(key, format!("{}()", function), span, true);
        }
    }

    fn visit_selector(&mut self, rule: &Rule, depth: usize) {
        let lower = rule.selector.to_lowercase();
        let bytes = lower.as_bytes();
        let base = rule.selector_span.start;

        for (pattern, name) in MODERN_SELECTORS {
            for (idx, _) in lower.match_indices(pattern) {
                let end = idx + pattern.len();
                let single_colon = !pattern.starts_with("::");
                if single_colon && idx > 0 && bytes[idx - 1] == b':' {
                    continue;
                }
                if !pattern.ends_with('(') && bytes.get(end).is_some_and(|b| is_name_byte(*b)) {
                    continue;
                }
                let span = Span {
                    start: base + idx,
                    end: base + end,
                };
                self.emit(
                    keys::css_selector_key(name),
                    pattern.trim_end_matches('(').to_string(),
                    span,
                    true,
                );
            }
        }

        // 原生嵌套（预处理器的 `&` 不算）
        if depth > 0 && self.dialect == CssDialect::Css {
            if let Some(idx) = lower.find('&') {
                let span = Span {
                    start: base + idx,
                    end: base + idx + 1,
                };
                self.emit(keys::css_selector_key("nesting"), "&".into(), span, true);
            }
        }
    }

    fn visit_at_rule(&mut self, at_rule: &AtRule) {
        let name = at_rule.name.to_lowercase();
        let key = keys::css_at_rule_key(&name);
        let end = if at_rule.prelude.is_empty() {
            at_rule.name_span.end
        } else {
            at_rule.prelude_span.end
        };
        let span = Span {
            start: at_rule.name_span.start,
            end,
        };
        self.emit(key, format!("@{}", name), span, true);
    }
}
