//! JavaScript / TypeScript 分析器
//! 基于 tree-sitter 语法树单次遍历：
//! 1. 平台 API：点分成员路径 / 全局标识符 / 实例方法调用
//! 2. 语法特性：节点类型 + 运算符 / 可选链 / async / 字面量变体
//! 3. 内置对象：全局标识符、静态成员、原型方法调用
//! 遍历结束后对源码执行一次 CSS-in-JS 扫描
pub mod tables;

use crate::analyzer::css::CssAnalyzer;
use crate::analyzer::DocumentAnalyzer;
use crate::engine::CancelFlag;
use crate::error::{BaselineLensError, BlResult};
use crate::model::{DetectedFeature, DocumentLanguage, FeatureCategory, TextDocument};
use crate::taxonomy::TaxonomyService;
use crate::utils::{LineIndex, SpanMapper};
use baseline_lens_core::utils::preview_compact;
use log::debug;
use std::sync::Arc;
use tables::SyntaxFeature;
use tree_sitter::{Language, Node, Parser, Tree};

/// 每遍历这么多节点检查一次取消信号
const CANCEL_CHECK_INTERVAL: usize = 512;

fn grammar(language: DocumentLanguage) -> Language {
    match language {
        DocumentLanguage::Typescript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        DocumentLanguage::TypescriptReact => tree_sitter_typescript::LANGUAGE_TSX.into(),
        _ => tree_sitter_javascript::LANGUAGE.into(),
    }
}

pub struct JavaScriptAnalyzer {
    taxonomy: Arc<TaxonomyService>,
    css: CssAnalyzer,
}

impl JavaScriptAnalyzer {
    pub fn new(taxonomy: Arc<TaxonomyService>) -> Self {
        Self {
            css: CssAnalyzer::new(taxonomy.clone()),
            taxonomy,
        }
    }

    /// 分析完整脚本；语法树含错误节点时返回 `ParsingError`（首个错误位置）
    pub fn analyze_source(
        &self,
        text: &str,
        language: DocumentLanguage,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let tree = parse_tree(text, language, mapper, cancel)?;

        let mut walker = JsWalker {
            taxonomy: &self.taxonomy,
            source: text,
            mapper,
            features: Vec::new(),
        };
        walker.walk(&tree, cancel)?;

        let mut features = walker.features;
        features.extend(self.css.scan_embedded(text, mapper, cancel)?);
        Ok(features)
    }

    /// 嵌入脚本片段：解析失败直接跳过，只有取消会向上传递
    pub fn analyze_fragment(
        &self,
        text: &str,
        language: DocumentLanguage,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        match self.analyze_source(text, language, mapper, cancel) {
            Ok(features) => Ok(features),
            Err(BaselineLensError::Cancelled) => Err(BaselineLensError::Cancelled),
            Err(e) => {
                debug!(
                    "Skipping script fragment [{}]: {}",
                    preview_compact(text, 40),
                    e
                );
                Ok(Vec::new())
            }
        }
    }
}

impl DocumentAnalyzer for JavaScriptAnalyzer {
    fn category(&self) -> FeatureCategory {
        FeatureCategory::Javascript
    }

    fn analyze(&self, document: &TextDocument, cancel: &CancelFlag) -> BlResult<Vec<DetectedFeature>> {
        let index = LineIndex::new(&document.text);
        self.analyze_source(
            &document.text,
            document.language,
            SpanMapper::root(&index),
            cancel,
        )
    }
}

fn parse_tree(
    text: &str,
    language: DocumentLanguage,
    mapper: SpanMapper<'_>,
    cancel: &CancelFlag,
) -> BlResult<Tree> {
    cancel.check()?;
    let mut parser = Parser::new();
    parser
        .set_language(&grammar(language))
        .map_err(|e| BaselineLensError::UnknownError(format!("Grammar load failed: {}", e)))?;
    if let Some(remaining) = cancel.remaining() {
        // 0 表示不限时，至少给 1 微秒
        let micros = u64::try_from(remaining.as_micros()).unwrap_or(u64::MAX).max(1);
        parser.set_timeout_micros(micros);
    }

    let Some(tree) = parser.parse(text, None) else {
        cancel.check()?;
        return Err(BaselineLensError::UnknownError(
            "Parser returned no tree".to_string(),
        ));
    };

    let root = tree.root_node();
    if root.has_error() {
        let node = first_error(root);
        let at = mapper.range(node.start_byte(), node.start_byte()).start;
        let message = if node.is_missing() {
            format!("Missing {}", node.kind())
        } else {
            "Unexpected token".to_string()
        };
        return Err(BaselineLensError::parsing(
            message,
            Some(at.line),
            Some(at.character),
        ));
    }
    Ok(tree)
}

/// 文档顺序下的第一个错误 / 缺失节点
fn first_error(root: Node<'_>) -> Node<'_> {
    let mut node = root;
    'descend: loop {
        if node.is_error() || node.is_missing() {
            return node;
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.has_error() || child.is_missing() {
                node = child;
                continue 'descend;
            }
        }
        return node;
    }
}

fn has_child_kind(node: Node<'_>, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

struct JsWalker<'a> {
    taxonomy: &'a TaxonomyService,
    source: &'a str,
    mapper: SpanMapper<'a>,
    features: Vec<DetectedFeature>,
}

impl JsWalker<'_> {
    /// 迭代式先序遍历；`scopes` 记录每层祖先是否开启了函数作用域
    fn walk(&mut self, tree: &Tree, cancel: &CancelFlag) -> BlResult<()> {
        let mut cursor = tree.walk();
        let mut scopes: Vec<bool> = Vec::new();
        let mut fn_depth = 0usize;
        let mut visited = 0usize;

        loop {
            let node = cursor.node();
            visited += 1;
            if visited % CANCEL_CHECK_INTERVAL == 0 {
                cancel.check()?;
            }

            let type_only = tables::TYPE_ONLY_SET.contains(node.kind());
            if !type_only {
                self.visit(node, fn_depth);
                if cursor.goto_first_child() {
                    let opens_scope = tables::FUNCTION_KINDS.contains(&node.kind());
                    if opens_scope {
                        fn_depth += 1;
                    }
                    scopes.push(opens_scope);
                    continue;
                }
            }

            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return Ok(());
                }
                if scopes.pop() == Some(true) {
                    fn_depth -= 1;
                }
            }
        }
    }

    fn text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    fn emit(&mut self, key: String, name: String, start: usize, end: usize) {
        let Some(status) = self.taxonomy.get_status(&key) else {
            return;
        };
        debug!("JS feature [{}] detected as {}", key, status.status);
        let range = self.mapper.range(start, end);
        self.features.push(DetectedFeature::new(
            key,
            name,
            FeatureCategory::Javascript,
            range,
            status,
        ));
    }

    fn emit_syntax(&mut self, feature: SyntaxFeature, start: usize, end: usize) {
        self.emit(feature.key.to_string(), feature.name.to_string(), start, end);
    }

    fn emit_symbol(&mut self, path: &str, start: usize, end: usize) {
        let key = self.taxonomy.map_js_symbol_to_key(path);
        self.emit(key, path.to_string(), start, end);
    }

    /// 带 body 的节点只标记头部（`body` 之前的部分）
    fn head_span(&self, node: Node<'_>) -> (usize, usize) {
        let start = node.start_byte();
        match node.child_by_field_name("body") {
            Some(body) if body.start_byte() > start => {
                let head = self.source[start..body.start_byte()].trim_end();
                (start, start + head.len().max(1))
            }
            _ => (start, node.end_byte()),
        }
    }

    fn visit(&mut self, node: Node<'_>, fn_depth: usize) {
        let (start, end) = (node.start_byte(), node.end_byte());

        match node.kind() {
            "member_expression" | "subscript_expression" | "call_expression" => {
                if has_child_kind(node, "optional_chain") {
                    self.emit_syntax(tables::OPTIONAL_CHAINING, start, end);
                }
                if node.kind() == "member_expression" {
                    self.visit_member(node);
                } else if node.kind() == "call_expression"
                    && node
                        .child_by_field_name("function")
                        .is_some_and(|f| f.kind() == "import")
                {
                    self.emit_syntax(tables::DYNAMIC_IMPORT, start, end);
                }
            }
            "binary_expression" => {
                let operator = node.child_by_field_name("operator").map(|op| self.text(op));
                if let Some(feature) = operator.and_then(tables::binary_operator_feature) {
                    self.emit_syntax(feature, start, end);
                }
            }
            "augmented_assignment_expression" => {
                let operator = node.child_by_field_name("operator").map(|op| self.text(op));
                if let Some(feature) = operator.and_then(tables::assignment_operator_feature) {
                    self.emit_syntax(feature, start, end);
                }
            }
            "await_expression" => {
                let feature = if fn_depth == 0 {
                    tables::TOP_LEVEL_AWAIT
                } else {
                    tables::AWAIT
                };
                self.emit_syntax(feature, start, end);
            }
            "spread_element" => self.emit_syntax(tables::SPREAD, start, end),
            "meta_property" => {
                if self.text(node).starts_with("import") {
                    self.emit_syntax(tables::IMPORT_META, start, end);
                }
            }
            "function_declaration" | "function_expression" | "function" | "method_definition"
            | "arrow_function" | "generator_function_declaration" | "generator_function" => {
                let (head_start, head_end) = self.head_span(node);
                if has_child_kind(node, "async") {
                    self.emit_syntax(tables::ASYNC_FUNCTION, head_start, head_end);
                }
                match node.kind() {
                    "arrow_function" => {
                        self.emit_syntax(tables::ARROW_FUNCTION, head_start, head_end)
                    }
                    "generator_function_declaration" | "generator_function" => {
                        self.emit_syntax(tables::GENERATOR, head_start, head_end)
                    }
                    _ => {}
                }
            }
            "for_in_statement" => {
                let is_of = node
                    .child_by_field_name("operator")
                    .is_some_and(|op| self.text(op) == "of");
                if is_of {
                    let (head_start, head_end) = self.head_span(node);
                    let feature = if has_child_kind(node, "await") {
                        tables::FOR_AWAIT_OF
                    } else {
                        tables::FOR_OF
                    };
                    self.emit_syntax(feature, head_start, head_end);
                }
            }
            "import_statement" => self.emit_syntax(tables::IMPORT, start, end),
            "class_declaration" | "class" | "abstract_class_declaration" => {
                let (head_start, head_end) = self.head_span(node);
                self.emit_syntax(tables::CLASS, head_start, head_end);
            }
            "class_static_block" => {
                let (head_start, head_end) = self.head_span(node);
                self.emit_syntax(tables::STATIC_BLOCK, head_start, head_end);
            }
            "field_definition" | "public_field_definition" => {
                let private = node
                    .child_by_field_name("property")
                    .or_else(|| node.child_by_field_name("name"))
                    .is_some_and(|p| p.kind() == "private_property_identifier");
                let feature = if private {
                    tables::PRIVATE_FIELD
                } else {
                    tables::PUBLIC_FIELD
                };
                self.emit_syntax(feature, start, end);
            }
            "template_string" => self.emit_syntax(tables::TEMPLATE_LITERAL, start, end),
            "hash_bang_line" => self.emit_syntax(tables::HASHBANG, start, end),
            "number" => {
                let literal = self.text(node);
                let (separated, bigint) = (literal.contains('_'), literal.ends_with('n'));
                if separated {
                    self.emit_syntax(tables::NUMERIC_SEPARATOR, start, end);
                }
                if bigint {
                    self.emit_syntax(tables::BIGINT_LITERAL, start, end);
                }
            }
            "regex" => {
                let pattern = node
                    .child_by_field_name("pattern")
                    .map(|p| self.text(p))
                    .unwrap_or("");
                if has_named_group(pattern) {
                    self.emit_syntax(tables::NAMED_CAPTURE_GROUP, start, end);
                }
            }
            "decorator" => self.emit_syntax(tables::DECORATOR, start, end),
            "identifier" => self.visit_identifier(node),
            _ => {}
        }
    }

    fn visit_identifier(&mut self, node: Node<'_>) {
        let name = self.text(node);
        if tables::BUILTIN_GLOBAL_SET.contains(name) || tables::API_SYMBOL_SET.contains(name) {
            let name = name.to_string();
            self.emit_symbol(&name, node.start_byte(), node.end_byte());
        }
    }

    fn visit_member(&mut self, node: Node<'_>) {
        if let Some(path) = self.dotted_path(node) {
            let mut stripped = path.as_str();
            for receiver in tables::GLOBAL_RECEIVERS {
                if let Some(rest) = stripped.strip_prefix(receiver) {
                    stripped = rest;
                    break;
                }
            }
            if tables::API_SYMBOL_SET.contains(stripped)
                || tables::BUILTIN_STATIC_SET.contains(stripped)
            {
                let stripped = stripped.to_string();
                self.emit_symbol(&stripped, node.start_byte(), node.end_byte());
                return;
            }
        }

        // 原型 / 实例方法只在调用位置匹配
        let is_callee = node.parent().is_some_and(|parent| {
            parent.kind() == "call_expression"
                && parent
                    .child_by_field_name("function")
                    .is_some_and(|f| f.id() == node.id())
        });
        if !is_callee {
            return;
        }
        let Some(property) = node.child_by_field_name("property") else {
            return;
        };
        let method = self.text(property);
        let owner = tables::API_METHOD_MAP
            .get(method)
            .or_else(|| tables::BUILTIN_METHOD_MAP.get(method))
            .copied();
        if let Some(path) = owner {
            self.emit_symbol(path, property.start_byte(), property.end_byte());
        }
    }

    /// 仅由标识符组成的成员链，如 `navigator.clipboard`
    fn dotted_path(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "identifier" | "property_identifier" => Some(self.text(node).to_string()),
            "member_expression" => {
                let object = node.child_by_field_name("object")?;
                let property = node.child_by_field_name("property")?;
                if property.kind() != "property_identifier" {
                    return None;
                }
                Some(format!("{}.{}", self.dotted_path(object)?, self.text(property)))
            }
            _ => None,
        }
    }
}

/// `(?<name>` 命名分组（排除 `(?<=` / `(?<!` 后行断言）
fn has_named_group(pattern: &str) -> bool {
    pattern
        .match_indices("(?<")
        .any(|(i, _)| !matches!(pattern.as_bytes().get(i + 3), Some(b'=') | Some(b'!') | None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Range;

    fn analyzer() -> JavaScriptAnalyzer {
        JavaScriptAnalyzer::new(Arc::new(TaxonomyService::embedded()))
    }

    fn analyze_as(language: DocumentLanguage, source: &str) -> BlResult<Vec<DetectedFeature>> {
        let doc = TextDocument::new("main.js", language, source);
        analyzer().analyze(&doc, &CancelFlag::new())
    }

    fn ids(features: &[DetectedFeature]) -> Vec<&str> {
        features.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_optional_chaining_only() {
        let features = analyze_as(DocumentLanguage::Javascript, "a?.b").unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "javascript.operators.optional_chaining");
        assert_eq!(features[0].category, FeatureCategory::Javascript);
        assert_eq!(features[0].range, Range::single_line(0, 0, 4));
    }

    #[test]
    fn test_operator_variants() {
        let features =
            analyze_as(DocumentLanguage::Javascript, "const x = a ?? b;\nlet y = 2 ** 3;\nz ||= 1;")
                .unwrap();
        let ids = ids(&features);
        assert!(ids.contains(&"javascript.operators.nullish_coalescing"));
        assert!(ids.contains(&"javascript.operators.exponentiation"));
        assert!(ids.contains(&"javascript.operators.logical_or_assignment"));
    }

    #[test]
    fn test_top_level_await() {
        let source = "await load();\nasync function f() { await g(); }";
        let features = analyze_as(DocumentLanguage::Javascript, source).unwrap();
        let ids = ids(&features);
        assert_eq!(
            ids.iter()
                .filter(|id| **id == "javascript.operators.await.top_level")
                .count(),
            1
        );
        assert_eq!(
            ids.iter().filter(|id| **id == "javascript.operators.await").count(),
            1
        );
        assert!(ids.contains(&"javascript.statements.async_function"));
    }

    #[test]
    fn test_api_symbols() {
        let source = "navigator.clipboard.writeText(t);\nconst o = new ResizeObserver(cb);\nwindow.fetch(u);";
        let features = analyze_as(DocumentLanguage::Javascript, source).unwrap();
        let ids = ids(&features);
        assert!(ids.contains(&"api.navigator.clipboard"));
        assert!(ids.contains(&"api.resizeobserver"));
        assert!(ids.contains(&"api.fetch"));

        let clipboard = features
            .iter()
            .find(|f| f.id == "api.navigator.clipboard")
            .unwrap();
        assert_eq!(clipboard.range, Range::single_line(0, 0, 19));
        assert_eq!(clipboard.name, "navigator.clipboard");
    }

    #[test]
    fn test_builtins() {
        let source = "const last = items.at(-1);\nObject.hasOwn(o, 'k');\nconst g = globalThis;";
        let features = analyze_as(DocumentLanguage::Javascript, source).unwrap();
        let ids = ids(&features);
        assert!(ids.contains(&"javascript.builtins.array.at"));
        assert!(ids.contains(&"javascript.builtins.object.hasown"));
        assert!(ids.contains(&"javascript.builtins.globalthis"));
    }

    #[test]
    fn test_literals_and_classes() {
        let source = "const n = 1_000n;\nclass A { #x = 1; y = 2; static { init(); } }\nconst r = /(?<year>\\d{4})/;";
        let features = analyze_as(DocumentLanguage::Javascript, source).unwrap();
        let ids = ids(&features);
        assert!(ids.contains(&"javascript.grammar.numeric_separators"));
        assert!(ids.contains(&"javascript.grammar.bigint_literals"));
        assert!(ids.contains(&"javascript.classes"));
        assert!(ids.contains(&"javascript.classes.private_class_fields"));
        assert!(ids.contains(&"javascript.classes.public_class_fields"));
        assert!(ids.contains(&"javascript.classes.static_initialization_blocks"));
        assert!(ids.contains(&"javascript.regular_expressions.named_capturing_group"));
    }

    #[test]
    fn test_typescript_types_are_skipped() {
        let source = "interface A { b?: string }\nconst x: Map<string, number> = new Map();\nconst y = a?.b;";
        let features = analyze_as(DocumentLanguage::Typescript, source).unwrap();
        assert_eq!(ids(&features), vec!["javascript.operators.optional_chaining"]);
        assert_eq!(features[0].range, Range::single_line(2, 10, 14));
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = analyze_as(DocumentLanguage::Javascript, "const = ;").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ParsingError);
        assert_eq!(err.position().0, Some(0));
    }

    #[test]
    fn test_css_in_js_runs_after_walk() {
        let source = "const B = styled.div`gap: 1px;`;";
        let features = analyze_as(DocumentLanguage::Javascript, source).unwrap();
        let css: Vec<_> = features
            .iter()
            .filter(|f| f.category == FeatureCategory::Css)
            .collect();
        assert_eq!(css.len(), 1);
        assert_eq!(css[0].id, "css.properties.gap");
        assert_eq!(css[0].context.as_deref(), Some("CSS-in-JS"));
        assert!(ids(&features).contains(&"javascript.grammar.template_literals"));
    }

    #[test]
    fn test_cancelled_before_parse() {
        let doc = TextDocument::new("a.js", DocumentLanguage::Javascript, "a?.b");
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert!(matches!(
            analyzer().analyze(&doc, &cancel),
            Err(BaselineLensError::Cancelled)
        ));
    }

    #[test]
    fn test_fragment_errors_are_swallowed() {
        let index = LineIndex::new("const = ;");
        let features = analyzer()
            .analyze_fragment(
                "const = ;",
                DocumentLanguage::Javascript,
                SpanMapper::root(&index),
                &CancelFlag::new(),
            )
            .unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn test_named_group_detection() {
        assert!(has_named_group("(?<y>\\d+)"));
        assert!(!has_named_group("(?<=a)b"));
        assert!(!has_named_group("(?<!a)b"));
    }
}
