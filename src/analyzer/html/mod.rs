//! HTML / Vue / Svelte 分析器
//! html5ever 分词器负责标签语义，词法定位器负责源码位置
//! 嵌入的 `<style>`、`<script>` 与 `style="…"` 交给 CSS / JS 分析器，位置映射回外层文档
pub mod locator;
pub mod regions;

use crate::analyzer::css::{CssAnalyzer, CssDialect};
use crate::analyzer::javascript::JavaScriptAnalyzer;
use crate::analyzer::DocumentAnalyzer;
use crate::engine::CancelFlag;
use crate::error::BlResult;
use crate::model::{DetectedFeature, DocumentLanguage, FeatureCategory, TextDocument};
use crate::taxonomy::TaxonomyService;
use crate::utils::{LineIndex, SpanMapper};
use baseline_lens_core::keys;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use locator::{TagLocator, TagSpan};
use log::debug;
use regions::{split_svelte, split_vue, RegionKind};
use std::cell::RefCell;
use std::sync::Arc;
use tendril::StrTendril;

pub const STYLE_ELEMENT_CONTEXT: &str = "embedded <style>";
pub const SCRIPT_ELEMENT_CONTEXT: &str = "embedded <script>";
pub const STYLE_ATTRIBUTE_CONTEXT: &str = "style attribute";

/// 需要子键匹配 `type` 属性的元素
const TYPED_ELEMENTS: &[&str] = &["input", "script"];

/// 原始文本元素：分词器切换状态，定位器整体跳过内容
fn raw_kind(name: &str) -> Option<RawKind> {
    match name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "textarea" | "title" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// 分词器产出的开始标签（名称、属性均为小写 / 已解码）
#[derive(Debug, Clone)]
struct StartTag {
    name: String,
    attrs: Vec<(String, String)>,
}

impl StartTag {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Default)]
struct TagCollector {
    tags: RefCell<Vec<StartTag>>,
}

impl TokenSink for TagCollector {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        if let Token::TagToken(Tag {
            kind: TagKind::StartTag,
            name,
            attrs,
            ..
        }) = token
        {
            let name = name.to_string();
            let raw = raw_kind(&name);
            self.tags.borrow_mut().push(StartTag {
                name,
                attrs: attrs
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect(),
            });
            if let Some(kind) = raw {
                return TokenSinkResult::RawData(kind);
            }
        }
        TokenSinkResult::Continue
    }
}

/// 分词（解析错误不致命，分词器总能产出标签流）
fn collect_tags(markup: &str) -> Vec<StartTag> {
    let tokenizer = Tokenizer::new(TagCollector::default(), TokenizerOpts::default());
    let queue = BufferQueue::default();
    queue.push_back(StrTendril::from(markup));

    let _ = tokenizer.feed(&queue);
    tokenizer.end();

    tokenizer.sink.tags.take()
}

/// `<script lang / type>` → 脚本语言；非脚本类型（json、importmap、模板等）返回 None
fn script_language(lang: Option<&str>, script_type: Option<&str>) -> Option<DocumentLanguage> {
    if let Some(lang) = lang.map(str::to_ascii_lowercase) {
        return match lang.as_str() {
            "ts" | "typescript" => Some(DocumentLanguage::Typescript),
            "tsx" => Some(DocumentLanguage::TypescriptReact),
            "jsx" => Some(DocumentLanguage::JavascriptReact),
            "js" | "javascript" | "" => Some(DocumentLanguage::Javascript),
            _ => None,
        };
    }
    match script_type.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") | Some("module") | Some("text/javascript") | Some("application/javascript")
        | Some("text/ecmascript") | Some("application/ecmascript") | Some("text/babel")
        | Some("text/jsx") => Some(DocumentLanguage::Javascript),
        Some("text/typescript") | Some("application/typescript") => {
            Some(DocumentLanguage::Typescript)
        }
        _ => None,
    }
}

fn style_dialect(lang: Option<&str>) -> CssDialect {
    match lang.map(str::to_ascii_lowercase).as_deref() {
        Some("scss") | Some("sass") => CssDialect::Scss,
        Some("less") => CssDialect::Less,
        _ => CssDialect::Css,
    }
}

pub struct HtmlAnalyzer {
    taxonomy: Arc<TaxonomyService>,
    css: CssAnalyzer,
    js: JavaScriptAnalyzer,
}

impl HtmlAnalyzer {
    pub fn new(taxonomy: Arc<TaxonomyService>) -> Self {
        Self {
            css: CssAnalyzer::new(taxonomy.clone()),
            js: JavaScriptAnalyzer::new(taxonomy.clone()),
            taxonomy,
        }
    }

    /// 按文档语言分派：HTML 整篇为标记；Vue / Svelte 先切分区块
    pub fn analyze_source(
        &self,
        text: &str,
        language: DocumentLanguage,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        match language {
            DocumentLanguage::Vue => self.analyze_vue(text, mapper, cancel),
            DocumentLanguage::Svelte => self.analyze_svelte(text, mapper, cancel),
            _ => self.analyze_markup(text, mapper, cancel),
        }
    }

    fn analyze_vue(
        &self,
        text: &str,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let mut features = Vec::new();
        for region in split_vue(text) {
            cancel.check()?;
            let body = region.text(text);
            let sub = mapper.shift(region.start);
            match region.kind {
                RegionKind::Template => {
                    // pug 等模板语言不做标记分析
                    if region.lang.as_deref().map_or(true, |l| l == "html") {
                        features.extend(self.analyze_markup(body, sub, cancel)?);
                    }
                }
                RegionKind::Script => features.extend(self.delegate_script(
                    body,
                    region.lang.as_deref(),
                    region.script_type.as_deref(),
                    sub,
                    cancel,
                )?),
                RegionKind::Style => features.extend(self.delegate_style(
                    body,
                    region.lang.as_deref(),
                    sub,
                    cancel,
                )?),
            }
        }
        Ok(features)
    }

    fn analyze_svelte(
        &self,
        text: &str,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let (regions, markup) = split_svelte(text);
        let mut features = self.analyze_markup(&markup, mapper, cancel)?;
        for region in regions {
            cancel.check()?;
            let body = region.text(text);
            let sub = mapper.shift(region.start);
            let found = match region.kind {
                RegionKind::Script => self.delegate_script(
                    body,
                    region.lang.as_deref(),
                    region.script_type.as_deref(),
                    sub,
                    cancel,
                )?,
                RegionKind::Style => {
                    self.delegate_style(body, region.lang.as_deref(), sub, cancel)?
                }
                RegionKind::Template => Vec::new(),
            };
            features.extend(found);
        }
        features.sort_by_key(|f| f.range.start);
        Ok(features)
    }

    /// 标记分析：元素 / 属性 / type 子键，以及嵌入内容委派
    fn analyze_markup(
        &self,
        markup: &str,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let tags = collect_tags(markup);
        let mut locator = TagLocator::new(markup);
        let mut features = Vec::new();

        for tag in &tags {
            cancel.check()?;
            let Some(span) = locator.next_start_tag(&tag.name) else {
                debug!("Start tag <{}> not located in source, skipped", tag.name);
                continue;
            };
            self.visit_tag(tag, &span, mapper, &mut features);

            if let Some(style) = span.attr("style") {
                if let Some((start, end)) = style.value_span {
                    let found = self.css.analyze_fragment(
                        &markup[start..end],
                        CssDialect::Css,
                        mapper.shift(start),
                        cancel,
                    )?;
                    features.extend(
                        found
                            .into_iter()
                            .map(|f| f.with_default_context(STYLE_ATTRIBUTE_CONTEXT)),
                    );
                }
            }

            if raw_kind(&tag.name).is_none() {
                continue;
            }
            let (start, end) = locator.skip_raw_text(&tag.name);
            let body = &markup[start..end];
            match tag.name.as_str() {
                "style" => features.extend(self.delegate_style(
                    body,
                    tag.attr("lang"),
                    mapper.shift(start),
                    cancel,
                )?),
                "script" => features.extend(self.delegate_script(
                    body,
                    tag.attr("lang"),
                    tag.attr("type"),
                    mapper.shift(start),
                    cancel,
                )?),
                _ => {}
            }
        }
        Ok(features)
    }

    fn visit_tag(
        &self,
        tag: &StartTag,
        span: &TagSpan,
        mapper: SpanMapper<'_>,
        features: &mut Vec<DetectedFeature>,
    ) {
        let element_key = self.taxonomy.map_html_symbol_to_key(&tag.name, None);
        let element_range = (span.start, span.name_end);
        self.emit(element_key, format!("<{}>", tag.name), element_range, mapper, features);

        for (name, value) in &tag.attrs {
            let attr_range = span
                .attr(name)
                .map_or(element_range, |a| (a.name_start, a.end));

            let key = self.taxonomy.map_html_symbol_to_key(&tag.name, Some(name.as_str()));
            self.emit(key, format!("{}[{}]", tag.name, name), attr_range, mapper, features);

            if name == "type" && TYPED_ELEMENTS.contains(&tag.name.as_str()) && !value.trim().is_empty() {
                let sub_key = keys::input_type_attribute(value);
                let key = self.taxonomy.map_html_symbol_to_key(&tag.name, Some(sub_key.as_str()));
                let label = format!("{}[type={}]", tag.name, value.trim().to_lowercase());
                self.emit(key, label, attr_range, mapper, features);
            }
        }
    }

    fn emit(
        &self,
        key: String,
        name: String,
        (start, end): (usize, usize),
        mapper: SpanMapper<'_>,
        features: &mut Vec<DetectedFeature>,
    ) {
        let Some(status) = self.taxonomy.get_status(&key) else {
            return;
        };
        debug!("HTML feature [{}] detected as {}", key, status.status);
        features.push(DetectedFeature::new(
            key,
            name,
            FeatureCategory::Html,
            mapper.range(start, end),
            status,
        ));
    }

    fn delegate_style(
        &self,
        body: &str,
        lang: Option<&str>,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let found = self
            .css
            .analyze_fragment(body, style_dialect(lang), mapper, cancel)?;
        Ok(found
            .into_iter()
            .map(|f| f.with_default_context(STYLE_ELEMENT_CONTEXT))
            .collect())
    }

    fn delegate_script(
        &self,
        body: &str,
        lang: Option<&str>,
        script_type: Option<&str>,
        mapper: SpanMapper<'_>,
        cancel: &CancelFlag,
    ) -> BlResult<Vec<DetectedFeature>> {
        let Some(language) = script_language(lang, script_type) else {
            debug!("Skipping non-script block (lang={:?}, type={:?})", lang, script_type);
            return Ok(Vec::new());
        };
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let found = self.js.analyze_fragment(body, language, mapper, cancel)?;
        Ok(found
            .into_iter()
            .map(|f| f.with_default_context(SCRIPT_ELEMENT_CONTEXT))
            .collect())
    }
}

impl DocumentAnalyzer for HtmlAnalyzer {
    fn category(&self) -> FeatureCategory {
        FeatureCategory::Html
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
