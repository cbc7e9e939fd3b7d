//! 降级检测：结构化解析失败或超时后使用
//! 按分类的有序正则表，逐行匹配；状态来自内置三档表，不查询兼容性服务
//! 带捕获组的模式以第 1 组为特性区间

use crate::model::{DetectedFeature, FeatureCategory, Position, Range};
use baseline_lens_core::{Availability, BaselineStatus};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

pub const FALLBACK_CONTEXT: &str = "fallback detection";

struct FallbackRule {
    pattern: Regex,
    key: &'static str,
    name: &'static str,
}

fn compile(rules: &[(&str, &'static str, &'static str)]) -> Vec<FallbackRule> {
    rules
        .iter()
        .map(|&(pattern, key, name)| FallbackRule {
            pattern: Regex::new(pattern).unwrap(),
            key,
            name,
        })
        .collect()
}

static CSS_RULES: Lazy<Vec<FallbackRule>> = Lazy::new(|| {
    compile(&[
        (r"display\s*:\s*grid\b", "css.properties.display.grid", "display: grid"),
        (r"display\s*:\s*flex\b", "css.properties.display.flex", "display: flex"),
        (r"\bgap\s*:", "css.properties.gap", "gap"),
        (r"\bcontainer-type\s*:", "css.properties.container-type", "container-type"),
        (r"\baspect-ratio\s*:", "css.properties.aspect-ratio", "aspect-ratio"),
        (r"\btext-wrap\s*:\s*balance\b", "css.properties.text-wrap.balance", "text-wrap: balance"),
        (r"--[A-Za-z_][\w-]*\s*:", "css.properties.custom-property", "custom property"),
        (r"@container\b", "css.at-rules.container", "@container"),
        (r"@layer\b", "css.at-rules.layer", "@layer"),
        (r":has\(", "css.selectors.has", ":has"),
        (r":is\(", "css.selectors.is", ":is"),
        (r":where\(", "css.selectors.where", ":where"),
        (r"\bclamp\(", "css.types.clamp", "clamp()"),
        (r"\boklch\(", "css.types.color.oklch", "oklch()"),
    ])
});

static JS_RULES: Lazy<Vec<FallbackRule>> = Lazy::new(|| {
    compile(&[
        (r"(\?\.)[A-Za-z_$\[(]", "javascript.operators.optional_chaining", "Optional chaining (?.)"),
        (r"(\?\?)(?:[^=]|$)", "javascript.operators.nullish_coalescing", "Nullish coalescing (??)"),
        (r"\?\?=", "javascript.operators.nullish_coalescing_assignment", "Nullish coalescing assignment (??=)"),
        (r"\|\|=", "javascript.operators.logical_or_assignment", "Logical OR assignment (||=)"),
        (r"&&=", "javascript.operators.logical_and_assignment", "Logical AND assignment (&&=)"),
        (r"\bimport\s*\(", "javascript.operators.import", "Dynamic import()"),
        (r"\bimport\.meta\b", "javascript.operators.import_meta", "import.meta"),
        (r"\bnavigator\.clipboard\b", "api.navigator.clipboard", "navigator.clipboard"),
        (r"\bstructuredClone\s*\(", "api.structuredclone", "structuredClone"),
        (r"\bfetch\s*\(", "api.fetch", "fetch"),
        (r"\bnew\s+(ResizeObserver)\b", "api.resizeobserver", "ResizeObserver"),
        (r"\bnew\s+(IntersectionObserver)\b", "api.intersectionobserver", "IntersectionObserver"),
        (r"\bObject\.hasOwn\b", "javascript.builtins.object.hasown", "Object.hasOwn"),
        (r"\.(at)\(", "javascript.builtins.array.at", "Array.at"),
    ])
});

static HTML_RULES: Lazy<Vec<FallbackRule>> = Lazy::new(|| {
    compile(&[
        (r"(?i)<dialog\b", "html.elements.dialog", "<dialog>"),
        (r"(?i)<details\b", "html.elements.details", "<details>"),
        (r"(?i)<search\b", "html.elements.search", "<search>"),
        (r"(?i)<template\b", "html.elements.template", "<template>"),
        (r"(?i)<slot\b", "html.elements.slot", "<slot>"),
        (r"(?i)<picture\b", "html.elements.picture", "<picture>"),
        (r"(?i)\s(popover)(?:[\s=>/]|$)", "html.global_attributes.popover", "popover"),
        (r"(?i)\s(inert)(?:[\s=>/]|$)", "html.global_attributes.inert", "inert"),
        (r#"(?i)\bloading\s*=\s*["']?lazy\b"#, "html.elements.img.loading", "loading=lazy"),
        (r"(?i)\bfetchpriority\s*=", "html.elements.img.fetchpriority", "fetchpriority"),
        (r#"(?i)\btype\s*=\s*["']?date\b"#, "html.elements.input.type_date", "input[type=date]"),
        (r#"(?i)\btype\s*=\s*["']?datetime-local\b"#, "html.elements.input.type_datetime_local", "input[type=datetime-local]"),
        (r#"(?i)\btype\s*=\s*["']?color\b"#, "html.elements.input.type_color", "input[type=color]"),
    ])
});

/// 内置三档状态表；未列出的键一律 limited
const WIDELY_AVAILABLE: &[&str] = &[
    "css.properties.display.grid",
    "css.properties.display.flex",
    "css.properties.gap",
    "css.properties.aspect-ratio",
    "css.properties.custom-property",
    "css.at-rules.layer",
    "css.selectors.is",
    "css.selectors.where",
    "css.types.clamp",
    "javascript.operators.optional_chaining",
    "javascript.operators.nullish_coalescing",
    "javascript.operators.nullish_coalescing_assignment",
    "javascript.operators.logical_or_assignment",
    "javascript.operators.logical_and_assignment",
    "javascript.operators.import",
    "javascript.operators.import_meta",
    "api.structuredclone",
    "api.fetch",
    "api.resizeobserver",
    "api.intersectionobserver",
    "javascript.builtins.object.hasown",
    "javascript.builtins.array.at",
    "html.elements.dialog",
    "html.elements.details",
    "html.elements.template",
    "html.elements.slot",
    "html.elements.picture",
    "html.global_attributes.inert",
    "html.elements.img.loading",
    "html.elements.input.type_date",
    "html.elements.input.type_datetime_local",
    "html.elements.input.type_color",
];

const NEWLY_AVAILABLE: &[&str] = &[
    "css.properties.container-type",
    "css.properties.text-wrap.balance",
    "css.at-rules.container",
    "css.selectors.has",
    "css.types.color.oklch",
    "api.navigator.clipboard",
    "html.elements.search",
    "html.global_attributes.popover",
    "html.elements.img.fetchpriority",
];

/// 无状态；规则表全局只编译一次
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAnalyzer;

impl FallbackAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// 降级状态：按内置表分档
    pub fn status_for(key: &str) -> BaselineStatus {
        let status = if WIDELY_AVAILABLE.contains(&key) {
            Availability::WidelyAvailable
        } else if NEWLY_AVAILABLE.contains(&key) {
            Availability::NewlyAvailable
        } else {
            Availability::LimitedAvailability
        };
        BaselineStatus::bare(status)
    }

    /// 逐行匹配，列号按字符计；从不失败
    pub fn analyze(&self, content: &str, category: FeatureCategory) -> Vec<DetectedFeature> {
        let rules: &[FallbackRule] = match category {
            FeatureCategory::Css => CSS_RULES.as_slice(),
            FeatureCategory::Javascript => JS_RULES.as_slice(),
            FeatureCategory::Html => HTML_RULES.as_slice(),
        };

        let mut features = Vec::new();
        for (line_no, line) in content.split('\n').enumerate() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            for rule in rules {
                for caps in rule.pattern.captures_iter(line) {
                    let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                        continue;
                    };
                    let start = line[..m.start()].chars().count() as u32;
                    let end = start + m.as_str().chars().count() as u32;
                    let range = Range::new(
                        Position::new(line_no as u32, start),
                        Position::new(line_no as u32, end),
                    );
                    features.push(
                        DetectedFeature::new(
                            rule.key,
                            rule.name,
                            category,
                            range,
                            Self::status_for(rule.key),
                        )
                        .with_context(FALLBACK_CONTEXT),
                    );
                }
            }
        }
        debug!(
            "Fallback detection ({}) found {} features",
            category,
            features.len()
        );
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_css_still_reports_grid() {
        let features = FallbackAnalyzer::new().analyze(".a { display: grid;", FeatureCategory::Css);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "css.properties.display.grid");
        assert_eq!(features[0].context.as_deref(), Some(FALLBACK_CONTEXT));
        assert_eq!(features[0].range, Range::single_line(0, 5, 18));
        assert_eq!(features[0].availability(), Availability::WidelyAvailable);
    }

    #[test]
    fn test_capture_group_spans() {
        let features =
            FallbackAnalyzer::new().analyze("const v = a?.b ?? c;", FeatureCategory::Javascript);
        let ids: Vec<_> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "javascript.operators.optional_chaining",
                "javascript.operators.nullish_coalescing"
            ]
        );
        assert_eq!(features[0].range, Range::single_line(0, 11, 13));
        assert_eq!(features[1].range, Range::single_line(0, 15, 17));
    }

    #[test]
    fn test_nullish_assignment_is_not_double_counted() {
        let features = FallbackAnalyzer::new().analyze("x ??= 1;", FeatureCategory::Javascript);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, "javascript.operators.nullish_coalescing_assignment");
    }

    #[test]
    fn test_html_rules_and_line_numbers() {
        let content = "<main>\r\n  <dialog popover>x</dialog>\r\n</main>";
        let features = FallbackAnalyzer::new().analyze(content, FeatureCategory::Html);
        let ids: Vec<_> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["html.elements.dialog", "html.global_attributes.popover"]);
        assert_eq!(features[0].range, Range::single_line(1, 2, 9));
        assert_eq!(features[1].range, Range::single_line(1, 10, 17));
        assert_eq!(features[1].availability(), Availability::NewlyAvailable);
    }

    #[test]
    fn test_columns_count_characters() {
        let features = FallbackAnalyzer::new().analyze("/* é */ a { gap: 1px }", FeatureCategory::Css);
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].range, Range::single_line(0, 12, 16));
    }

    #[test]
    fn test_unknown_keys_are_limited() {
        assert_eq!(
            FallbackAnalyzer::status_for("css.properties.unknown").status,
            Availability::LimitedAvailability
        );
        assert!(FallbackAnalyzer::new()
            .analyze("", FeatureCategory::Css)
            .is_empty());
    }
}
