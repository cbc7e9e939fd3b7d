//! @mdn/browser-compat-data 解析器
//! 将嵌套的 BCD JSON 扁平化为 点分键 → 条目 的兼容性数据库
use crate::core::{
    SupportNotes, SupportStatement, SupportTable, TaxonomyEntry, TaxonomyLibrary, TaxonomySource,
    VersionValue,
};
use crate::error::{CoreError, CoreResult};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// 叶子节点标记
const COMPAT_KEY: &str = "__compat";
/// 不参与扁平化的顶层树
const SKIPPED_ROOTS: &[&str] = &["__meta", "browsers", "webextensions"];

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// BCD 解析器
#[derive(Debug, Clone, Default)]
pub struct BcdParser;

impl BcdParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_str(&self, content: &str) -> CoreResult<TaxonomyLibrary> {
        let root: Value = serde_json::from_str(content)?;
        self.parse_value(&root)
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> CoreResult<TaxonomyLibrary> {
        let root: Value = serde_json::from_slice(bytes)?;
        self.parse_value(&root)
    }

    pub fn parse_value(&self, root: &Value) -> CoreResult<TaxonomyLibrary> {
        let Value::Object(top) = root else {
            return Err(CoreError::DataParseError(
                "BCD root must be a JSON object".to_string(),
            ));
        };

        let mut library = TaxonomyLibrary::new(TaxonomySource::Full);
        library.version = top
            .get("__meta")
            .and_then(|meta| meta.get("version"))
            .and_then(Value::as_str)
            .map(str::to_string);

        for (name, subtree) in top {
            if SKIPPED_ROOTS.contains(&name.as_str()) {
                continue;
            }
            if let Value::Object(children) = subtree {
                Self::walk(&name.to_lowercase(), children, &mut library);
            }
        }

        if library.is_empty() {
            return Err(CoreError::DataParseError(
                "no __compat entries found in BCD document".to_string(),
            ));
        }

        debug!(
            "BCD flattened: {} entries (version: {})",
            library.len(),
            library.version.as_deref().unwrap_or("unknown")
        );
        Ok(library)
    }

    /// 深度优先遍历，遇到 `__compat` 即生成条目，子节点继续展开
    fn walk(path: &str, node: &Map<String, Value>, library: &mut TaxonomyLibrary) {
        if let Some(Value::Object(compat)) = node.get(COMPAT_KEY) {
            library.insert(Self::build_entry(path, compat));
        }

        for (key, child) in node {
            if key == COMPAT_KEY {
                continue;
            }
            if let Value::Object(children) = child {
                let child_path = format!("{}.{}", path, key.to_lowercase());
                Self::walk(&child_path, children, library);
            }
        }
    }

    fn build_entry(path: &str, compat: &Map<String, Value>) -> TaxonomyEntry {
        let segment = path.rsplit('.').next().unwrap_or(path);
        let description = compat
            .get("description")
            .and_then(Value::as_str)
            .map(strip_html_tags)
            .unwrap_or_default();
        let name = if description.is_empty() {
            segment.to_string()
        } else {
            description.clone()
        };

        let mut entry = TaxonomyEntry::new(path, name);
        entry.description = description;
        entry.mdn_url = compat
            .get("mdn_url")
            .and_then(Value::as_str)
            .map(str::to_string);
        // spec_url 可能是字符串或数组，取第一个
        entry.spec_url = match compat.get("spec_url") {
            Some(Value::String(url)) => Some(url.clone()),
            Some(Value::Array(urls)) => urls.first().and_then(Value::as_str).map(str::to_string),
            _ => None,
        };
        if let Some(Value::Object(support)) = compat.get("support") {
            entry.support = parse_support_table(support);
        }
        entry
    }
}

/// 浏览器 → 支持声明；数组形式时第一条为当前声明
pub fn parse_support_table(support: &Map<String, Value>) -> SupportTable {
    support
        .iter()
        .filter_map(|(browser, raw)| {
            let statement = match raw {
                Value::Array(list) => list.first().and_then(parse_statement),
                other => parse_statement(other),
            }?;
            Some((browser.to_lowercase(), statement))
        })
        .collect()
}

fn parse_statement(raw: &Value) -> Option<SupportStatement> {
    let Value::Object(fields) = raw else {
        return None;
    };
    Some(SupportStatement {
        version_added: parse_version(fields.get("version_added")).unwrap_or(VersionValue::Flag(false)),
        version_removed: parse_version(fields.get("version_removed"))
            .filter(VersionValue::is_supported),
        notes: fields
            .get("notes")
            .and_then(|n| serde_json::from_value::<SupportNotes>(n.clone()).ok()),
    })
}

/// null / 缺失 → None
fn parse_version(raw: Option<&Value>) -> Option<VersionValue> {
    match raw? {
        Value::Bool(flag) => Some(VersionValue::Flag(*flag)),
        Value::String(version) => Some(VersionValue::Version(version.clone())),
        _ => None,
    }
}

pub fn strip_html_tags(raw: &str) -> String {
    HTML_TAG_RE.replace_all(raw, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BrowserVersion;

    const SAMPLE: &str = r#"{
        "__meta": { "version": "5.6.0" },
        "browsers": { "chrome": { "name": "Chrome" } },
        "css": {
            "properties": {
                "display": {
                    "__compat": {
                        "description": "<code>display</code>",
                        "mdn_url": "https://developer.mozilla.org/docs/Web/CSS/display",
                        "spec_url": ["https://drafts.csswg.org/css-display/"],
                        "support": {
                            "chrome": { "version_added": "1" },
                            "firefox": [{ "version_added": "1" }, { "version_added": "0.9", "version_removed": "1" }],
                            "safari": { "version_added": null }
                        }
                    },
                    "grid": {
                        "__compat": {
                            "support": { "chrome": { "version_added": "57" } }
                        }
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_flatten_nested_compat() {
        let lib = BcdParser::new().parse_str(SAMPLE).unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.version.as_deref(), Some("5.6.0"));
        assert_eq!(lib.source, TaxonomySource::Full);

        let display = lib.get("css.properties.display").unwrap();
        assert_eq!(display.name, "display");
        assert_eq!(display.spec_url.as_deref(), Some("https://drafts.csswg.org/css-display/"));
        assert_eq!(
            display.support["firefox"].current_version(),
            Some(BrowserVersion::new(1, 0))
        );
        assert_eq!(display.support["safari"].version_added, VersionValue::Flag(false));

        let grid = lib.get("css.properties.display.grid").unwrap();
        assert_eq!(grid.name, "grid");
    }

    #[test]
    fn test_rejects_non_object_and_empty() {
        assert!(BcdParser::new().parse_str("[]").is_err());
        assert!(BcdParser::new().parse_str(r#"{"__meta": {}}"#).is_err());
    }
}
