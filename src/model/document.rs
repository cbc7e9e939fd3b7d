use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// 特性分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    Css,
    Javascript,
    Html,
}

impl FeatureCategory {
    pub const ALL: [FeatureCategory; 3] = [
        FeatureCategory::Css,
        FeatureCategory::Javascript,
        FeatureCategory::Html,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureCategory::Css => "css",
            FeatureCategory::Javascript => "javascript",
            FeatureCategory::Html => "html",
        }
    }

    /// 该分类下所有语言
    pub fn languages(&self) -> &'static [DocumentLanguage] {
        match self {
            FeatureCategory::Css => &[
                DocumentLanguage::Css,
                DocumentLanguage::Scss,
                DocumentLanguage::Less,
            ],
            FeatureCategory::Javascript => &[
                DocumentLanguage::Javascript,
                DocumentLanguage::JavascriptReact,
                DocumentLanguage::Typescript,
                DocumentLanguage::TypescriptReact,
            ],
            FeatureCategory::Html => &[
                DocumentLanguage::Html,
                DocumentLanguage::Vue,
                DocumentLanguage::Svelte,
            ],
        }
    }

    /// 该分类下所有文件扩展名
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> {
        self.languages()
            .iter()
            .flat_map(|lang| lang.extensions().iter().copied())
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 文档语言（编辑器 languageId 语义）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentLanguage {
    Css,
    Scss,
    Less,
    Javascript,
    JavascriptReact,
    Typescript,
    TypescriptReact,
    Html,
    Vue,
    Svelte,
}

impl DocumentLanguage {
    pub fn category(&self) -> FeatureCategory {
        match self {
            DocumentLanguage::Css | DocumentLanguage::Scss | DocumentLanguage::Less => {
                FeatureCategory::Css
            }
            DocumentLanguage::Javascript
            | DocumentLanguage::JavascriptReact
            | DocumentLanguage::Typescript
            | DocumentLanguage::TypescriptReact => FeatureCategory::Javascript,
            DocumentLanguage::Html | DocumentLanguage::Vue | DocumentLanguage::Svelte => {
                FeatureCategory::Html
            }
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            DocumentLanguage::Css => &["css"],
            DocumentLanguage::Scss => &["scss"],
            DocumentLanguage::Less => &["less"],
            DocumentLanguage::Javascript => &["js", "mjs", "cjs"],
            DocumentLanguage::JavascriptReact => &["jsx"],
            DocumentLanguage::Typescript => &["ts", "mts", "cts"],
            DocumentLanguage::TypescriptReact => &["tsx"],
            DocumentLanguage::Html => &["html", "htm"],
            DocumentLanguage::Vue => &["vue"],
            DocumentLanguage::Svelte => &["svelte"],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        ALL_LANGUAGES
            .iter()
            .copied()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

const ALL_LANGUAGES: [DocumentLanguage; 10] = [
    DocumentLanguage::Css,
    DocumentLanguage::Scss,
    DocumentLanguage::Less,
    DocumentLanguage::Javascript,
    DocumentLanguage::JavascriptReact,
    DocumentLanguage::Typescript,
    DocumentLanguage::TypescriptReact,
    DocumentLanguage::Html,
    DocumentLanguage::Vue,
    DocumentLanguage::Svelte,
];

/// 待分析文档：路径 + 语言 + 全文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextDocument {
    pub path: PathBuf,
    pub language: DocumentLanguage,
    pub text: String,
}

impl TextDocument {
    pub fn new(path: impl Into<PathBuf>, language: DocumentLanguage, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language,
            text: text.into(),
        }
    }

    /// 按扩展名推断语言，未知扩展名返回 None
    pub fn from_path(path: impl Into<PathBuf>, text: impl Into<String>) -> Option<Self> {
        let path = path.into();
        let language = DocumentLanguage::from_path(&path)?;
        Some(Self::new(path, language, text))
    }

    #[inline]
    pub fn category(&self) -> FeatureCategory {
        self.language.category()
    }

    /// 字节长度（大小上限按字节计算）
    #[inline]
    pub fn size(&self) -> usize {
        self.text.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(
            DocumentLanguage::from_path(Path::new("src/App.TSX")),
            Some(DocumentLanguage::TypescriptReact)
        );
        assert_eq!(
            DocumentLanguage::from_path(Path::new("index.htm")),
            Some(DocumentLanguage::Html)
        );
        assert_eq!(DocumentLanguage::from_path(Path::new("README.md")), None);
        assert_eq!(DocumentLanguage::Vue.category(), FeatureCategory::Html);
    }

    #[test]
    fn test_category_extensions() {
        let exts: Vec<_> = FeatureCategory::Css.extensions().collect();
        assert_eq!(exts, vec!["css", "scss", "less"]);
        assert!(FeatureCategory::Javascript.extensions().any(|e| e == "tsx"));
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&DocumentLanguage::TypescriptReact).unwrap();
        assert_eq!(json, "\"typescriptreact\"");
        let cat: FeatureCategory = serde_json::from_str("\"javascript\"").unwrap();
        assert_eq!(cat, FeatureCategory::Javascript);
    }
}
