//! 分析引擎配置

use crate::error::{BaselineLensError, BlResult};
use crate::model::FeatureCategory;
use globset::Glob;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 默认单文件大小上限（10 MiB）
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
/// 默认单分类分析超时
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
/// 默认批大小（组内并发上限）
pub const DEFAULT_BATCH_SIZE: usize = 10;

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/dist/**",
    "**/build/**",
    "**/*.min.js",
    "**/*.min.css",
];

/// 分类超时（毫秒）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryTimeouts {
    pub css: u64,
    pub javascript: u64,
    pub html: u64,
}

impl Default for CategoryTimeouts {
    fn default() -> Self {
        Self {
            css: DEFAULT_TIMEOUT_MS,
            javascript: DEFAULT_TIMEOUT_MS,
            html: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl CategoryTimeouts {
    pub fn uniform(ms: u64) -> Self {
        Self {
            css: ms,
            javascript: ms,
            html: ms,
        }
    }

    pub fn get(&self, category: FeatureCategory) -> u64 {
        match category {
            FeatureCategory::Css => self.css,
            FeatureCategory::Javascript => self.javascript,
            FeatureCategory::Html => self.html,
        }
    }
}

/// 分析设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisSettings {
    /// 单文件大小上限（字节），等于上限仍会分析
    pub max_file_size: usize,
    pub timeouts: CategoryTimeouts,
    pub enabled_categories: Vec<FeatureCategory>,
    /// 额外包含的 glob（在分类扩展名之外）
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub batch_size: usize,
    pub project_root: PathBuf,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeouts: CategoryTimeouts::default(),
            enabled_categories: FeatureCategory::ALL.to_vec(),
            include_patterns: Vec::new(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            batch_size: DEFAULT_BATCH_SIZE,
            project_root: PathBuf::from("."),
        }
    }
}

impl AnalysisSettings {
    pub fn builder() -> AnalysisSettingsBuilder {
        AnalysisSettingsBuilder::new()
    }

    /// 配置合法性校验，失败返回 ConfigurationError
    pub fn validate(&self) -> BlResult<()> {
        if self.max_file_size == 0 {
            return Err(BaselineLensError::ConfigurationError(
                "maxFileSize must be greater than 0".into(),
            ));
        }
        for category in FeatureCategory::ALL {
            if self.timeouts.get(category) == 0 {
                return Err(BaselineLensError::ConfigurationError(format!(
                    "timeout for {} must be greater than 0",
                    category
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(BaselineLensError::ConfigurationError(
                "batchSize must be greater than 0".into(),
            ));
        }
        if self.enabled_categories.is_empty() {
            return Err(BaselineLensError::ConfigurationError(
                "at least one category must be enabled".into(),
            ));
        }
        for pattern in self.include_patterns.iter().chain(&self.exclude_patterns) {
            Glob::new(pattern).map_err(|e| {
                BaselineLensError::ConfigurationError(format!(
                    "invalid glob pattern [{}]: {}",
                    pattern, e
                ))
            })?;
        }
        Ok(())
    }

    #[inline]
    pub fn is_enabled(&self, category: FeatureCategory) -> bool {
        self.enabled_categories.contains(&category)
    }

    pub fn timeout_for(&self, category: FeatureCategory) -> Duration {
        Duration::from_millis(self.timeouts.get(category))
    }

    /// 包含 glob：已启用分类的扩展名 + 额外配置
    pub fn include_globs(&self) -> Vec<String> {
        let mut globs: Vec<String> = Vec::new();
        for category in FeatureCategory::ALL {
            if !self.is_enabled(category) {
                continue;
            }
            for ext in category.extensions() {
                globs.push(format!("**/*.{}", ext));
            }
        }
        for extra in &self.include_patterns {
            if !globs.contains(extra) {
                globs.push(extra.clone());
            }
        }
        globs
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct AnalysisSettingsBuilder {
    settings: AnalysisSettings,
}

impl AnalysisSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.settings.max_file_size = bytes;
        self
    }

    pub fn timeout(mut self, category: FeatureCategory, ms: u64) -> Self {
        match category {
            FeatureCategory::Css => self.settings.timeouts.css = ms,
            FeatureCategory::Javascript => self.settings.timeouts.javascript = ms,
            FeatureCategory::Html => self.settings.timeouts.html = ms,
        }
        self
    }

    pub fn timeouts(mut self, timeouts: CategoryTimeouts) -> Self {
        self.settings.timeouts = timeouts;
        self
    }

    pub fn enabled_categories(mut self, categories: impl IntoIterator<Item = FeatureCategory>) -> Self {
        self.settings.enabled_categories = categories.into_iter().collect();
        self
    }

    pub fn include_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.settings.include_patterns.push(pattern.into());
        self
    }

    pub fn exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.settings.exclude_patterns.push(pattern.into());
        self
    }

    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.settings.exclude_patterns = patterns;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.settings.batch_size = size;
        self
    }

    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.settings.project_root = root.into();
        self
    }

    pub fn build(self) -> AnalysisSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = AnalysisSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.enabled_categories.len(), 3);
        assert_eq!(settings.timeout_for(FeatureCategory::Css), Duration::from_millis(5_000));
    }

    #[test]
    fn test_validation_failures() {
        let zero_batch = AnalysisSettings::builder().batch_size(0).build();
        assert!(matches!(
            zero_batch.validate(),
            Err(BaselineLensError::ConfigurationError(_))
        ));

        let no_categories = AnalysisSettings::builder()
            .enabled_categories(Vec::new())
            .build();
        assert!(no_categories.validate().is_err());

        let bad_glob = AnalysisSettings::builder().exclude_pattern("src/[").build();
        assert!(bad_glob.validate().is_err());

        let zero_timeout = AnalysisSettings::builder()
            .timeout(FeatureCategory::Html, 0)
            .build();
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_include_globs_follow_enabled_categories() {
        let settings = AnalysisSettings::builder()
            .enabled_categories([FeatureCategory::Css])
            .include_pattern("**/*.pcss")
            .build();
        assert_eq!(
            settings.include_globs(),
            vec!["**/*.css", "**/*.scss", "**/*.less", "**/*.pcss"]
        );
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let settings: AnalysisSettings = serde_json::from_str(
            r#"{"maxFileSize": 1024, "timeouts": {"javascript": 100}, "enabledCategories": ["css", "javascript"]}"#,
        )
        .unwrap();
        assert_eq!(settings.max_file_size, 1024);
        assert_eq!(settings.timeouts.javascript, 100);
        assert_eq!(settings.timeouts.css, DEFAULT_TIMEOUT_MS);
        assert!(!settings.is_enabled(FeatureCategory::Html));
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
    }
}
