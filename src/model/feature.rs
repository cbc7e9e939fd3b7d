use baseline_lens_core::{Availability, BaselineStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::document::FeatureCategory;
use super::position::Range;

/// 诊断级别，由兼容性结论推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Information,
    Hint,
}

impl From<Availability> for Severity {
    fn from(status: Availability) -> Self {
        match status {
            Availability::LimitedAvailability => Severity::Warning,
            Availability::NewlyAvailable => Severity::Information,
            Availability::WidelyAvailable => Severity::Hint,
        }
    }
}

/// 检测到的单次特性使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFeature {
    /// 规范特性键
    pub id: String,
    /// 展示名（可含取值片段，如 `display: grid`）
    pub name: String,
    pub category: FeatureCategory,
    /// 在原始文档中的位置（嵌入片段已映射回外层坐标）
    pub range: Range,
    status: BaselineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    severity: Severity,
    /// 仅项目级聚合时填充
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
}

impl DetectedFeature {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: FeatureCategory,
        range: Range,
        status: BaselineStatus,
    ) -> Self {
        let severity = Severity::from(status.status);
        Self {
            id: id.into(),
            name: name.into(),
            category,
            range,
            status,
            context: None,
            severity,
            file_path: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// 已有上下文时保留原值（嵌套片段以最内层来源为准）
    pub fn with_default_context(mut self, context: &str) -> Self {
        if self.context.is_none() {
            self.context = Some(context.to_string());
        }
        self
    }

    pub fn with_file_path(mut self, path: &Path) -> Self {
        self.file_path = Some(path.to_path_buf());
        self
    }

    #[inline]
    pub fn status(&self) -> &BaselineStatus {
        &self.status
    }

    #[inline]
    pub fn availability(&self) -> Availability {
        self.status.status
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }
}
