use baseline_lens_core::Availability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::document::FeatureCategory;
use super::feature::DetectedFeature;
use crate::error::{BaselineLensError, ErrorKind};

/// 单文件分析失败记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisError {
    pub file: String,
    pub error: String,
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl AnalysisError {
    pub fn from_error(file: &Path, err: &BaselineLensError) -> Self {
        let (line, column) = err.position();
        Self {
            file: file.display().to_string(),
            error: err.to_string(),
            kind: err.kind(),
            line,
            column,
        }
    }
}

/// 单文档分析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub features: Vec<DetectedFeature>,
    #[serde(default)]
    pub errors: Vec<AnalysisError>,
}

impl AnalysisResult {
    pub fn with_features(features: Vec<DetectedFeature>) -> Self {
        Self {
            features,
            errors: Vec::new(),
        }
    }

    pub fn failed(features: Vec<DetectedFeature>, error: AnalysisError) -> Self {
        Self {
            features,
            errors: vec![error],
        }
    }

    #[inline]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 状态计数汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total: usize,
    pub widely_available: usize,
    pub newly_available: usize,
    pub limited_availability: usize,
    pub by_category: BTreeMap<FeatureCategory, usize>,
}

impl StatusSummary {
    pub fn from_features(features: &[DetectedFeature]) -> Self {
        let mut summary = Self::default();
        for feature in features {
            summary.total += 1;
            match feature.availability() {
                Availability::WidelyAvailable => summary.widely_available += 1,
                Availability::NewlyAvailable => summary.newly_available += 1,
                Availability::LimitedAvailability => summary.limited_availability += 1,
            }
            *summary.by_category.entry(feature.category).or_insert(0) += 1;
        }
        summary
    }
}

/// 项目级分析结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysisResult {
    pub total_files: usize,
    pub analyzed_files: usize,
    pub features: Vec<DetectedFeature>,
    pub errors: Vec<AnalysisError>,
    pub summary: StatusSummary,
}
