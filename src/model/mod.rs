//! 分析输入输出数据模型
mod document;
mod feature;
mod position;
mod result;

pub use document::{DocumentLanguage, FeatureCategory, TextDocument};
pub use feature::{DetectedFeature, Severity};
pub use position::{Position, Range};
pub use result::{AnalysisError, AnalysisResult, ProjectAnalysisResult, StatusSummary};
