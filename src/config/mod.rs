//! 配置结构（加载与下发由上层负责）
pub mod analysis;
pub mod taxonomy;

pub use analysis::{AnalysisSettings, AnalysisSettingsBuilder, CategoryTimeouts};
pub use taxonomy::{
    RemoteOptions, RetryPolicy, TaxonomyConfig, TaxonomyConfigBuilder, TaxonomyOptions,
    TaxonomyOrigin, OFFICIAL_BCD_URL,
};
