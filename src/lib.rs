//! baseline-lens - Web 平台特性检测与 Baseline 兼容性判定

// 导出全局错误类型
pub use self::error::{BaselineLensError, BlResult, ErrorKind};

// 导出配置模块
pub use self::config::{
    AnalysisSettings, AnalysisSettingsBuilder, CategoryTimeouts, TaxonomyConfig,
    TaxonomyConfigBuilder, TaxonomyOrigin,
};

// 导出数据模型
pub use self::model::{
    AnalysisError, AnalysisResult, DetectedFeature, DocumentLanguage, FeatureCategory, Position,
    ProjectAnalysisResult, Range, Severity, StatusSummary, TextDocument,
};

// 导出兼容性分类服务
pub use self::taxonomy::{TaxonomyLoader, TaxonomyService};

// 导出分析器
pub use self::analyzer::{
    CssAnalyzer, DocumentAnalyzer, FallbackAnalyzer, HtmlAnalyzer, JavaScriptAnalyzer,
};

// 导出分析引擎
pub use self::engine::{
    AnalysisEngine, CancelFlag, DocumentStorage, FsStorage, TimeoutManager,
};

// 核心数据类型透传
pub use baseline_lens_core::{Availability, BaselineStatus, StatusPolicy, TaxonomyEntry};

// 声明所有子模块
pub mod analyzer;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod taxonomy;
pub mod utils;
