// 核心公共结构体+枚举
pub mod core;
// 内核错误
pub mod error;
// 规范特性键候选生成
pub mod keys;
// Baseline 状态推导策略
pub mod policy;
// 兼容性数据源解析 (BCD JSON / 快照)
pub mod source;
// 日志格式化工具
pub mod utils;

// 顶层导出常用类型
pub use self::core::{
    Availability, BaselineStatus, BrowserVersion, SupportNotes, SupportStatement, SupportTable,
    TaxonomyEntry, TaxonomyLibrary, TaxonomySource, VersionValue,
};
pub use error::{CoreError, CoreResult};
pub use policy::{StatusPolicy, ThresholdPolicy};
pub use source::{parse_library_bytes, BcdParser, TaxonomySnapshot};
