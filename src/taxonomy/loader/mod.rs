//! 兼容性数据加载模块
//! 统一导出加载相关组件
pub mod etag;
pub mod etag_manager;
pub mod path_manager;
pub mod remote_fetcher;
pub mod snapshot_cache;
pub mod taxonomy_loader;

// 导出 ETag 相关
pub use etag::{ETagRecord, ETagTotalRecord};

// 导出加载器
pub use etag_manager::EtagManager;
pub use path_manager::TaxonomyPathManager;
pub use remote_fetcher::RemoteTaxonomyFetcher;
pub use snapshot_cache::SnapshotCache;
pub use taxonomy_loader::TaxonomyLoader;
