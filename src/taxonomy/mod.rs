//! 兼容性分类：数据加载 + 查询服务
pub mod embedded;
pub mod loader;
pub mod service;

pub use embedded::load_embedded;
pub use loader::TaxonomyLoader;
pub use service::TaxonomyService;
