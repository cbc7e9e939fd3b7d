use crate::config::TaxonomyConfig;
use std::fs;
use std::path::PathBuf;

/// 缓存路径管理器
#[derive(Debug, Default, Clone)]
pub struct TaxonomyPathManager;

impl TaxonomyPathManager {
    /// ETag 记录文件路径（缓存根目录/etag_records.json）
    pub fn get_etag_record_path(&self, config: &TaxonomyConfig) -> PathBuf {
        self.ensure_cache_dir_exists(config);
        config.options.cache_dir.join("etag_records.json")
    }

    /// 快照缓存文件路径（文件名由数据源决定）
    pub fn get_snapshot_path(&self, config: &TaxonomyConfig) -> PathBuf {
        self.ensure_cache_dir_exists(config);
        config.get_cache_file_path()
    }

    fn ensure_cache_dir_exists(&self, config: &TaxonomyConfig) {
        let cache_dir = &config.options.cache_dir;
        if !cache_dir.exists() {
            let _ = fs::create_dir_all(cache_dir);
        }
    }
}
