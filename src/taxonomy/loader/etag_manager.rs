use crate::config::TaxonomyConfig;
use crate::error::BlResult;
use crate::taxonomy::loader::etag::{ETagRecord, ETagTotalRecord};
use crate::taxonomy::loader::path_manager::TaxonomyPathManager;
use log::debug;
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// ETag 记录管理器
#[derive(Debug, Default, Clone)]
pub struct EtagManager {
    path_manager: TaxonomyPathManager,
}

impl EtagManager {
    /// 加载 ETag 记录，文件不存在时返回空记录
    pub fn load_etag_records(&self, config: &TaxonomyConfig) -> BlResult<ETagTotalRecord> {
        let etag_path = self.path_manager.get_etag_record_path(config);
        if !etag_path.exists() {
            return Ok(ETagTotalRecord::default());
        }

        let content = fs::read_to_string(&etag_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_etag_records(
        &self,
        config: &TaxonomyConfig,
        etag_records: &ETagTotalRecord,
    ) -> BlResult<()> {
        let etag_path = self.path_manager.get_etag_record_path(config);
        let content = serde_json::to_string_pretty(etag_records)?;
        fs::write(&etag_path, content)?;
        debug!("ETag records saved to: {}", etag_path.display());
        Ok(())
    }

    pub fn find_local_etag(
        &self,
        config: &TaxonomyConfig,
        source_url: &str,
    ) -> BlResult<Option<ETagRecord>> {
        let etag_total = self.load_etag_records(config)?;
        Ok(etag_total.find_record(source_url).cloned())
    }

    /// 更新并保存 ETag 记录
    pub fn upsert_and_save_etag(
        &self,
        config: &TaxonomyConfig,
        source_url: &str,
        etag: String,
    ) -> BlResult<()> {
        let mut etag_total = self.load_etag_records(config)?;
        let snapshot_path = self.path_manager.get_snapshot_path(config);
        etag_total.upsert_record(ETagRecord {
            source_url: source_url.to_string(),
            etag,
            snapshot_path: snapshot_path.display().to_string(),
            last_update: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        });
        self.save_etag_records(config, &etag_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_then_find() {
        let dir = tempfile::tempdir().unwrap();
        let config = TaxonomyConfig::builder().cache_dir(dir.path()).build();
        let manager = EtagManager::default();

        assert!(manager.find_local_etag(&config, "https://a").unwrap().is_none());
        manager
            .upsert_and_save_etag(&config, "https://a", "etag-1".into())
            .unwrap();
        manager
            .upsert_and_save_etag(&config, "https://a", "etag-2".into())
            .unwrap();

        let record = manager.find_local_etag(&config, "https://a").unwrap().unwrap();
        assert_eq!(record.etag, "etag-2");
        assert_eq!(manager.load_etag_records(&config).unwrap().records.len(), 1);
    }
}
