use crate::config::{TaxonomyConfig, TaxonomyOrigin};
use crate::error::{BaselineLensError, BlResult};
use crate::taxonomy::embedded::load_embedded;
use crate::taxonomy::loader::snapshot_cache::load_local_file;
#[cfg(feature = "remote-loader")]
use crate::taxonomy::loader::{
    snapshot_cache::SnapshotCache, EtagManager, RemoteTaxonomyFetcher, TaxonomyPathManager,
};
use baseline_lens_core::TaxonomyLibrary;
use log::info;
#[cfg(feature = "remote-loader")]
use log::{debug, warn};
#[cfg(feature = "remote-loader")]
use reqwest::Client;

/// 兼容性数据加载器：按数据源分派
#[derive(Debug, Default, Clone)]
pub struct TaxonomyLoader {
    #[cfg(feature = "remote-loader")]
    path_manager: TaxonomyPathManager,
    #[cfg(feature = "remote-loader")]
    etag_manager: EtagManager,
    #[cfg(feature = "remote-loader")]
    remote_fetcher: RemoteTaxonomyFetcher,
}

impl TaxonomyLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, config: &TaxonomyConfig) -> BlResult<TaxonomyLibrary> {
        let library = match &config.origin {
            TaxonomyOrigin::Embedded => load_embedded()?,

            TaxonomyOrigin::LocalFile(path) => {
                let path = path.clone();
                tokio::task::spawn_blocking(move || load_local_file(&path))
                    .await
                    .map_err(|e| {
                        BaselineLensError::UnknownError(format!("local load task failed: {}", e))
                    })?
                    .map_err(|e| {
                        BaselineLensError::DataLoadingError(format!(
                            "local file [{}] load failed: {}",
                            path_display(config),
                            e
                        ))
                    })?
            }

            TaxonomyOrigin::RemoteOfficial => self.load_remote(config, None).await?,

            TaxonomyOrigin::RemoteCustom(url) => self.load_remote(config, Some(url)).await?,
        };

        info!(
            "Taxonomy loaded: {} entries (source: {}, version: {})",
            library.len(),
            library.source,
            library.version.as_deref().unwrap_or("unknown")
        );
        Ok(library)
    }

    #[cfg(feature = "remote-loader")]
    async fn load_remote(
        &self,
        config: &TaxonomyConfig,
        override_url: Option<&str>,
    ) -> BlResult<TaxonomyLibrary> {
        let remote_opts = config.remote_options.as_ref().ok_or_else(|| {
            BaselineLensError::ConfigurationError("remote origin requires remote options".into())
        })?;
        let url = override_url
            .or_else(|| remote_opts.urls.first().map(String::as_str))
            .ok_or_else(|| BaselineLensError::ConfigurationError("no remote URL configured".into()))?;

        let client = Client::builder()
            .timeout(remote_opts.timeout)
            .build()
            .map_err(|e| BaselineLensError::NetworkError(e.to_string()))?;
        let snapshot_path = self.path_manager.get_snapshot_path(config);

        // 1. 不检查更新且本地已有快照：直接复用
        if !config.options.check_update && snapshot_path.exists() {
            debug!("Update check disabled, using cached snapshot {}", snapshot_path.display());
            return SnapshotCache::load(&snapshot_path);
        }

        // 2. ETag 一致：复用本地快照
        let local_record = self.etag_manager.find_local_etag(config, url)?;
        if let Some(remote_etag) = self
            .remote_fetcher
            .get_remote_etag(&client, url, &remote_opts.retry)
            .await?
        {
            if self
                .remote_fetcher
                .should_use_local_file(local_record.as_ref(), &remote_etag)
            {
                match SnapshotCache::load(&snapshot_path) {
                    Ok(library) => {
                        debug!("ETag unchanged, using cached snapshot for [{}]", url);
                        return Ok(library);
                    }
                    Err(e) => warn!("Cached snapshot unreadable, refetching: {}", e),
                }
            }
        }

        // 3. 拉取远程，失败时退回旧快照
        match self
            .remote_fetcher
            .fetch_bcd(&client, url, &remote_opts.retry)
            .await
        {
            Ok((library, etag)) => {
                if let Err(e) = SnapshotCache::save(&snapshot_path, &library) {
                    warn!("Failed to cache taxonomy snapshot: {}", e);
                } else if let Some(etag) = etag {
                    if let Err(e) = self.etag_manager.upsert_and_save_etag(config, url, etag) {
                        warn!("Failed to save ETag record: {}", e);
                    }
                }
                Ok(library)
            }
            Err(e) if snapshot_path.exists() => {
                warn!("Remote fetch failed ({}), falling back to stale snapshot", e);
                SnapshotCache::load(&snapshot_path)
            }
            Err(e) => Err(BaselineLensError::DataLoadingError(e.to_string())),
        }
    }

    #[cfg(not(feature = "remote-loader"))]
    async fn load_remote(
        &self,
        _config: &TaxonomyConfig,
        _override_url: Option<&str>,
    ) -> BlResult<TaxonomyLibrary> {
        Err(BaselineLensError::DataLoadingError(
            "remote-loader feature is not enabled".into(),
        ))
    }
}

fn path_display(config: &TaxonomyConfig) -> String {
    match &config.origin {
        TaxonomyOrigin::LocalFile(path) => path.display().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use baseline_lens_core::TaxonomySource;

    #[tokio::test]
    async fn test_embedded_origin() {
        let lib = TaxonomyLoader::new()
            .load(&TaxonomyConfig::embedded())
            .await
            .unwrap();
        assert_eq!(lib.source, TaxonomySource::Fallback);
        assert!(!lib.is_empty());
    }

    #[tokio::test]
    async fn test_missing_local_file_is_data_loading_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = TaxonomyConfig::local_file(dir.path().join("missing.json"));
        let err = TaxonomyLoader::new().load(&config).await.unwrap_err();
        assert!(matches!(err, BaselineLensError::DataLoadingError(_)));
    }

    #[cfg(not(feature = "remote-loader"))]
    #[tokio::test]
    async fn test_remote_without_feature_fails() {
        let config = TaxonomyConfig::builder()
            .origin(TaxonomyOrigin::RemoteOfficial)
            .build();
        assert!(TaxonomyLoader::new().load(&config).await.is_err());
    }
}
