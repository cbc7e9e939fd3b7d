//! 远程兼容性数据拉取
//! 1. 纯异步设计（基于tokio运行时）
//! 2. 可配置重试策略（Never/Times(n)）
//! 3. ETag缓存控制（支持弱ETag）

use crate::taxonomy::loader::etag::ETagRecord;
#[cfg(feature = "remote-loader")]
use crate::{
    config::RetryPolicy,
    error::{BaselineLensError, BlResult},
    taxonomy::loader::etag::normalize_etag,
};
#[cfg(feature = "remote-loader")]
use baseline_lens_core::{BcdParser, TaxonomyLibrary};
#[cfg(feature = "remote-loader")]
use reqwest::Client;
use std::path::Path;

#[cfg(feature = "remote-loader")]
const USER_AGENT: &str = concat!("baseline-lens/", env!("CARGO_PKG_VERSION"));

/// 远程数据拉取器（无状态）
#[derive(Debug, Default, Clone)]
pub struct RemoteTaxonomyFetcher;

impl RemoteTaxonomyFetcher {
    /// 通用异步重试：首次 + 最多 `max_retries` 次，间隔 1 秒，保留最后一次错误
    #[cfg(feature = "remote-loader")]
    async fn simple_retry<F, Fut, T>(&self, max_retries: usize, mut func: F) -> BlResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = BlResult<T>>,
    {
        let mut last_err: Option<BaselineLensError> = None;

        for attempt in 0..=max_retries {
            match func().await {
                Ok(res) => return Ok(res),
                Err(e) => {
                    last_err = Some(e);
                    if attempt < max_retries {
                        log::warn!(
                            "Request failed, retrying (attempt {}/{})",
                            attempt + 1,
                            max_retries
                        );
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            BaselineLensError::NetworkError("All retry attempts exhausted".to_string())
        }))
    }

    /// HEAD 请求获取 ETag；失败返回 Ok(None)，由调用方决定是否直接拉取
    #[cfg(feature = "remote-loader")]
    pub async fn get_remote_etag(
        &self,
        client: &Client,
        url: &str,
        retry_policy: &RetryPolicy,
    ) -> BlResult<Option<String>> {
        let result = self
            .simple_retry(retry_policy.max_retries(), || async move {
                let response = client
                    .head(url)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await
                    .map_err(|e| {
                        BaselineLensError::NetworkError(format!("Failed to request ETag: {}", e))
                    })?;

                if !response.status().is_success() {
                    return Err(BaselineLensError::NetworkError(format!(
                        "Failed to get ETag: URL {} returned status code {}",
                        url,
                        response.status()
                    )));
                }

                let etag = response
                    .headers()
                    .get(reqwest::header::ETAG)
                    .ok_or_else(|| {
                        BaselineLensError::NetworkError(format!(
                            "URL {} did not return ETag header",
                            url
                        ))
                    })?
                    .to_str()
                    .map_err(|e| {
                        BaselineLensError::NetworkError(format!(
                            "Failed to convert ETag to string: {}",
                            e
                        ))
                    })?;

                Ok::<_, BaselineLensError>(normalize_etag(etag))
            })
            .await;

        match result {
            Ok(etag) => {
                log::debug!("Fetched ETag for URL [{}]: {}", url, etag);
                Ok(Some(etag))
            }
            Err(e) => {
                log::warn!("Failed to fetch ETag for URL [{}]: {}", url, e);
                Ok(None)
            }
        }
    }

    /// GET 拉取 BCD JSON 并扁平化
    #[cfg(feature = "remote-loader")]
    pub async fn fetch_bcd(
        &self,
        client: &Client,
        url: &str,
        retry_policy: &RetryPolicy,
    ) -> BlResult<(TaxonomyLibrary, Option<String>)> {
        let (bytes, etag) = self
            .simple_retry(retry_policy.max_retries(), || async move {
                let response = client
                    .get(url)
                    .header(reqwest::header::USER_AGENT, USER_AGENT)
                    .send()
                    .await
                    .map_err(|e| {
                        BaselineLensError::NetworkError(format!("Failed to fetch compat data: {}", e))
                    })?;

                if !response.status().is_success() {
                    return Err(BaselineLensError::NetworkError(format!(
                        "Failed to fetch compat data: URL {} returned status code {}",
                        url,
                        response.status()
                    )));
                }

                let etag = response
                    .headers()
                    .get(reqwest::header::ETAG)
                    .and_then(|v| v.to_str().ok())
                    .map(normalize_etag);
                let bytes = response.bytes().await.map_err(|e| {
                    BaselineLensError::NetworkError(format!(
                        "Failed to read response bytes: {}",
                        e
                    ))
                })?;
                Ok::<_, BaselineLensError>((bytes, etag))
            })
            .await?;

        // 大文件解析放到阻塞线程池
        let library = tokio::task::spawn_blocking(move || BcdParser::new().parse_bytes(&bytes))
            .await
            .map_err(|e| BaselineLensError::UnknownError(format!("BCD parse task failed: {}", e)))??;

        log::debug!("Fetched compat data from [{}]: {} entries", url, library.len());
        Ok((library, etag))
    }

    /// 本地 ETag 与远程一致且快照文件存在时复用本地快照
    pub fn should_use_local_file(&self, local_record: Option<&ETagRecord>, remote_etag: &str) -> bool {
        local_record.map_or(false, |r| {
            r.etag == remote_etag && Path::new(&r.snapshot_path).exists()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_use_local_file_requires_matching_etag_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("official.json.lz4");
        std::fs::write(&snapshot, b"x").unwrap();

        let record = ETagRecord {
            source_url: "https://a".into(),
            etag: "v1".into(),
            snapshot_path: snapshot.display().to_string(),
            last_update: 0,
        };
        let fetcher = RemoteTaxonomyFetcher;
        assert!(fetcher.should_use_local_file(Some(&record), "v1"));
        assert!(!fetcher.should_use_local_file(Some(&record), "v2"));
        assert!(!fetcher.should_use_local_file(None, "v1"));

        let missing = ETagRecord {
            snapshot_path: dir.path().join("gone").display().to_string(),
            ..record
        };
        assert!(!fetcher.should_use_local_file(Some(&missing), "v1"));
    }
}
