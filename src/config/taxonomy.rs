//! 兼容性数据加载配置

use crate::error::{BaselineLensError, BlResult};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// 官方 BCD 数据地址
pub const OFFICIAL_BCD_URL: &str = "https://unpkg.com/@mdn/browser-compat-data/data.json";

/// 兼容性数据来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyOrigin {
    Embedded,             // 仅内置精简表
    LocalFile(PathBuf),   // 本地 BCD / 快照文件（可 .lz4 压缩）
    RemoteOfficial,       // 官方远程数据源
    RemoteCustom(String), // 自定义远程 URL（BCD 格式）
}

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryPolicy {
    Never,     // 不重试
    Times(u8), // 固定次数重试（不含第一次）
}

impl RetryPolicy {
    pub fn max_retries(&self) -> usize {
        match self {
            RetryPolicy::Never => 0,
            RetryPolicy::Times(n) => *n as usize,
        }
    }
}

/// 网络加载相关选项
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub urls: Vec<String>,  // URL 列表，按顺序尝试
    pub timeout: Duration,  // HTTP 超时
    pub retry: RetryPolicy, // 重试策略
}

impl RemoteOptions {
    pub fn new(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            urls: vec![url.into()],
            timeout,
            retry,
        }
    }
}

/// 加载选项
#[derive(Debug, Clone)]
pub struct TaxonomyOptions {
    /// 仅对远程数据有效：是否比对 ETag 检查更新
    pub check_update: bool,
    /// 快照缓存目录
    pub cache_dir: PathBuf,
    /// 初始化阶段完整数据的加载时限，超时降级到内置表
    pub load_timeout: Duration,
    /// 后台升级重试间隔
    pub retry_interval: Duration,
    /// 后台升级重试策略
    pub upgrade_retry: RetryPolicy,
}

impl Default for TaxonomyOptions {
    fn default() -> Self {
        Self {
            check_update: true,
            cache_dir: PathBuf::from(".cache/baseline-lens"),
            load_timeout: Duration::from_secs(10),
            retry_interval: Duration::from_secs(30),
            upgrade_retry: RetryPolicy::Times(3),
        }
    }
}

/// 完整数据配置
#[derive(Debug, Clone)]
pub struct TaxonomyConfig {
    pub origin: TaxonomyOrigin,
    pub options: TaxonomyOptions,
    pub remote_options: Option<RemoteOptions>,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            origin: TaxonomyOrigin::Embedded,
            options: TaxonomyOptions::default(),
            remote_options: None,
        }
    }
}

impl TaxonomyConfig {
    /// 内置精简表
    pub fn embedded() -> Self {
        Self::default()
    }

    /// 本地数据文件
    pub fn local_file(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: TaxonomyOrigin::LocalFile(path.into()),
            ..Self::default()
        }
    }

    /// 官方远程数据源
    pub fn remote_official(timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            origin: TaxonomyOrigin::RemoteOfficial,
            options: TaxonomyOptions::default(),
            remote_options: Some(RemoteOptions::new(OFFICIAL_BCD_URL, timeout, retry)),
        }
    }

    /// 自定义远程数据源
    pub fn remote_custom(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Self {
        let url = url.into();
        Self {
            origin: TaxonomyOrigin::RemoteCustom(url.clone()),
            options: TaxonomyOptions::default(),
            remote_options: Some(RemoteOptions::new(url, timeout, retry)),
        }
    }

    pub fn builder() -> TaxonomyConfigBuilder {
        TaxonomyConfigBuilder::new()
    }

    /// 远程 URL 合法性校验
    pub fn validate(&self) -> BlResult<()> {
        if let TaxonomyOrigin::RemoteCustom(url) = &self.origin {
            Url::parse(url)?;
        }
        if let Some(remote) = &self.remote_options {
            if remote.urls.is_empty() {
                return Err(BaselineLensError::ConfigurationError(
                    "remote options require at least one URL".into(),
                ));
            }
            for url in &remote.urls {
                Url::parse(url)?;
            }
        }
        if self.options.load_timeout.is_zero() {
            return Err(BaselineLensError::ConfigurationError(
                "taxonomy load timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// 是否为远程来源
    pub fn is_remote(&self) -> bool {
        matches!(
            self.origin,
            TaxonomyOrigin::RemoteOfficial | TaxonomyOrigin::RemoteCustom(_)
        )
    }

    /// 根据数据源生成快照缓存文件的完整路径（目录 + 文件名）
    pub fn get_cache_file_path(&self) -> PathBuf {
        let file_name = match &self.origin {
            TaxonomyOrigin::Embedded => PathBuf::from("embedded_taxonomy.json.lz4"),
            TaxonomyOrigin::LocalFile(_) => PathBuf::from("local_taxonomy.json.lz4"),
            TaxonomyOrigin::RemoteOfficial => PathBuf::from("official_bcd.json.lz4"),
            TaxonomyOrigin::RemoteCustom(url) => {
                // 相同 URL → 相同文件名（覆盖写）
                let mut hasher = DefaultHasher::new();
                url.hash(&mut hasher);
                PathBuf::from(format!("custom_{:x}.json.lz4", hasher.finish()))
            }
        };
        self.options.cache_dir.join(file_name)
    }
}

/// 自定义构建器（链式 API）
#[derive(Debug, Clone, Default)]
pub struct TaxonomyConfigBuilder {
    config: TaxonomyConfig,
}

impl TaxonomyConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: TaxonomyOrigin) -> Self {
        self.config.origin = origin;
        self
    }

    pub fn check_update(mut self, check: bool) -> Self {
        self.config.options.check_update = check;
        self
    }

    pub fn cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.options.cache_dir = path.into();
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.options.load_timeout = timeout;
        self
    }

    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.options.retry_interval = interval;
        self
    }

    pub fn upgrade_retry(mut self, retry: RetryPolicy) -> Self {
        self.config.options.upgrade_retry = retry;
        self
    }

    pub fn remote_options(mut self, remote_opts: RemoteOptions) -> Self {
        self.config.remote_options = Some(remote_opts);
        self
    }

    pub fn build(mut self) -> TaxonomyConfig {
        // 远程来源缺省网络配置时补齐
        if self.config.remote_options.is_none() {
            let url = match &self.config.origin {
                TaxonomyOrigin::RemoteOfficial => Some(OFFICIAL_BCD_URL.to_string()),
                TaxonomyOrigin::RemoteCustom(url) => Some(url.clone()),
                _ => None,
            };
            self.config.remote_options = url
                .map(|url| RemoteOptions::new(url, Duration::from_secs(30), RetryPolicy::Times(2)));
        }
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_remote_options() {
        let config = TaxonomyConfig::builder()
            .origin(TaxonomyOrigin::RemoteOfficial)
            .cache_dir("/tmp/bl")
            .build();
        let remote = config.remote_options.as_ref().unwrap();
        assert_eq!(remote.urls, vec![OFFICIAL_BCD_URL.to_string()]);
        assert!(config.is_remote());
        assert!(config.validate().is_ok());
        assert_eq!(
            config.get_cache_file_path(),
            PathBuf::from("/tmp/bl/official_bcd.json.lz4")
        );
    }

    #[test]
    fn test_custom_url_cache_name_is_stable() {
        let a = TaxonomyConfig::remote_custom("https://example.com/bcd.json", Duration::from_secs(1), RetryPolicy::Never);
        let b = TaxonomyConfig::remote_custom("https://example.com/bcd.json", Duration::from_secs(5), RetryPolicy::Times(1));
        assert_eq!(a.get_cache_file_path(), b.get_cache_file_path());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = TaxonomyConfig::remote_custom("not a url", Duration::from_secs(1), RetryPolicy::Never);
        assert!(matches!(config.validate(), Err(BaselineLensError::Url(_))));
        assert_eq!(RetryPolicy::Times(4).max_retries(), 4);
        assert_eq!(RetryPolicy::Never.max_retries(), 0);
    }
}
