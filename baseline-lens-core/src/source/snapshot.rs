//! 已扁平化数据库的序列化格式（内置精简表 / 本地缓存共用）
use crate::core::{TaxonomyEntry, TaxonomyLibrary, TaxonomySource};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// 当前快照格式版本
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomySnapshot {
    pub format_version: u32,
    #[serde(default)]
    pub source: TaxonomySource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub entries: Vec<TaxonomyEntry>,
}

impl TaxonomySnapshot {
    /// 条目按 ID 排序，保证输出稳定
    pub fn from_library(library: &TaxonomyLibrary) -> Self {
        let mut entries: Vec<TaxonomyEntry> = library.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            source: library.source,
            version: library.version.clone(),
            entries,
        }
    }

    pub fn into_library(self) -> CoreResult<TaxonomyLibrary> {
        if self.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(CoreError::UnsupportedSnapshot(self.format_version));
        }
        let mut library: TaxonomyLibrary = self.entries.into_iter().collect();
        library.source = self.source;
        library.version = self.version;
        Ok(library)
    }

    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_bytes(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
