use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::status::{Availability, SupportTable};

/// 单条兼容性条目（已扁平化，键为小写点分路径）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdn_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_url: Option<String>,
    #[serde(default)]
    pub support: SupportTable,
    /// 显式 Baseline 结论，存在时优先于策略推导
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Availability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_low_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_high_date: Option<String>,
}

impl TaxonomyEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: Availability) -> Self {
        self.status = Some(status);
        self
    }

    /// 大小写不敏感的子串匹配（id / name / description）
    /// 参数 `needle_lower` 必须已转小写
    pub fn matches_query(&self, needle_lower: &str) -> bool {
        self.id.to_lowercase().contains(needle_lower)
            || self.name.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }
}

/// 兼容性数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomySource {
    /// 完整兼容性矩阵
    Full,
    /// 内置精简表
    #[default]
    Fallback,
}

impl fmt::Display for TaxonomySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxonomySource::Full => f.write_str("full"),
            TaxonomySource::Fallback => f.write_str("fallback"),
        }
    }
}

/// 兼容性数据库，业务层统一标准结构
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyLibrary {
    /// 条目ID → 条目
    pub entries: FxHashMap<String, TaxonomyEntry>,
    pub source: TaxonomySource,
    /// 数据版本标记（BCD 版本号 / 快照标签）
    pub version: Option<String>,
}

impl TaxonomyLibrary {
    pub fn new(source: TaxonomySource) -> Self {
        Self {
            entries: FxHashMap::default(),
            source,
            version: None,
        }
    }

    /// 插入条目，ID 统一转小写
    pub fn insert(&mut self, mut entry: TaxonomyEntry) {
        entry.id = entry.id.to_lowercase();
        self.entries.insert(entry.id.clone(), entry);
    }

    #[inline]
    pub fn get(&self, key: &str) -> Option<&TaxonomyEntry> {
        self.entries.get(key)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<TaxonomyEntry> for TaxonomyLibrary {
    fn from_iter<I: IntoIterator<Item = TaxonomyEntry>>(iter: I) -> Self {
        let mut lib = TaxonomyLibrary::new(TaxonomySource::Fallback);
        for entry in iter {
            lib.insert(entry);
        }
        lib
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_lowercases_id() {
        let mut lib = TaxonomyLibrary::new(TaxonomySource::Full);
        lib.insert(TaxonomyEntry::new("CSS.Properties.Gap", "gap"));
        assert!(lib.contains("css.properties.gap"));
        assert_eq!(lib.len(), 1);
    }

    #[test]
    fn test_matches_query_checks_all_fields() {
        let mut entry = TaxonomyEntry::new("api.clipboard", "Clipboard");
        entry.description = "Async clipboard access".into();
        assert!(entry.matches_query("async"));
        assert!(entry.matches_query("clip"));
        assert!(!entry.matches_query("grid"));
    }
}
