use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Baseline 三态兼容性结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// 主流浏览器长期支持
    WidelyAvailable,
    /// 主流浏览器均已支持，但支持时间较短
    NewlyAvailable,
    /// 至少一个主流浏览器不支持
    LimitedAvailability,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::WidelyAvailable => "widely_available",
            Availability::NewlyAvailable => "newly_available",
            Availability::LimitedAvailability => "limited_availability",
        }
    }

    #[inline]
    pub fn is_widely_available(&self) -> bool {
        matches!(self, Availability::WidelyAvailable)
    }
}

impl Default for Availability {
    /// 缺省结论必须保守
    fn default() -> Self {
        Availability::LimitedAvailability
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 版本号字段：BCD 中既可能是版本字符串，也可能是布尔值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionValue {
    Flag(bool),
    Version(String),
}

impl VersionValue {
    /// 解析为可比较的版本号
    /// - `true` 视为极早版本（1.0）
    /// - `false` / `preview` / 无法解析 → None
    /// - 兼容 `≤79`、`15.4`、`1-2` 等写法
    pub fn parsed(&self) -> Option<BrowserVersion> {
        match self {
            VersionValue::Flag(true) => Some(BrowserVersion::new(1, 0)),
            VersionValue::Flag(false) => None,
            VersionValue::Version(raw) => BrowserVersion::parse(raw),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.parsed().is_some()
    }
}

impl fmt::Display for VersionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionValue::Flag(b) => write!(f, "{}", b),
            VersionValue::Version(v) => f.write_str(v),
        }
    }
}

/// 主版本 + 次版本，按字典序比较（15.10 > 15.4）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BrowserVersion {
    pub major: u32,
    pub minor: u32,
}

impl BrowserVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('≤').trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("preview") {
            return None;
        }
        // 区间写法取下界
        let head = trimmed.split('-').next().unwrap_or(trimmed);
        let mut parts = head.split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = parts
            .next()
            .and_then(|m| m.trim().parse().ok())
            .unwrap_or(0);
        Some(Self { major, minor })
    }
}

impl fmt::Display for BrowserVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// notes 字段：单条或多条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SupportNotes {
    Single(String),
    Many(Vec<String>),
}

/// 单浏览器支持声明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportStatement {
    pub version_added: VersionValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_removed: Option<VersionValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<SupportNotes>,
}

impl SupportStatement {
    pub fn added(version: impl Into<String>) -> Self {
        Self {
            version_added: VersionValue::Version(version.into()),
            version_removed: None,
            notes: None,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            version_added: VersionValue::Flag(false),
            version_removed: None,
            notes: None,
        }
    }

    /// 当前仍受支持时返回起始版本（已移除的视为不支持）
    pub fn current_version(&self) -> Option<BrowserVersion> {
        if self
            .version_removed
            .as_ref()
            .map_or(false, |removed| removed.is_supported())
        {
            return None;
        }
        self.version_added.parsed()
    }
}

/// 浏览器ID → 支持声明，BTreeMap 保证序列化顺序稳定
pub type SupportTable = BTreeMap<String, SupportStatement>;

/// 兼容性结论快照
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineStatus {
    pub status: Availability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_date: Option<String>,
    #[serde(default)]
    pub support: SupportTable,
}

impl BaselineStatus {
    /// 仅有三态结论、无支持表的快照（降级检测使用）
    pub fn bare(status: Availability) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_widely_available(&self) -> bool {
        self.status.is_widely_available()
    }
}
