//! Baseline 状态推导策略
//! 启发式计算与分析器解耦，可整体替换为权威计算
use crate::core::{Availability, BrowserVersion, SupportTable};
use std::fmt::Debug;

/// 状态策略接口：浏览器支持表 → 三态结论
pub trait StatusPolicy: Send + Sync + Debug {
    fn evaluate(&self, support: &SupportTable) -> Availability;
}

/// 默认阈值策略
/// - 核心浏览器全部支持，且起始版本均不晚于阈值 → widely
/// - 核心浏览器全部支持 → newly
/// - 其他 → limited
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    /// (浏览器ID, "老版本"阈值)
    thresholds: Vec<(String, BrowserVersion)>,
}

/// 核心浏览器及其阈值（约 30 个月前的稳定版）
pub const DEFAULT_THRESHOLDS: &[(&str, BrowserVersion)] = &[
    ("chrome", BrowserVersion::new(107, 0)),
    ("edge", BrowserVersion::new(107, 0)),
    ("firefox", BrowserVersion::new(104, 0)),
    ("safari", BrowserVersion::new(16, 0)),
];

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self {
            thresholds: DEFAULT_THRESHOLDS
                .iter()
                .map(|(browser, version)| (browser.to_string(), *version))
                .collect(),
        }
    }
}

impl ThresholdPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// 自定义阈值（覆盖同名浏览器，新浏览器追加为核心浏览器）
    pub fn with_threshold(mut self, browser: impl Into<String>, version: BrowserVersion) -> Self {
        let browser = browser.into();
        match self.thresholds.iter_mut().find(|(b, _)| *b == browser) {
            Some(slot) => slot.1 = version,
            None => self.thresholds.push((browser, version)),
        }
        self
    }

    pub fn core_browsers(&self) -> impl Iterator<Item = &str> {
        self.thresholds.iter().map(|(b, _)| b.as_str())
    }
}

impl StatusPolicy for ThresholdPolicy {
    fn evaluate(&self, support: &SupportTable) -> Availability {
        if self.thresholds.is_empty() {
            return Availability::LimitedAvailability;
        }

        let mut all_old = true;
        for (browser, threshold) in &self.thresholds {
            let Some(version) = support.get(browser).and_then(|s| s.current_version()) else {
                return Availability::LimitedAvailability;
            };
            if version > *threshold {
                all_old = false;
            }
        }

        if all_old {
            Availability::WidelyAvailable
        } else {
            Availability::NewlyAvailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SupportStatement;

    fn table(rows: &[(&str, &str)]) -> SupportTable {
        rows.iter()
            .map(|(b, v)| (b.to_string(), SupportStatement::added(*v)))
            .collect()
    }

    #[test]
    fn test_old_versions_are_widely_available() {
        let support = table(&[("chrome", "57"), ("edge", "16"), ("firefox", "52"), ("safari", "10.1")]);
        assert_eq!(ThresholdPolicy::default().evaluate(&support), Availability::WidelyAvailable);
    }

    #[test]
    fn test_recent_version_is_newly_available() {
        let support = table(&[("chrome", "105"), ("edge", "105"), ("firefox", "121"), ("safari", "15.4")]);
        assert_eq!(ThresholdPolicy::default().evaluate(&support), Availability::NewlyAvailable);
    }

    #[test]
    fn test_missing_browser_is_limited() {
        let support = table(&[("chrome", "105"), ("edge", "105"), ("safari", "15.4")]);
        assert_eq!(ThresholdPolicy::default().evaluate(&support), Availability::LimitedAvailability);

        let mut unsupported = table(&[("chrome", "1"), ("edge", "12"), ("safari", "1")]);
        unsupported.insert("firefox".into(), SupportStatement::unsupported());
        assert_eq!(
            ThresholdPolicy::default().evaluate(&unsupported),
            Availability::LimitedAvailability
        );
    }

    #[test]
    fn test_empty_table_is_limited() {
        assert_eq!(
            ThresholdPolicy::default().evaluate(&SupportTable::new()),
            Availability::LimitedAvailability
        );
    }

    #[test]
    fn test_custom_threshold() {
        let support = table(&[("chrome", "105"), ("edge", "105"), ("firefox", "100"), ("safari", "15")]);
        let policy = ThresholdPolicy::new()
            .with_threshold("chrome", BrowserVersion::new(110, 0))
            .with_threshold("edge", BrowserVersion::new(110, 0));
        assert_eq!(policy.evaluate(&support), Availability::WidelyAvailable);
        assert_eq!(policy.core_browsers().count(), 4);
    }
}
