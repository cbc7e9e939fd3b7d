//! 各语言特性分析器
//! 每个分析器无持久状态：解析 → 遍历 → 通过兼容性服务解析键 → 产出特性
pub mod css;
pub mod fallback;
pub mod html;
pub mod javascript;

use crate::engine::CancelFlag;
use crate::error::BlResult;
use crate::model::{DetectedFeature, FeatureCategory, TextDocument};

pub use css::CssAnalyzer;
pub use fallback::FallbackAnalyzer;
pub use html::HtmlAnalyzer;
pub use javascript::JavaScriptAnalyzer;

/// 分析器接口（同步；由引擎放到阻塞线程池并施加超时）
pub trait DocumentAnalyzer: Send + Sync {
    fn category(&self) -> FeatureCategory;

    /// 整篇文档解析失败返回 `ParsingError`；观察到取消返回 `Cancelled`
    fn analyze(&self, document: &TextDocument, cancel: &CancelFlag) -> BlResult<Vec<DetectedFeature>>;
}
