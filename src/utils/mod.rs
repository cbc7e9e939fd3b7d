//! 通用工具：行号索引与片段偏移映射
pub mod line_index;

pub use line_index::{LineIndex, SpanMapper};
