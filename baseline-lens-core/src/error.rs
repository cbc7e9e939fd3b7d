//! baseline-lens-core 内核错误定义
//! 封装兼容性数据层的核心错误，与上层分析错误解耦，基于thiserror实现类型安全处理
use thiserror::Error;

/// 内核核心错误枚举
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================== 数据源相关错误 =====================
    /// 兼容性数据解析失败（JSON结构不符合预期）
    #[error("Compat data parse failed: {0}")]
    DataParseError(String),

    /// JSON反序列化失败
    #[error("Compat data JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// 快照版本不兼容
    #[error("Unsupported snapshot format version: {0}")]
    UnsupportedSnapshot(u32),

    // ===================== 内核基础错误 =====================
    /// 无效输入参数
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// 内核层全局Result类型别名
pub type CoreResult<T> = Result<T, CoreError>;
