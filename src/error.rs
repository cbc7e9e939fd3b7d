//! 全局错误类型定义
use baseline_lens_core::CoreError;
use serde::{Deserialize, Serialize};
use std::io::Error as IoError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum BaselineLensError {
    // 分析相关错误
    #[error("Parsing failed: {message}")]
    ParsingError {
        message: String,
        /// 0 起始行号
        line: Option<u32>,
        /// 0 起始列号（字符）
        column: Option<u32>,
    },
    #[error("Analysis timed out after {0}ms")]
    TimeoutError(u64),
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("File size {size} bytes exceeds limit of {limit} bytes")]
    FileSizeError { size: usize, limit: usize },

    // 数据/配置相关错误
    #[error("Compat data loading failed: {0}")]
    DataLoadingError(String),
    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    // 网络相关错误
    #[error("Network error: {0}")]
    NetworkError(String),

    // 序列化/反序列化错误
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // 基础错误
    #[error("IO error: {0}")]
    Io(#[from] IoError),
    #[error("URL parse failed: {0}")]
    Url(#[from] UrlParseError),
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

/// 对外暴露的错误分类（序列化到分析结果中）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ParsingError,
    TimeoutError,
    FileSizeError,
    DataLoadingError,
    ConfigurationError,
    UnknownError,
}

impl BaselineLensError {
    pub fn parsing(message: impl Into<String>, line: Option<u32>, column: Option<u32>) -> Self {
        BaselineLensError::ParsingError {
            message: message.into(),
            line,
            column,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BaselineLensError::ParsingError { .. } => ErrorKind::ParsingError,
            BaselineLensError::TimeoutError(_) | BaselineLensError::Cancelled => {
                ErrorKind::TimeoutError
            }
            BaselineLensError::FileSizeError { .. } => ErrorKind::FileSizeError,
            BaselineLensError::DataLoadingError(_)
            | BaselineLensError::NetworkError(_)
            | BaselineLensError::Json(_)
            | BaselineLensError::Core(_) => ErrorKind::DataLoadingError,
            BaselineLensError::ConfigurationError(_) | BaselineLensError::Url(_) => {
                ErrorKind::ConfigurationError
            }
            BaselineLensError::Io(_) | BaselineLensError::UnknownError(_) => {
                ErrorKind::UnknownError
            }
        }
    }

    /// 错误位置（仅解析错误携带）
    pub fn position(&self) -> (Option<u32>, Option<u32>) {
        match self {
            BaselineLensError::ParsingError { line, column, .. } => (*line, *column),
            _ => (None, None),
        }
    }
}

// 全局Result类型
pub type BlResult<T> = Result<T, BaselineLensError>;
