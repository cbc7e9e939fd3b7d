//! 分析引擎：调度、超时与文档存储
pub mod engine;
pub mod storage;
pub mod timeout;

pub use self::engine::{AnalysisEngine, MEDIUM_FILE_LIMIT, SMALL_FILE_LIMIT};
pub use self::storage::{DocumentStorage, FsStorage};
pub use self::timeout::{ActiveTask, CancelFlag, TimeoutManager};
