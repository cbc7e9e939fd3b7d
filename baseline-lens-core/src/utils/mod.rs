pub mod log_format;

pub use log_format::{compress_key_list, preview_compact};
