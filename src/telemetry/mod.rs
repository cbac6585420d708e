//! 日志与可观测性

mod logger;

pub use logger::{init_logging, parse_level};
