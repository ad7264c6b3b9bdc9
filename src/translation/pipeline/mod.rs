//! 扫描管道模块
//!
//! 技术性内容过滤与 DOM 扫描

pub mod filters;
pub mod scanner;

// 重新导出主要类型
pub use filters::{FilterReason, TextFilter};
pub use scanner::{DomScanner, EligibleTextNode, ScanPolicy};
