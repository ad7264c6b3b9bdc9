//! 存储模块
//!
//! 翻译缓存与原文登记表。两者都是显式注入的对象，
//! 由调用方决定共享范围和清理时机。

pub mod cache;
pub mod registry;

pub use cache::{CacheConfig, CacheEntry, CacheKey, CacheStats, TranslationCache};
pub use registry::OriginalTextRegistry;
