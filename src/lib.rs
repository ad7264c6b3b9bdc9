//! # dom-autotranslate
//!
//! 在一棵"活的"HTML文档树上执行尽力而为的自动翻译：扫描可翻译文本节点，
//! 并行翻译，然后一次性写回；切换回基础语言时恢复原文。
//!
//! ## 模块组织
//!
//! - `parsers` - HTML解析、序列化以及文档适配器（`DocumentAdapter`、`LiveDocument`）
//! - `translation` - 扫描、缓存、翻译服务、扫描编排器、变更监听器
//! - `env` - 类型安全的环境变量

pub mod env;
pub mod parsers;
pub mod translation;

// Re-export commonly used items for convenience
pub use parsers::html::{DocumentAdapter, LiveDocument, MutationRecord, ObserverHandle};
pub use translation::{
    AutoTranslateConfig, AutoTranslateProvider, DomScanner, OriginalTextRegistry, ScanPolicy,
    SweepOrchestrator, SweepOutcome, TranslationCache, TranslationError, TranslationResult,
    TranslationService,
};
