//! 自动翻译核心模块
//!
//! ## 模块依赖关系
//!
//! ```text
//! AutoTranslateProvider (provider.rs)      语言切换防抖、观察器生命周期
//!     ├── MutationWatcher (watcher.rs)     新内容观察、长防抖
//!     └── SweepOrchestrator (orchestrator.rs)
//!             ├── DomScanner (pipeline/scanner.rs)
//!             ├── OriginalTextRegistry (storage/registry.rs)
//!             └── TranslationService (service.rs)
//!                     ├── TranslationCache (storage/cache.rs)
//!                     └── Translator (backend.rs)
//! ```
//!
//! 所有组件运行在同一个线程上，共享状态用 `Rc`/`RefCell`，
//! 并发的翻译请求在 `join_all` 屏障处汇合。

pub mod backend;
pub mod orchestrator;
pub mod provider;
pub mod scheduler;
pub mod service;
pub mod watcher;

pub use backend::{HttpTranslator, Translator};
pub use orchestrator::{SweepOrchestrator, SweepOutcome, SweepPhase, SweepReport, SweepStats};
pub use provider::{trigger_global_sweep, AutoTranslateProvider, DebugHook, LanguageChange};
pub use scheduler::{Scheduler, TokioScheduler};
pub use service::{
    is_same_language, FailureObserver, ServiceStats, Translation, TranslationFailure,
    TranslationOutcome, TranslationService,
};
pub use watcher::{MutationWatcher, WatcherHandle, WatcherStats};
