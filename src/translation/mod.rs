//! 翻译模块
//!
//! 在活文档上做尽力而为的自动翻译：
//! - **config**: 配置管理
//! - **core**: 翻译后端、服务、扫描编排、新内容观察、语言切换
//! - **pipeline**: 技术性内容过滤与 DOM 扫描
//! - **storage**: 翻译缓存与原文登记表
//! - **error**: 错误处理
//!
//! # 基本用法
//!
//! ```rust,no_run
//! use std::rc::Rc;
//!
//! use dom_autotranslate::parsers::html::LiveDocument;
//! use dom_autotranslate::translation::{
//!     AutoTranslateConfig, AutoTranslateProvider, DomScanner, OriginalTextRegistry,
//!     SweepOrchestrator, TranslationService,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AutoTranslateConfig::default();
//! let document = Rc::new(LiveDocument::parse("<p>Hello</p>"));
//! let service = Rc::new(TranslationService::from_config(&config)?);
//! let orchestrator = Rc::new(SweepOrchestrator::new(
//!     document.clone(),
//!     DomScanner::from_config(&config),
//!     service,
//!     Rc::new(OriginalTextRegistry::new()),
//! ));
//!
//! let provider = AutoTranslateProvider::new(orchestrator, &config);
//! provider.set_language("fr").await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod storage;

pub use self::config::{constants, AutoTranslateConfig, ConfigManager};

pub use error::{ErrorCategory, ErrorSeverity, TranslationError, TranslationResult};

pub use self::core::{
    is_same_language, trigger_global_sweep, AutoTranslateProvider, DebugHook, HttpTranslator,
    LanguageChange, MutationWatcher, Scheduler, SweepOrchestrator, SweepOutcome, SweepPhase,
    SweepReport, SweepStats, TokioScheduler, Translation, TranslationFailure, TranslationOutcome,
    TranslationService, Translator, WatcherHandle,
};

pub use pipeline::{DomScanner, EligibleTextNode, FilterReason, ScanPolicy, TextFilter};

pub use storage::{CacheConfig, CacheStats, OriginalTextRegistry, TranslationCache};
