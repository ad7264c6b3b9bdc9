//! 翻译服务
//!
//! 包在 [`Translator`] 外面的缓存优先层。对扫描来说它从不失败：
//! 后端错误记录日志、通知可选的失败观察者，然后退化为原文。

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use super::backend::{HttpTranslator, Translator};
use crate::translation::config::AutoTranslateConfig;
use crate::translation::error::{helpers, TranslationError, TranslationResult};
use crate::translation::storage::TranslationCache;

/// 单条翻译的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationOutcome {
    /// 命中缓存
    Cached,
    /// 后端返回
    Translated,
    /// 无需翻译（空文本或目标语言与源语言相同），原样返回
    Unchanged,
    /// 后端失败，退化为原文
    Fallback,
}

/// 单条翻译结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub outcome: TranslationOutcome,
}

impl Translation {
    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            outcome: TranslationOutcome::Unchanged,
        }
    }
}

/// 交给失败观察者的信息
#[derive(Debug, Clone)]
pub struct TranslationFailure {
    pub text: String,
    pub target_lang: String,
    pub error: TranslationError,
}

pub type FailureObserver = Box<dyn Fn(&TranslationFailure)>;

/// 服务运行统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub requests: u64,
    pub cache_hits: u64,
    pub backend_calls: u64,
    pub failures: u64,
    pub prefetched: u64,
    pub prefetch_failures: u64,
}

/// 缓存优先的翻译服务
pub struct TranslationService {
    backend: Box<dyn Translator>,
    cache: Rc<TranslationCache>,
    source_lang: String,
    source_aliases: Vec<String>,
    batch_prefetch: bool,
    failure_observer: Option<FailureObserver>,
    stats: RefCell<ServiceStats>,
}

impl TranslationService {
    pub fn new(backend: Box<dyn Translator>, cache: Rc<TranslationCache>, source_lang: &str) -> Self {
        Self {
            backend,
            cache,
            source_lang: source_lang.trim().to_lowercase(),
            source_aliases: Vec::new(),
            batch_prefetch: true,
            failure_observer: None,
            stats: RefCell::new(ServiceStats::default()),
        }
    }

    /// 使用 HTTP 后端与新建缓存
    pub fn from_config(config: &AutoTranslateConfig) -> TranslationResult<Self> {
        let backend = HttpTranslator::new(config)?;
        let cache = Rc::new(TranslationCache::from_config(config));

        Ok(Self::new(Box::new(backend), cache, &config.base_lang)
            .with_source_aliases(&config.base_lang_aliases)
            .with_batch_prefetch(config.batch_prefetch))
    }

    /// 额外视为源语言的标签，例如基础语言 `en` 时的 `en-US`
    pub fn with_source_aliases<S: AsRef<str>>(mut self, aliases: &[S]) -> Self {
        self.source_aliases = aliases
            .iter()
            .map(|alias| normalize_tag(alias.as_ref()))
            .filter(|alias| !alias.is_empty())
            .collect();
        self
    }

    pub fn with_batch_prefetch(mut self, enabled: bool) -> Self {
        self.batch_prefetch = enabled;
        self
    }

    /// 注册翻译失败观察者
    pub fn with_failure_observer(mut self, observer: impl Fn(&TranslationFailure) + 'static) -> Self {
        self.failure_observer = Some(Box::new(observer));
        self
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    /// 目标语言是否就是源语言（或其别名），此时无需翻译
    pub fn is_source_language(&self, lang: &str) -> bool {
        if is_same_language(&self.source_lang, lang) {
            return true;
        }
        let lang = normalize_tag(lang);
        self.source_aliases.iter().any(|alias| *alias == lang)
    }

    pub fn cache(&self) -> &Rc<TranslationCache> {
        &self.cache
    }

    pub fn stats(&self) -> ServiceStats {
        self.stats.borrow().clone()
    }

    /// 翻译文本（缓存优先），失败时返回原文
    pub async fn translate(&self, text: &str, target_lang: &str) -> Translation {
        let trimmed = text.trim();
        if trimmed.is_empty() || self.is_source_language(target_lang) {
            return Translation::unchanged(text);
        }

        self.stats.borrow_mut().requests += 1;

        if let Some(cached) = self.cache.get(trimmed, target_lang) {
            self.stats.borrow_mut().cache_hits += 1;
            return Translation {
                text: cached,
                outcome: TranslationOutcome::Cached,
            };
        }

        self.stats.borrow_mut().backend_calls += 1;
        let result = self
            .backend
            .translate(trimmed, &self.source_lang, target_lang)
            .await;

        match result {
            Ok(translated) if !translated.trim().is_empty() => {
                self.cache.insert(trimmed, target_lang, translated.clone());
                Translation {
                    text: translated,
                    outcome: TranslationOutcome::Translated,
                }
            }
            Ok(_) => self.fallback(
                text,
                target_lang,
                TranslationError::EmptyTranslation {
                    text: trimmed.to_string(),
                },
            ),
            Err(error) => self.fallback(text, target_lang, error),
        }
    }

    /// 用一次批量请求预热缓存，返回新写入的条目数
    ///
    /// 预取失败只记录日志，逐条翻译路径照常进行。
    pub async fn prefetch(&self, texts: &[String], target_lang: &str) -> usize {
        if !self.batch_prefetch
            || !self.cache.is_enabled()
            || !self.backend.supports_batch()
            || self.is_source_language(target_lang)
        {
            return 0;
        }

        let mut seen = HashSet::new();
        let misses: Vec<String> = texts
            .iter()
            .map(|text| text.trim())
            .filter(|text| !text.is_empty() && !self.cache.contains(text, target_lang))
            .filter(|text| seen.insert(*text))
            .map(str::to_string)
            .collect();

        if misses.len() < 2 {
            return 0;
        }

        tracing::debug!("批量预取 {} 条文本 → {}", misses.len(), target_lang);
        match self
            .backend
            .translate_batch(&misses, &self.source_lang, target_lang)
            .await
        {
            Ok(translations) => {
                let mut stored = 0;
                for (original, translated) in misses.iter().zip(translations) {
                    if !translated.trim().is_empty() {
                        self.cache.insert(original, target_lang, translated);
                        stored += 1;
                    }
                }
                self.stats.borrow_mut().prefetched += stored as u64;
                stored
            }
            Err(error) => {
                helpers::log_error(&error.with_context("批量预取"));
                self.stats.borrow_mut().prefetch_failures += 1;
                0
            }
        }
    }

    fn fallback(&self, text: &str, target_lang: &str, error: TranslationError) -> Translation {
        helpers::log_error(&error);
        self.stats.borrow_mut().failures += 1;

        if let Some(observer) = &self.failure_observer {
            observer(&TranslationFailure {
                text: text.trim().to_string(),
                target_lang: target_lang.to_string(),
                error,
            });
        }

        Translation {
            text: text.to_string(),
            outcome: TranslationOutcome::Fallback,
        }
    }
}

impl fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationService")
            .field("source_lang", &self.source_lang)
            .field("batch_prefetch", &self.batch_prefetch)
            .field("cache_entries", &self.cache.len())
            .field("stats", &self.stats.borrow())
            .finish()
    }
}

/// 两个语言标签是否指同一种语言
///
/// 不区分大小写，`-` 与 `_` 等价，其余部分必须完全相同：
/// `zh` 与 `zh-TW`、`pt` 与 `pt-BR` 都是不同的语言。
pub fn is_same_language(a: &str, b: &str) -> bool {
    normalize_tag(a) == normalize_tag(b)
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace('_', "-")
}
