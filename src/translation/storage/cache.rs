//! 翻译缓存模块
//!
//! (原文, 目标语言) → 译文。页面会话内所有扫描共享，LRU 淘汰加 TTL 过期。
//! 单线程协作式调度，内部用 `RefCell` 即可，不需要锁。

use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::translation::config::AutoTranslateConfig;

// ============================================================================
// 核心类型
// ============================================================================

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub text: String,
    pub target_lang: String,
}

impl CacheKey {
    pub fn new(text: &str, target_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            target_lang: target_lang.to_lowercase(),
        }
    }
}

/// 缓存条目
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub translated_text: String,
    pub created_at: Instant,
    pub access_count: u64,
}

impl CacheEntry {
    pub fn new(translated_text: String) -> Self {
        Self {
            translated_text,
            created_at: Instant::now(),
            access_count: 0,
        }
    }

    /// 检查条目是否过期
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// 缓存配置
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from(&AutoTranslateConfig::default())
    }
}

impl From<&AutoTranslateConfig> for CacheConfig {
    fn from(config: &AutoTranslateConfig) -> Self {
        Self {
            enabled: config.cache_enabled,
            max_entries: config.cache_size,
            ttl: config.cache_ttl(),
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// 命中率 (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}

/// 翻译缓存
pub struct TranslationCache {
    entries: RefCell<LruCache<CacheKey, CacheEntry>>,
    config: CacheConfig,
    stats: RefCell<CacheStats>,
}

// ============================================================================
// 实现
// ============================================================================

impl TranslationCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RefCell::new(LruCache::new(capacity)),
            config,
            stats: RefCell::new(CacheStats::default()),
        }
    }

    pub fn from_config(config: &AutoTranslateConfig) -> Self {
        Self::new(CacheConfig::from(config))
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// 查询译文；过期条目在读取时移除
    pub fn get(&self, text: &str, target_lang: &str) -> Option<String> {
        if !self.config.enabled {
            return None;
        }

        let key = CacheKey::new(text, target_lang);
        let mut entries = self.entries.borrow_mut();
        let mut stats = self.stats.borrow_mut();
        stats.total_requests += 1;

        let expired = match entries.get_mut(&key) {
            Some(entry) if !entry.is_expired(self.config.ttl) => {
                entry.access_count += 1;
                stats.cache_hits += 1;
                return Some(entry.translated_text.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(&key);
            stats.expirations += 1;
            stats.total_entries = entries.len();
        }
        stats.cache_misses += 1;
        None
    }

    /// 是否存在未过期的条目（不计入统计，不改变 LRU 顺序）
    pub fn contains(&self, text: &str, target_lang: &str) -> bool {
        self.config.enabled
            && self
                .entries
                .borrow()
                .peek(&CacheKey::new(text, target_lang))
                .map_or(false, |entry| !entry.is_expired(self.config.ttl))
    }

    /// 写入译文
    pub fn insert(&self, text: &str, target_lang: &str, translated_text: String) {
        if !self.config.enabled {
            return;
        }

        let mut entries = self.entries.borrow_mut();
        let evicted = entries.push(CacheKey::new(text, target_lang), CacheEntry::new(translated_text));

        let mut stats = self.stats.borrow_mut();
        // push 在替换同键时也会返回旧值，只有不同键才算淘汰
        if let Some((old_key, _)) = evicted {
            if old_key.text != text || old_key.target_lang != target_lang.to_lowercase() {
                stats.evictions += 1;
            }
        }
        stats.total_entries = entries.len();
    }

    /// 清除全部条目
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
        self.stats.borrow_mut().total_entries = 0;
        tracing::debug!("翻译缓存已清空");
    }

    /// 清理过期条目，返回移除数量
    pub fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.borrow_mut();
        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.config.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            entries.pop(key);
        }

        let mut stats = self.stats.borrow_mut();
        stats.expirations += expired.len() as u64;
        stats.total_entries = entries.len();

        if !expired.is_empty() {
            tracing::debug!("清理了 {} 个过期缓存条目", expired.len());
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 获取统计信息
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.borrow().clone();
        stats.total_entries = self.len();
        stats
    }

    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = CacheStats {
            total_entries: self.len(),
            ..CacheStats::default()
        };
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
