//! 自动翻译提供者
//!
//! 宿主应用面对的入口：接收语言切换、防抖、驱动编排器，并管理新内容观察器的生命周期。
//! 当前语言不是基础语言时观察器运行；切回基础语言或提供者被丢弃时拆除。

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use super::orchestrator::{SweepOrchestrator, SweepOutcome};
use super::scheduler::{Scheduler, TokioScheduler};
use super::watcher::{MutationWatcher, WatcherHandle, WatcherStats};
use crate::translation::config::AutoTranslateConfig;

/// 一次语言切换的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageChange {
    /// 防抖窗口内出现了更新的切换，本次被取代
    Superseded,
    /// 执行了扫描
    Swept(SweepOutcome),
}

/// 自动翻译提供者
///
/// 使用 `tokio::task::spawn_local` 启动观察器，需要在 `LocalSet` 中运行。
pub struct AutoTranslateProvider {
    orchestrator: Rc<SweepOrchestrator>,
    scheduler: Rc<dyn Scheduler>,
    debounce: Duration,
    watch_debounce: Duration,
    language: Rc<RefCell<String>>,
    generation: Cell<u64>,
    watcher: RefCell<Option<WatcherHandle>>,
}

impl AutoTranslateProvider {
    pub fn new(orchestrator: Rc<SweepOrchestrator>, config: &AutoTranslateConfig) -> Self {
        let language = orchestrator.base_lang().to_string();
        Self {
            orchestrator,
            scheduler: Rc::new(TokioScheduler),
            debounce: config.debounce(),
            watch_debounce: config.watch_debounce(),
            language: Rc::new(RefCell::new(language)),
            generation: Cell::new(0),
            watcher: RefCell::new(None),
        }
    }

    pub fn with_scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn orchestrator(&self) -> &Rc<SweepOrchestrator> {
        &self.orchestrator
    }

    /// 最近一次被接受的语言
    pub fn language(&self) -> String {
        self.language.borrow().clone()
    }

    /// 切换语言
    ///
    /// 等待防抖窗口，窗口内只有最后一次切换继续执行。扫描被丢弃时语言保持不变。
    pub async fn set_language(&self, lang: &str) -> LanguageChange {
        let lang = lang.trim().to_string();
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);

        self.scheduler.delay(self.debounce).await;
        if self.generation.get() != generation {
            tracing::debug!("语言切换 {} 被后续切换取代", lang);
            return LanguageChange::Superseded;
        }

        let outcome = self.orchestrator.sweep(&lang).await;
        if outcome == SweepOutcome::Dropped {
            return LanguageChange::Swept(outcome);
        }

        *self.language.borrow_mut() = lang.clone();
        self.update_watcher(&lang);

        LanguageChange::Swept(outcome)
    }

    /// 以当前语言立即扫描一次（不防抖）
    pub async fn trigger_sweep(&self) -> SweepOutcome {
        let lang = self.language();
        self.orchestrator.sweep(&lang).await
    }

    /// 调试钩子
    pub fn debug_hook(&self) -> DebugHook {
        DebugHook {
            orchestrator: Rc::downgrade(&self.orchestrator),
            language: Rc::downgrade(&self.language),
        }
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.borrow().is_some()
    }

    pub fn watcher_stats(&self) -> Option<WatcherStats> {
        self.watcher.borrow().as_ref().map(WatcherHandle::stats)
    }

    /// 拆除观察器
    pub fn shutdown(&self) {
        if let Some(watcher) = self.watcher.borrow_mut().take() {
            watcher.stop();
        }
    }

    fn update_watcher(&self, lang: &str) {
        if self.orchestrator.is_base_language(lang) {
            self.shutdown();
            return;
        }

        let mut watcher = self.watcher.borrow_mut();
        if watcher
            .as_ref()
            .map_or(false, |current| current.target_lang() == lang)
        {
            return;
        }

        if let Some(previous) = watcher.take() {
            previous.stop();
        }
        *watcher = Some(MutationWatcher::start(
            &self.orchestrator,
            lang,
            self.watch_debounce,
            self.scheduler.clone(),
        ));
    }
}

impl Drop for AutoTranslateProvider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 手动触发扫描的调试钩子
///
/// 只持有弱引用；提供者被丢弃后 [`DebugHook::trigger`] 返回 `None`。
#[derive(Clone)]
pub struct DebugHook {
    orchestrator: Weak<SweepOrchestrator>,
    language: Weak<RefCell<String>>,
}

impl DebugHook {
    pub async fn trigger(&self) -> Option<SweepOutcome> {
        let orchestrator = self.orchestrator.upgrade()?;
        let language = self.language.upgrade()?.borrow().clone();

        tracing::info!("调试钩子触发扫描 → {}", language);
        Some(orchestrator.sweep(&language).await)
    }

    /// 注册为当前线程的全局钩子，供 [`trigger_global_sweep`] 使用
    pub fn install(self) {
        GLOBAL_HOOK.with(|hook| *hook.borrow_mut() = Some(self));
    }

    pub fn uninstall() {
        GLOBAL_HOOK.with(|hook| hook.borrow_mut().take());
    }
}

thread_local! {
    static GLOBAL_HOOK: RefCell<Option<DebugHook>> = const { RefCell::new(None) };
}

/// 通过全局调试钩子触发扫描；未注册时返回 `None`
pub async fn trigger_global_sweep() -> Option<SweepOutcome> {
    let hook = GLOBAL_HOOK.with(|hook| hook.borrow().clone())?;
    hook.trigger().await
}
