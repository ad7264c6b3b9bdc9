//! 新内容观察器
//!
//! 观察扫描根下的节点插入（不观察文本变化，写回译文不会触发自己）。
//! 插入的是实质内容时发出信号，运行循环在较长的防抖窗口内合并信号后请求一次扫描。
//! 窗口到期时若扫描仍在进行，保留这一个待处理标记，再等一个窗口。
//!
//! 运行循环通过 `tokio::task::spawn_local` 启动，必须在 `LocalSet` 内调用
//! [`MutationWatcher::start`]。

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::orchestrator::{SweepOrchestrator, SweepOutcome};
use super::scheduler::Scheduler;
use crate::parsers::html::{MutationRecord, ObserverHandle};

/// 观察器统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatcherStats {
    /// 收到的插入记录
    pub records: u64,
    /// 判定为实质内容的插入
    pub substantial: u64,
    /// 判定为琐碎插入而忽略
    pub ignored: u64,
    /// 防抖后发起的扫描
    pub sweeps_requested: u64,
}

/// 新内容观察器
pub struct MutationWatcher;

impl MutationWatcher {
    /// 开始观察 `orchestrator` 的扫描根，新内容出现后扫描到 `target_lang`
    pub fn start(
        orchestrator: &Rc<SweepOrchestrator>,
        target_lang: &str,
        debounce: Duration,
        scheduler: Rc<dyn Scheduler>,
    ) -> WatcherHandle {
        let (signal, pending) = mpsc::unbounded_channel::<()>();
        let stats = Rc::new(RefCell::new(WatcherStats::default()));

        let callback = {
            let orchestrator = Rc::downgrade(orchestrator);
            let stats = stats.clone();
            move |record: &MutationRecord| {
                let Some(orchestrator) = orchestrator.upgrade() else {
                    return;
                };

                let mut stats = stats.borrow_mut();
                stats.records += 1;

                let substantial = record
                    .added_nodes
                    .iter()
                    .any(|node| orchestrator.scanner().is_substantial(node));

                if substantial {
                    stats.substantial += 1;
                    // 接收端已退出时发送失败，无需处理
                    let _ = signal.send(());
                } else {
                    stats.ignored += 1;
                }
            }
        };

        let root = orchestrator.root();
        let observer = orchestrator
            .document()
            .observe_insertions(&root, Box::new(callback));

        let task = tokio::task::spawn_local(run(
            Rc::downgrade(orchestrator),
            pending,
            target_lang.to_string(),
            debounce,
            scheduler,
            stats.clone(),
        ));

        tracing::debug!("开始观察新内容 → {}", target_lang);

        WatcherHandle {
            target_lang: target_lang.to_string(),
            observer: Some(observer),
            task: Some(task),
            stats,
        }
    }
}

async fn run(
    orchestrator: Weak<SweepOrchestrator>,
    mut pending: mpsc::UnboundedReceiver<()>,
    target_lang: String,
    debounce: Duration,
    scheduler: Rc<dyn Scheduler>,
    stats: Rc<RefCell<WatcherStats>>,
) {
    while pending.recv().await.is_some() {
        // 窗口内每来一个新信号就重新计时
        loop {
            tokio::select! {
                _ = scheduler.delay(debounce) => {
                    match orchestrator.upgrade() {
                        Some(orchestrator) if orchestrator.is_idle() => break,
                        Some(_) => continue,
                        None => return,
                    }
                }
                signal = pending.recv() => {
                    if signal.is_none() {
                        return;
                    }
                }
            }
        }

        let Some(orchestrator) = orchestrator.upgrade() else {
            return;
        };

        stats.borrow_mut().sweeps_requested += 1;
        match orchestrator.sweep(&target_lang).await {
            SweepOutcome::Applied(report) => {
                tracing::debug!("新内容扫描完成，写回 {} 个节点", report.applied)
            }
            outcome => tracing::debug!("新内容扫描: {:?}", outcome),
        }
    }

    tracing::debug!("新内容观察循环退出");
}

/// 观察器句柄
///
/// 丢弃或调用 [`WatcherHandle::stop`] 时断开观察者并取消挂起的防抖。
pub struct WatcherHandle {
    target_lang: String,
    observer: Option<ObserverHandle>,
    task: Option<JoinHandle<()>>,
    stats: Rc<RefCell<WatcherStats>>,
}

impl WatcherHandle {
    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn stats(&self) -> WatcherStats {
        self.stats.borrow().clone()
    }

    pub fn stop(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("停止观察新内容 ({})", self.target_lang);
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.teardown();
    }
}
