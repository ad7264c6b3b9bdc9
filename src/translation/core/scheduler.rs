//! 调度端口
//!
//! 防抖只通过 [`Scheduler::delay`] 等待。丢弃返回的 future 即取消等待。
//! 测试里用 tokio 的暂停时钟（`start_paused = true`）驱动 [`TokioScheduler`]，
//! 也可以注入自己的实现。

use std::time::Duration;

use futures::future::LocalBoxFuture;

/// 延时调度端口
pub trait Scheduler {
    fn delay(&self, duration: Duration) -> LocalBoxFuture<'static, ()>;
}

/// 基于 `tokio::time` 的调度器
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn delay(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
