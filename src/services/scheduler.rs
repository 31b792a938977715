//! 周期任务调度
//!
//! 同步与在线心跳都由 [`Trigger`] 驱动。默认使用定时轮询
//! ([`IntervalTrigger`])，也可以换成推送式的 [`ChannelTrigger`]，
//! 合并逻辑不需要任何改动。

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::debug;

#[async_trait]
pub trait Trigger: Send {
    /// 等待下一次触发，返回 false 表示触发源已关闭
    async fn next(&mut self) -> bool;
}

/// 固定间隔触发，首次触发立即发生，错过的节拍直接跳过
pub struct IntervalTrigger {
    interval: Interval,
}

impl IntervalTrigger {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn next(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// 由外部推送驱动的触发源（订阅通知、手动触发等）
pub struct ChannelTrigger {
    rx: mpsc::Receiver<()>,
}

impl ChannelTrigger {
    pub fn new(buffer: usize) -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self { rx })
    }
}

#[async_trait]
impl Trigger for ChannelTrigger {
    async fn next(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// 后台循环句柄，`cancel` 或 drop 时停止循环
///
/// 停止的只是触发循环本身，已经开始执行的任务会继续完成。
pub struct TaskHandle {
    name: String,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        debug!("Stopping background loop: {}", self.name);
        self.handle.abort();
    }
}

/// 每次触发时启动一次 `job`
pub fn spawn_loop<T, F, Fut>(name: impl Into<String>, mut trigger: T, job: F) -> TaskHandle
where
    T: Trigger + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    let loop_name = name.clone();
    let handle = tokio::spawn(async move {
        while trigger.next().await {
            tokio::spawn(job());
        }
        debug!("Background loop {} finished: trigger closed", loop_name);
    });

    TaskHandle { name, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_interval_loop_ticks_until_cancelled() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let handle = spawn_loop("test", IntervalTrigger::new(Duration::from_secs(10)), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        // 首次立即触发，之后 t=10s, t=20s
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_channel_trigger_closes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        let (tx, trigger) = ChannelTrigger::new(4);
        let handle = spawn_loop("push", trigger, move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        drop(tx);

        for _ in 0..50 {
            if handle.is_finished() && counter.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(handle.is_finished());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(handle.name(), "push");
    }
}
