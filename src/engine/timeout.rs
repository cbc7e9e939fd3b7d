//! 超时与并发控制
//! 1. 同步分析任务放到阻塞线程池执行，超时后发出取消信号并放弃结果
//! 2. 活跃任务登记，定期清理超过两倍预算仍未结束的记录
//! 3. 分组批处理：组内并发、组间串行，单项失败不影响同组其他任务

use crate::error::{BaselineLensError, BlResult};
use log::{debug, warn};
use rustc_hash::FxHashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::{JoinHandle, JoinSet};

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

/// 协作式取消信号：显式取消或超过截止时间即视为已取消
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    state: Arc<CancelState>,
}

impl CancelFlag {
    /// 无截止时间，仅响应显式取消
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            state: Arc::new(CancelState {
                cancelled: AtomicBool::new(false),
                deadline: Some(deadline),
            }),
        }
    }

    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
            || self.state.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// 已取消时返回 `Cancelled`，供分析循环 `?` 提前退出
    #[inline]
    pub fn check(&self) -> BlResult<()> {
        if self.is_cancelled() {
            Err(BaselineLensError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 距截止时间的剩余预算（无截止时间返回 None）
    pub fn remaining(&self) -> Option<Duration> {
        self.state
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// 活跃任务记录
#[derive(Debug, Clone)]
pub struct ActiveTask {
    pub label: String,
    pub started: Instant,
    pub budget: Duration,
    cancel: CancelFlag,
}

impl ActiveTask {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.started) > self.budget.saturating_mul(2)
    }
}

#[derive(Debug, Default)]
pub struct TimeoutManager {
    next_id: AtomicU64,
    active: Arc<Mutex<FxHashMap<u64, ActiveTask>>>,
}

impl TimeoutManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, label: &str, budget: Duration, cancel: CancelFlag) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.active.lock().unwrap_or_else(|e| e.into_inner()).insert(
            id,
            ActiveTask {
                label: label.to_string(),
                started: Instant::now(),
                budget,
                cancel,
            },
        );
        id
    }

    fn unregister(&self, id: u64) {
        remove_task(&self.active, id);
    }

    /// 在独立阻塞线程上运行同步任务，最多等待 `budget`
    /// 超时：发出取消信号，返回 `TimeoutError`，线程结果被丢弃；
    /// 登记在线程结束后移除，线程一直不结束的由 `sweep_stale` 回收
    pub async fn run_with_timeout<T, F>(&self, label: &str, budget: Duration, op: F) -> BlResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelFlag) -> BlResult<T> + Send + 'static,
    {
        let budget_ms = budget.as_millis() as u64;
        let cancel = CancelFlag::with_deadline(Instant::now() + budget);
        let id = self.register(label, budget, cancel.clone());

        let worker_flag = cancel.clone();
        let mut handle = tokio::task::spawn_blocking(move || op(&worker_flag));

        match tokio::time::timeout(budget, &mut handle).await {
            Ok(joined) => {
                self.unregister(id);
                match joined {
                    // 任务自行观察到截止时间
                    Ok(Err(BaselineLensError::Cancelled)) => {
                        Err(BaselineLensError::TimeoutError(budget_ms))
                    }
                    Ok(result) => result,
                    Err(e) => Err(BaselineLensError::UnknownError(format!(
                        "analysis task [{}] aborted: {}",
                        label, e
                    ))),
                }
            }
            Err(_) => {
                cancel.cancel();
                warn!("[{}] exceeded {}ms budget, cancellation signalled", label, budget_ms);
                let active = self.active.clone();
                tokio::spawn(async move {
                    let _ = handle.await;
                    remove_task(&active, id);
                });
                Err(BaselineLensError::TimeoutError(budget_ms))
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 回收超过两倍预算的登记，返回回收数量
    pub fn sweep_stale(&self) -> usize {
        let now = Instant::now();
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        let before = active.len();
        active.retain(|_, task| {
            if task.is_stale(now) {
                task.cancel.cancel();
                debug!("Reclaimed stale task [{}]", task.label);
                false
            } else {
                true
            }
        });
        before - active.len()
    }

    /// 周期性清理；管理器释放后任务自动退出
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                let reclaimed = manager.sweep_stale();
                if reclaimed > 0 {
                    debug!("Sweeper reclaimed {} stale task(s)", reclaimed);
                }
            }
        })
    }

    /// 分组批处理：每组最多 `batch_size` 个并发，组间串行；结果与输入顺序一致
    pub async fn run_batched<I, T, F, Fut>(
        &self,
        items: Vec<I>,
        batch_size: usize,
        f: F,
    ) -> Vec<BlResult<T>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = BlResult<T>> + Send + 'static,
    {
        let batch_size = batch_size.max(1);
        let mut results: Vec<Option<BlResult<T>>> = (0..items.len()).map(|_| None).collect();
        let mut pending = items.into_iter().enumerate().peekable();

        while pending.peek().is_some() {
            let mut group = JoinSet::new();
            for (idx, item) in pending.by_ref().take(batch_size) {
                let fut = f(item);
                group.spawn(async move { (idx, fut.await) });
            }
            while let Some(joined) = group.join_next().await {
                match joined {
                    Ok((idx, result)) => results[idx] = Some(result),
                    Err(e) => warn!("Batch member aborted: {}", e),
                }
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(BaselineLensError::UnknownError("batch member aborted".into()))
                })
            })
            .collect()
    }
}

fn remove_task(active: &Mutex<FxHashMap<u64, ActiveTask>>, id: u64) {
    active.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_completes_within_budget() {
        let manager = TimeoutManager::new();
        let value = manager
            .run_with_timeout("quick", Duration::from_secs(5), |_| Ok(42))
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_signals_cancellation() {
        let manager = TimeoutManager::new();
        let observed = Arc::new(AtomicBool::new(false));
        let seen = observed.clone();

        let err = manager
            .run_with_timeout("slow", Duration::from_millis(30), move |cancel| {
                while !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
                seen.store(true, Ordering::SeqCst);
                Err::<(), _>(BaselineLensError::Cancelled)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BaselineLensError::TimeoutError(30)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(observed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_errors_pass_through() {
        let manager = TimeoutManager::new();
        let err = manager
            .run_with_timeout("bad", Duration::from_secs(5), |_| {
                Err::<(), _>(BaselineLensError::parsing("boom", Some(1), Some(2)))
            })
            .await
            .unwrap_err();
        assert_eq!(err.position(), (Some(1), Some(2)));
    }

    #[tokio::test]
    async fn test_sweep_reclaims_abandoned_tasks() {
        let manager = TimeoutManager::new();
        let _ = manager
            .run_with_timeout("stuck", Duration::from_millis(10), |_| {
                std::thread::sleep(Duration::from_millis(80));
                Ok(())
            })
            .await;
        // 超时后登记保留
        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.sweep_stale(), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(manager.sweep_stale(), 1);
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_record_released_when_worker_finishes() {
        let manager = TimeoutManager::new();
        let err = manager
            .run_with_timeout("late", Duration::from_millis(5), |_| {
                std::thread::sleep(Duration::from_millis(30));
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BaselineLensError::TimeoutError(5)));
        assert_eq!(manager.active_count(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_run_batched_keeps_order_and_isolates_failures() {
        let manager = TimeoutManager::new();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let results = manager
            .run_batched((0..7).collect(), 3, |n: u32| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    if n == 4 {
                        Err(BaselineLensError::UnknownError("four".into()))
                    } else {
                        Ok(n * 10)
                    }
                }
            })
            .await;

        assert_eq!(results.len(), 7);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        for (i, result) in results.iter().enumerate() {
            match result {
                Ok(v) => assert_eq!(*v, i as u32 * 10),
                Err(_) => assert_eq!(i, 4),
            }
        }
    }

    #[test]
    fn test_cancel_flag_deadline() {
        let flag = CancelFlag::with_deadline(Instant::now());
        assert!(flag.is_cancelled());
        assert!(flag.check().is_err());

        let open = CancelFlag::new();
        assert!(!open.is_cancelled());
        assert!(open.remaining().is_none());
        open.cancel();
        assert!(matches!(open.check(), Err(BaselineLensError::Cancelled)));
    }
}
