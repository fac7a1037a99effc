//! 并发协调器
//!
//! 持有固定容量的 worker 池，为阶段 2–3 按设备派发任务，把
//! 各设备的结果收齐到一个集合中。`run_per_device` 等待全部任务
//! 终态后才返回，即阶段 4 之前的汇合屏障：返回后调用方能确定
//! 每台设备要么成功要么带错误终止，不存在仍在运行的 worker。
//!
//! 一台设备的失败或超时不会取消其他设备的任务。

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{OrchestratorError, Result};

/// 并发协调器
pub struct Coordinator {
    /// worker 池容量
    semaphore: Arc<Semaphore>,
}

impl Coordinator {
    /// 创建固定容量的协调器
    pub fn new(worker_cap: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(worker_cap.max(1))),
        }
    }

    /// 按设备派发任务并等待全部终态（汇合屏障）
    ///
    /// 返回 设备名 → 任务结果 的映射；worker panic 或被取消时
    /// 折算为该设备的 `WorkerFailed`，同样不影响其他设备。
    pub async fn run_per_device<T, F, Fut>(
        &self,
        devices: Vec<String>,
        task: F,
    ) -> HashMap<String, Result<T>>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let mut join_set = JoinSet::new();

        for device in devices {
            let permit_source = Arc::clone(&self.semaphore);
            let future = task(device.clone());
            join_set.spawn(async move {
                // 关闭语义不使用，acquire 不会失败
                let _permit = permit_source.acquire_owned().await;
                debug!("worker 启动: {}", device);
                let result = future.await;
                (device, result)
            });
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((device, result)) => {
                    outcomes.insert(device, result);
                }
                Err(e) => {
                    warn!("worker 异常退出: {}", e);
                    // 设备名随任务一起丢失，挂到合成键下，保证失败可见
                    outcomes.insert(
                        format!("<panicked-{}>", outcomes.len()),
                        Err(OrchestratorError::WorkerFailed(e.to_string())),
                    );
                }
            }
        }
        outcomes
    }

    /// 屏障语义的便捷形式：返回成功设备集合
    pub async fn join_barrier<T, F, Fut>(&self, devices: Vec<String>, task: F) -> Vec<String>
    where
        T: Send + 'static,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.run_per_device(devices, task)
            .await
            .into_iter()
            .filter_map(|(device, result)| result.is_ok().then_some(device))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_tasks_reach_terminal_state() {
        let coordinator = Coordinator::new(2);
        let devices = vec!["fw-1".to_string(), "fw-2".to_string(), "fw-3".to_string()];

        let outcomes = coordinator
            .run_per_device(devices, |device| async move {
                if device == "fw-2" {
                    Err(OrchestratorError::ConsoleError("提示超时".to_string()))
                } else {
                    Ok(device)
                }
            })
            .await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes["fw-1"].is_ok());
        assert!(outcomes["fw-2"].is_err());
        assert!(outcomes["fw-3"].is_ok());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_cancel_others() {
        let coordinator = Coordinator::new(4);
        let completed = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&completed);
        let outcomes = coordinator
            .run_per_device(
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                move |device| {
                    let counter = Arc::clone(&counter);
                    async move {
                        if device == "a" {
                            return Err(OrchestratorError::LabError("节点创建失败".to_string()));
                        }
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )
            .await;

        // 失败的 a 不影响 b、c 跑完
        assert_eq!(completed.load(Ordering::SeqCst), 2);
        assert!(outcomes["a"].is_err());
    }

    #[tokio::test]
    async fn test_worker_cap_bounds_concurrency() {
        let coordinator = Coordinator::new(1);
        let peak = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));

        let peak_ref = Arc::clone(&peak);
        let current_ref = Arc::clone(&current);
        coordinator
            .run_per_device(
                (0..4).map(|i| format!("fw-{}", i)).collect(),
                move |_device| {
                    let peak = Arc::clone(&peak_ref);
                    let current = Arc::clone(&current_ref);
                    async move {
                        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        current.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )
            .await;

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_join_barrier_returns_succeeded_set() {
        let coordinator = Coordinator::new(2);
        let mut succeeded = coordinator
            .join_barrier(
                vec!["fw-1".to_string(), "fw-2".to_string()],
                |device| async move {
                    if device == "fw-1" {
                        Ok(())
                    } else {
                        Err(OrchestratorError::ConsoleError("失败".to_string()))
                    }
                },
            )
            .await;

        succeeded.sort();
        assert_eq!(succeeded, vec!["fw-1".to_string()]);
    }
}
