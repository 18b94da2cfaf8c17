use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

/// 熔断器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    failure_count: u32,
    opened_at: Option<Instant>,
}

/// 包住持久化调用的熔断器。
///
/// CLOSED 正常放行；连续失败达到阈值后切 OPEN，之后的调用直接以
/// [`AppError::CircuitOpen`] 快速失败，不触碰下游。OPEN 满恢复窗口后
/// 下一次调用进入 HALF_OPEN 试探：成功回 CLOSED，失败立刻回 OPEN。
/// 状态切换是惰性的，没有后台定时器。
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_time: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_time_ms: u64) -> Self {
        Self {
            failure_threshold,
            recovery_time: Duration::from_millis(recovery_time_ms),
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                failure_count: 0,
                opened_at: None,
            }),
        }
    }

    pub async fn state(&self) -> BreakerState {
        self.inner.lock().await.state
    }

    /// 执行受保护的调用。锁只护住状态判定，不会跨越下游调用持有。
    pub async fn run<F, Fut, T>(&self, operation: F) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        {
            let mut inner = self.inner.lock().await;
            if inner.state == BreakerState::Open {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed < self.recovery_time {
                    return Err(AppError::CircuitOpen);
                }
                inner.state = BreakerState::HalfOpen;
                inner.failure_count = 0;
                log::info!("Circuit breaker HALF_OPEN: allowing probe call");
            }
        }

        let result = operation().await;

        let mut inner = self.inner.lock().await;
        match result {
            Ok(value) => {
                if inner.state != BreakerState::Closed {
                    log::info!("Circuit breaker CLOSED: downstream recovered");
                }
                inner.state = BreakerState::Closed;
                inner.failure_count = 0;
                inner.opened_at = None;
                Ok(value)
            }
            Err(err) => {
                inner.failure_count += 1;
                if inner.state == BreakerState::HalfOpen
                    || inner.failure_count >= self.failure_threshold
                {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    log::warn!(
                        "Circuit breaker OPEN after {} consecutive failure(s)",
                        inner.failure_count
                    );
                }
                Err(err)
            }
        }
    }
}
