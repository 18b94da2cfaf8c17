use std::sync::Arc;

use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::domain::{Purchase, PurchaseNumber, Sku, UserId};
use crate::error::{AppError, AppResult};
use crate::ports::{PurchaseJob, PurchaseRepository};
use crate::queue::{QueuedJob, queue_key};
use crate::utils::CircuitBreaker;

/// 指数退避：base * 2^(attempt-1)，attempt 从 1 起
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let shift = attempt.saturating_sub(1).min(20);
    base_ms.saturating_mul(1u64 << shift)
}

fn job_purchase(data: &PurchaseJob) -> AppResult<Purchase> {
    let sku = Sku::new(data.sku.as_str())?;
    let user_id = UserId::new(data.user_id.as_str())?;
    let purchased_at = DateTime::parse_from_rfc3339(&data.purchased_at)
        .map_err(|_| {
            AppError::ValidationError(format!("Invalid purchasedAt in job: {}", data.purchased_at))
        })?
        .with_timezone(&Utc);
    Ok(Purchase::reconstitute(
        PurchaseNumber::from_value(data.purchase_no.clone()),
        sku,
        user_id,
        purchased_at,
    ))
}

/// 出队端。持有自己独立的 Redis 连接，因为 BRPOP 会阻塞整条
/// 复用连接，不能和状态读写共用。
pub struct PurchaseQueueWorker {
    redis: ConnectionManager,
    ledger: Arc<dyn PurchaseRepository>,
    breaker: Arc<CircuitBreaker>,
    max_attempts: u32,
    backoff_base_ms: u64,
}

impl PurchaseQueueWorker {
    pub fn new(
        redis: ConnectionManager,
        ledger: Arc<dyn PurchaseRepository>,
        breaker: Arc<CircuitBreaker>,
        max_attempts: u32,
        backoff_base_ms: u64,
    ) -> Self {
        Self {
            redis,
            ledger,
            breaker,
            max_attempts,
            backoff_base_ms,
        }
    }

    /// 阻塞最多一秒等一个作业。返回是否处理了作业。
    pub async fn process_next(&self) -> AppResult<bool> {
        let mut conn = self.redis.clone();
        let popped: Option<(String, String)> = conn.brpop(queue_key("pending"), 1.0).await?;

        let Some((_, payload)) = popped else {
            return Ok(false);
        };

        match serde_json::from_str::<QueuedJob>(&payload) {
            Ok(job) => self.handle(job).await?,
            // 解析不了的负载直接进死信，不占重试预算
            Err(err) => {
                log::error!("Discarding malformed queue payload: {err}");
                let _: () = conn.lpush(queue_key("failed"), payload).await?;
            }
        }
        Ok(true)
    }

    async fn handle(&self, job: QueuedJob) -> AppResult<()> {
        let purchase_no = job.data.purchase_no.clone();
        log::info!("Persisting purchase: {purchase_no}");

        let outcome = self
            .breaker
            .run(|| async {
                let purchase = job_purchase(&job.data)?;
                self.ledger.persist(&purchase).await
            })
            .await;

        match outcome {
            Ok(()) => {
                log::info!("Purchase persisted to PostgreSQL: {purchase_no}");
                Ok(())
            }
            Err(err) => self.retry_or_bury(job, err).await,
        }
    }

    async fn retry_or_bury(&self, mut job: QueuedJob, err: AppError) -> AppResult<()> {
        let mut conn = self.redis.clone();
        job.attempts += 1;
        let payload = serde_json::to_string(&job)?;

        if job.attempts >= self.max_attempts {
            // 重试耗尽的作业保留在死信队列里供人工排查
            let _: () = conn.lpush(queue_key("failed"), payload).await?;
            log::error!(
                "Purchase persistence failed permanently: {} after {} attempt(s): {err}",
                job.data.purchase_no,
                job.attempts
            );
            return Ok(());
        }

        let delay_ms = backoff_delay_ms(self.backoff_base_ms, job.attempts);
        let due_at = Utc::now().timestamp_millis() + delay_ms as i64;
        let _: () = conn.zadd(queue_key("delayed"), payload, due_at).await?;
        log::warn!(
            "Purchase persistence failed: {} (attempt {}/{}), retrying in {delay_ms}ms: {err}",
            job.data.purchase_no,
            job.attempts,
            self.max_attempts
        );
        Ok(())
    }

    /// 把到期的延迟作业搬回待处理队列。ZREM 作为认领，多个进程
    /// 同时提升也不会重复投递。
    pub async fn promote_due(&self) -> AppResult<u32> {
        let mut conn = self.redis.clone();
        let now_ms = Utc::now().timestamp_millis();

        let due: Vec<String> = conn
            .zrangebyscore(queue_key("delayed"), "-inf", now_ms)
            .await?;

        let mut promoted = 0;
        for payload in due {
            let removed: i64 = conn.zrem(queue_key("delayed"), &payload).await?;
            if removed == 1 {
                let _: () = conn.lpush(queue_key("pending"), payload).await?;
                promoted += 1;
            }
        }

        if promoted > 0 {
            log::debug!("Promoted {promoted} delayed job(s)");
        }
        Ok(promoted)
    }
}
