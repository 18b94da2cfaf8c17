use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::AppResult;
use crate::ports::{PurchaseJob, PurchaseQueue};
use crate::queue::{QueuedJob, queue_key};

/// 入队端。同一 purchaseNo 在去重窗口内只会入队一次。
pub struct RedisPurchaseQueue {
    redis: ConnectionManager,
    dedup_ttl_secs: u64,
}

impl RedisPurchaseQueue {
    pub fn new(redis: ConnectionManager, dedup_ttl_secs: u64) -> Self {
        Self {
            redis,
            dedup_ttl_secs,
        }
    }
}

#[async_trait]
impl PurchaseQueue for RedisPurchaseQueue {
    async fn enqueue(&self, job: &PurchaseJob) -> AppResult<()> {
        let mut conn = self.redis.clone();

        // SET NX EX 占坑，占不到说明同号作业已在队列里
        let marker = queue_key(&format!("ids:purchase-{}", job.purchase_no));
        let claimed: bool = redis::cmd("SET")
            .arg(&marker)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.dedup_ttl_secs)
            .query_async(&mut conn)
            .await?;
        if !claimed {
            log::debug!("Duplicate job skipped: {}", job.purchase_no);
            return Ok(());
        }

        let payload = serde_json::to_string(&QueuedJob {
            data: job.clone(),
            attempts: 0,
        })?;
        let _: () = conn.lpush(queue_key("pending"), payload).await?;

        log::info!("Enqueued purchase persistence: {}", job.purchase_no);
        Ok(())
    }
}
