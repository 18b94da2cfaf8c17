//! Write-behind persistence queue over Redis. Admission answers from the
//! fast store immediately; the durable ledger row is written by a worker
//! pulling jobs off this queue, with retry, backoff and a dead-letter list.

use serde::{Deserialize, Serialize};

use crate::ports::PurchaseJob;

pub mod producer;
pub mod worker;

pub use producer::RedisPurchaseQueue;
pub use worker::PurchaseQueueWorker;

pub const QUEUE_NAME: &str = "purchase-persistence";

/// 队列键：queue:purchase-persistence:{pending|delayed|failed|ids:*}
pub fn queue_key(suffix: &str) -> String {
    format!("queue:{QUEUE_NAME}:{suffix}")
}

/// 入队信封：业务负载平铺 + 已消耗的尝试次数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJob {
    #[serde(flatten)]
    pub data: PurchaseJob,
    #[serde(default)]
    pub attempts: u32,
}
