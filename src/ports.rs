//! Collaborator seams between the use-case layer and the infrastructure
//! adapters (Redis fast store, Postgres ledger, job queue, event fan-out).
//! Test suites substitute in-memory fakes behind these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainEvent, Purchase, PurchaseNumber, Sale, SaleState, Sku, UserId};
use crate::error::AppResult;

/// 拒绝码（作为数据返回，不是错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionCode {
    SaleNotActive,
    SoldOut,
    AlreadyPurchased,
}

impl RejectionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionCode::SaleNotActive => "SALE_NOT_ACTIVE",
            RejectionCode::SoldOut => "SOLD_OUT",
            RejectionCode::AlreadyPurchased => "ALREADY_PURCHASED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SALE_NOT_ACTIVE" => Some(RejectionCode::SaleNotActive),
            "SOLD_OUT" => Some(RejectionCode::SoldOut),
            "ALREADY_PURCHASED" => Some(RejectionCode::AlreadyPurchased),
            _ => None,
        }
    }
}

/// 购买尝试的两种可观察结果
#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseAttempt {
    Success {
        purchase_no: PurchaseNumber,
        remaining_stock: u32,
        purchased_at: DateTime<Utc>,
    },
    Rejected {
        code: RejectionCode,
    },
}

/// 状态转换脚本的三种结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    TransitionedToActive,
    TransitionedToEnded,
    NoTransition,
}

impl TransitionOutcome {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "transitioned_to_active" => Some(TransitionOutcome::TransitionedToActive),
            "transitioned_to_ended" => Some(TransitionOutcome::TransitionedToEnded),
            "no_transition" => Some(TransitionOutcome::NoTransition),
            _ => None,
        }
    }
}

/// 快速存储里的销售快照。时间字段保持 config 哈希里的原始字符串
/// （epoch 毫秒），由调用方按需解析。
#[derive(Debug, Clone, Serialize)]
pub struct SaleStatus {
    pub sku: String,
    pub state: SaleState,
    pub stock: u32,
    pub initial_stock: u32,
    pub product_name: String,
    pub start_time: String,
    pub end_time: String,
}

/// 持久化台账里的商品行
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub id: i64,
    pub sku: String,
    pub product_name: String,
    pub initial_stock: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

/// upsert 用的商品写入数据
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub sku: String,
    pub product_name: String,
    pub initial_stock: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub state: SaleState,
    pub created_by: String,
    pub updated_by: Option<String>,
}

/// 写后队列的任务负载（JSON 按 camelCase 序列化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseJob {
    pub purchase_no: String,
    pub sku: String,
    pub user_id: String,
    /// ISO-8601 时间戳
    pub purchased_at: String,
}

/// 快速存储（Redis）：准入判定与派生状态的权威来源
#[async_trait]
pub trait SaleStore: Send + Sync {
    async fn attempt_purchase(&self, sku: &Sku, user_id: &UserId) -> AppResult<PurchaseAttempt>;

    async fn get_sale_status(&self, sku: &Sku) -> AppResult<SaleStatus>;

    async fn initialize_sale(&self, sale: &Sale) -> AppResult<()>;

    async fn transition_state(&self, sku: &Sku, now: DateTime<Utc>)
    -> AppResult<TransitionOutcome>;

    async fn delete_sale(&self, sku: &Sku) -> AppResult<()>;

    /// 买家去重集合的全部成员（对账输入）
    async fn buyers(&self, sku: &Sku) -> AppResult<Vec<String>>;

    /// 当前存在状态键的全部 SKU（后台扫描输入）
    async fn sale_skus(&self) -> AppResult<Vec<String>>;
}

/// 持久化台账：购买记录
#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// 幂等写入。同一 (product, user) 重复写入不报错也不产生新行。
    async fn persist(&self, purchase: &Purchase) -> AppResult<()>;

    async fn find_by_user(&self, sku: &Sku, user_id: &UserId) -> AppResult<Option<Purchase>>;

    /// 某商品已落库的全部 user_id（对账比对用）
    async fn list_user_ids(&self, product_id: i64) -> AppResult<Vec<String>>;
}

/// 持久化台账：商品配置行
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_sku(&self, sku: &Sku) -> AppResult<Option<ProductRecord>>;

    async fn upsert_by_sku(&self, draft: &ProductDraft) -> AppResult<()>;

    async fn delete_by_sku(&self, sku: &Sku) -> AppResult<()>;
}

/// 领域事件发布
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()>;
}

/// 写后持久化队列的入口
#[async_trait]
pub trait PurchaseQueue: Send + Sync {
    async fn enqueue(&self, job: &PurchaseJob) -> AppResult<()>;
}
