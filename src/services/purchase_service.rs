use std::sync::Arc;

use crate::domain::{DomainEvent, Purchase, SaleEvent, Sku, UserId};
use crate::error::AppResult;
use crate::ports::{
    EventPublisher, PurchaseAttempt, PurchaseJob, PurchaseQueue, PurchaseRepository, SaleStore,
};

/// 购买用例：准入判定走快速存储，成功后发事件并把持久化作业入队。
/// 台账写入不在请求路径上。
#[derive(Clone)]
pub struct PurchaseService {
    store: Arc<dyn SaleStore>,
    ledger: Arc<dyn PurchaseRepository>,
    queue: Arc<dyn PurchaseQueue>,
    events: Arc<dyn EventPublisher>,
}

impl PurchaseService {
    pub fn new(
        store: Arc<dyn SaleStore>,
        ledger: Arc<dyn PurchaseRepository>,
        queue: Arc<dyn PurchaseQueue>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            ledger,
            queue,
            events,
        }
    }

    pub async fn attempt_purchase(&self, sku: &str, user_id: &str) -> AppResult<PurchaseAttempt> {
        let user_id = UserId::new(user_id)?;
        let sku = Sku::new(sku)?;

        log::info!(
            "Purchase attempt: user={}, sku={}",
            user_id.as_str(),
            sku.as_str()
        );

        let result = self.store.attempt_purchase(&sku, &user_id).await?;

        match &result {
            PurchaseAttempt::Success {
                purchase_no,
                remaining_stock,
                purchased_at,
            } => {
                log::info!(
                    "Purchase confirmed: user={}, remaining={}",
                    user_id.as_str(),
                    remaining_stock
                );

                self.events
                    .publish(&DomainEvent::new(SaleEvent::PurchaseConfirmed {
                        sku: sku.clone(),
                        user_id: user_id.clone(),
                        remaining_stock: *remaining_stock,
                    }))
                    .await?;

                self.queue
                    .enqueue(&PurchaseJob {
                        purchase_no: purchase_no.as_str().to_string(),
                        sku: sku.as_str().to_string(),
                        user_id: user_id.as_str().to_string(),
                        purchased_at: purchased_at.to_rfc3339(),
                    })
                    .await?;
            }
            PurchaseAttempt::Rejected { code } => {
                log::info!(
                    "Purchase rejected: user={}, reason={}",
                    user_id.as_str(),
                    code.as_str()
                );
            }
        }

        Ok(result)
    }

    /// 查询某用户在某销售里的已确认购买（读台账，不读快速存储）
    pub async fn get_purchase_status(
        &self,
        sku: &str,
        user_id: &str,
    ) -> AppResult<Option<Purchase>> {
        let user_id = UserId::new(user_id)?;
        let sku = Sku::new(sku)?;
        self.ledger.find_by_user(&sku, &user_id).await
    }
}
