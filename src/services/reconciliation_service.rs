use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::domain::{SaleState, Sku};
use crate::error::AppResult;
use crate::ports::{ProductRepository, PurchaseJob, PurchaseQueue, PurchaseRepository, SaleStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    pub mismatches: u32,
}

/// 对账：买家集合是事实来源，台账缺的行补写回队列。
/// 只读快速存储，永远不改它。
#[derive(Clone)]
pub struct ReconciliationService {
    store: Arc<dyn SaleStore>,
    products: Arc<dyn ProductRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    queue: Arc<dyn PurchaseQueue>,
}

impl ReconciliationService {
    pub fn new(
        store: Arc<dyn SaleStore>,
        products: Arc<dyn ProductRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        queue: Arc<dyn PurchaseQueue>,
    ) -> Self {
        Self {
            store,
            products,
            purchases,
            queue,
        }
    }

    pub async fn reconcile(&self, sku: &str) -> AppResult<ReconciliationOutcome> {
        let sku = Sku::new(sku)?;
        log::info!("Starting reconciliation for SKU: {}", sku.as_str());

        let Some(product) = self.products.find_by_sku(&sku).await? else {
            log::warn!(
                "Product not found for SKU: {}, skipping reconciliation",
                sku.as_str()
            );
            return Ok(ReconciliationOutcome { mismatches: 0 });
        };

        let buyers = self.store.buyers(&sku).await?;
        if buyers.is_empty() {
            log::info!("No buyers in Redis for SKU: {}", sku.as_str());
            return Ok(ReconciliationOutcome { mismatches: 0 });
        }

        let persisted: HashSet<String> = self
            .purchases
            .list_user_ids(product.id)
            .await?
            .into_iter()
            .collect();

        let missing: Vec<String> = buyers
            .into_iter()
            .filter(|user_id| !persisted.contains(user_id))
            .collect();

        if missing.is_empty() {
            log::info!(
                "Reconciliation complete for SKU: {}, no mismatches",
                sku.as_str()
            );
            return Ok(ReconciliationOutcome { mismatches: 0 });
        }

        log::warn!(
            "Reconciliation found {} mismatches for SKU: {}",
            missing.len(),
            sku.as_str()
        );

        // 补写的 purchasedAt 用对账时刻：buyers 集合里只有用户 ID，
        // 没有各自的原始购买时间。RECON- 前缀标记对账来源。
        for user_id in &missing {
            self.queue
                .enqueue(&PurchaseJob {
                    purchase_no: format!("RECON-{}-{}", Utc::now().timestamp_millis(), user_id),
                    sku: sku.as_str().to_string(),
                    user_id: user_id.clone(),
                    purchased_at: Utc::now().to_rfc3339(),
                })
                .await?;
        }

        log::info!(
            "Reconciliation re-enqueued {} purchases for SKU: {}",
            missing.len(),
            sku.as_str()
        );

        Ok(ReconciliationOutcome {
            mismatches: missing.len() as u32,
        })
    }

    /// 后台扫描入口：UPCOMING 还没有买家，跳过
    pub async fn reconcile_all(&self) -> AppResult<()> {
        let skus = self.store.sale_skus().await?;
        for raw in skus {
            if let Err(err) = self.reconcile_if_started(&raw).await {
                log::error!("Error reconciling sale {raw}: {err}");
            }
        }
        Ok(())
    }

    async fn reconcile_if_started(&self, raw: &str) -> AppResult<()> {
        let sku = Sku::new(raw)?;
        let status = self.store.get_sale_status(&sku).await?;
        if status.state == SaleState::Upcoming {
            return Ok(());
        }
        self.reconcile(raw).await?;
        Ok(())
    }
}
