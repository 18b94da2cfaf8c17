use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{DomainEvent, EndReason, Sale, SaleEvent, SaleState, Sku};
use crate::error::{AppError, AppResult};
use crate::ports::{EventPublisher, ProductDraft, ProductRepository, SaleStore, TransitionOutcome};
use crate::utils::parse_flexible_timestamp;

pub struct CreateSaleCommand {
    pub sku: String,
    pub product_name: String,
    pub initial_stock: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// 更新命令，None 的字段保留现值
pub struct UpdateSaleCommand {
    pub sku: String,
    pub product_name: Option<String>,
    pub initial_stock: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// 管理视图：快速存储快照与台账商品行的合并结果
#[derive(Debug, Clone)]
pub struct SaleOverview {
    pub sku: String,
    pub product_name: String,
    pub initial_stock: u32,
    pub current_stock: u32,
    pub start_time: String,
    pub end_time: String,
    pub state: SaleState,
    pub total_purchases: u32,
    pub created_at: String,
}

/// 销售生命周期用例：创建/更新/删除/查询与状态推进。
/// 快速存储是运行时权威，台账商品行只做审计与对账锚点。
#[derive(Clone)]
pub struct SaleService {
    store: Arc<dyn SaleStore>,
    products: Arc<dyn ProductRepository>,
    events: Arc<dyn EventPublisher>,
}

impl SaleService {
    pub fn new(
        store: Arc<dyn SaleStore>,
        products: Arc<dyn ProductRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            products,
            events,
        }
    }

    /// 创建（或重置）一场销售：先写快速存储，再落台账商品行
    pub async fn create_sale(&self, cmd: CreateSaleCommand) -> AppResult<()> {
        let sale = Sale::create(
            &cmd.sku,
            &cmd.product_name,
            i64::from(cmd.initial_stock),
            cmd.start_time,
            cmd.end_time,
        )?;

        self.store.initialize_sale(&sale).await?;
        log::info!("Sale created: sku={}", sale.sku().as_str());

        self.products
            .upsert_by_sku(&ProductDraft {
                sku: cmd.sku.clone(),
                product_name: cmd.product_name.clone(),
                initial_stock: cmd.initial_stock,
                start_time: cmd.start_time,
                end_time: cmd.end_time,
                state: SaleState::Upcoming,
                created_by: "admin".to_string(),
                updated_by: None,
            })
            .await?;

        Ok(())
    }

    /// 只允许改 UPCOMING 的销售。缺省字段从现有配置补齐后整体重建。
    pub async fn update_sale(&self, cmd: UpdateSaleCommand) -> AppResult<()> {
        let sku = Sku::new(cmd.sku.as_str())?;
        let status = self.store.get_sale_status(&sku).await?;

        if status.state != SaleState::Upcoming {
            return Err(AppError::ValidationError(format!(
                "Sale {} cannot be modified in {} state",
                sku.as_str(),
                status.state.as_str()
            )));
        }

        let product_name = cmd.product_name.unwrap_or(status.product_name);
        let initial_stock = cmd.initial_stock.unwrap_or(status.initial_stock as i32);
        let start_time = match cmd.start_time {
            Some(t) => t,
            None => parse_flexible_timestamp(&status.start_time).ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Sale {} has no parsable startTime on record",
                    sku.as_str()
                ))
            })?,
        };
        let end_time = match cmd.end_time {
            Some(t) => t,
            None => parse_flexible_timestamp(&status.end_time).ok_or_else(|| {
                AppError::ValidationError(format!(
                    "Sale {} has no parsable endTime on record",
                    sku.as_str()
                ))
            })?,
        };

        let sale = Sale::create(
            sku.as_str(),
            &product_name,
            i64::from(initial_stock),
            start_time,
            end_time,
        )?;
        self.store.initialize_sale(&sale).await?;
        log::info!("Sale updated: sku={}", sku.as_str());

        self.products
            .upsert_by_sku(&ProductDraft {
                sku: sku.as_str().to_string(),
                product_name,
                initial_stock,
                start_time,
                end_time,
                state: SaleState::Upcoming,
                created_by: "admin".to_string(),
                updated_by: Some("admin".to_string()),
            })
            .await?;

        Ok(())
    }

    /// 删除快速存储键和台账商品行。外键没有级联，
    /// 已有购买记录的商品行删不掉，数据库会直接拒绝。
    pub async fn delete_sale(&self, sku: &str) -> AppResult<()> {
        let sku = Sku::new(sku)?;
        log::warn!("Deleting product and all sale data: sku={}", sku.as_str());

        tokio::try_join!(
            self.store.delete_sale(&sku),
            self.products.delete_by_sku(&sku)
        )?;
        Ok(())
    }

    pub async fn get_sale_status(&self, sku: &str) -> AppResult<crate::ports::SaleStatus> {
        let sku = Sku::new(sku)?;
        self.store.get_sale_status(&sku).await
    }

    /// 管理详情：快照 + 商品行合并，算出已售数量
    pub async fn get_sale_overview(&self, sku: &str) -> AppResult<SaleOverview> {
        let sku = Sku::new(sku)?;
        let (status, product) = tokio::try_join!(
            self.store.get_sale_status(&sku),
            self.products.find_by_sku(&sku)
        )?;

        if product.is_none() && status.initial_stock == 0 && status.product_name.is_empty() {
            return Err(AppError::NotFound(format!(
                "Product with SKU '{}' not found",
                sku.as_str()
            )));
        }

        let start_time = if status.start_time.is_empty() {
            product
                .as_ref()
                .map(|p| p.start_time.to_rfc3339())
                .unwrap_or_default()
        } else {
            parse_flexible_timestamp(&status.start_time)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        };
        let end_time = if status.end_time.is_empty() {
            product
                .as_ref()
                .map(|p| p.end_time.to_rfc3339())
                .unwrap_or_default()
        } else {
            parse_flexible_timestamp(&status.end_time)
                .map(|t| t.to_rfc3339())
                .unwrap_or_default()
        };
        let product_name = if status.product_name.is_empty() {
            product
                .as_ref()
                .map(|p| p.product_name.clone())
                .unwrap_or_default()
        } else {
            status.product_name
        };

        Ok(SaleOverview {
            sku: status.sku,
            product_name,
            initial_stock: status.initial_stock,
            current_stock: status.stock,
            start_time,
            end_time,
            state: status.state,
            total_purchases: status.initial_stock.saturating_sub(status.stock),
            created_at: product
                .as_ref()
                .map(|p| p.created_at.to_rfc3339())
                .unwrap_or_default(),
        })
    }

    /// 按当前时刻推进一场销售的状态，发生转换时发布对应事件
    pub async fn transition_state(&self, sku: &str) -> AppResult<TransitionOutcome> {
        let sku = Sku::new(sku)?;
        log::debug!("Transition check: sku={}", sku.as_str());

        let outcome = self.store.transition_state(&sku, Utc::now()).await?;

        match outcome {
            TransitionOutcome::TransitionedToActive => {
                self.events
                    .publish(&DomainEvent::new(SaleEvent::SaleStarted { sku: sku.clone() }))
                    .await?;
                log::info!("Sale started: sku={}", sku.as_str());
            }
            TransitionOutcome::TransitionedToEnded => {
                self.events
                    .publish(&DomainEvent::new(SaleEvent::SaleEnded {
                        sku: sku.clone(),
                        reason: EndReason::TimeExpired,
                    }))
                    .await?;
                log::info!("Sale ended: sku={}", sku.as_str());
            }
            TransitionOutcome::NoTransition => {
                log::debug!("No transition: sku={}", sku.as_str());
            }
        }

        Ok(outcome)
    }

    /// 后台扫描入口：跳过 ENDED，其余逐个推进。单个失败不拦住别的。
    pub async fn transition_all(&self) -> AppResult<()> {
        let skus = self.store.sale_skus().await?;
        for raw in skus {
            if let Err(err) = self.transition_if_open(&raw).await {
                log::error!("Error processing sale {raw}: {err}");
            }
        }
        Ok(())
    }

    async fn transition_if_open(&self, raw: &str) -> AppResult<()> {
        let sku = Sku::new(raw)?;
        let status = self.store.get_sale_status(&sku).await?;
        if status.state == SaleState::Ended {
            return Ok(());
        }
        self.transition_state(raw).await?;
        Ok(())
    }
}
