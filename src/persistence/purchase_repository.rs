use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DbErr, EntityTrait, QueryFilter, Set};

use crate::database::DbPool;
use crate::domain::{Purchase, PurchaseNumber, Sku, UserId};
use crate::entities::{product_entity, purchase_entity};
use crate::error::AppResult;
use crate::ports::PurchaseRepository;

/// 购买台账仓储。写入路径靠 (product_id, user_id) 唯一约束兜底，
/// 同一条作业重放多少次都只落一行。
#[derive(Clone)]
pub struct PgPurchaseRepository {
    pool: DbPool,
}

impl PgPurchaseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRepository for PgPurchaseRepository {
    async fn persist(&self, purchase: &Purchase) -> AppResult<()> {
        let product = product_entity::Entity::find()
            .filter(product_entity::Column::Sku.eq(purchase.sku().as_str()))
            .one(&self.pool)
            .await?;

        let Some(product) = product else {
            log::warn!(
                "Product not found for SKU: {}, skipping persist",
                purchase.sku().as_str()
            );
            return Ok(());
        };

        let model = purchase_entity::ActiveModel {
            product_id: Set(product.id),
            user_id: Set(purchase.user_id().as_str().to_string()),
            purchased_at: Set(purchase.purchased_at()),
            created_by: Set("system".to_string()),
            ..Default::default()
        };

        let inserted = purchase_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    purchase_entity::Column::ProductId,
                    purchase_entity::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(&self.pool)
            .await;

        match inserted {
            Ok(_) => {}
            // DO NOTHING 命中唯一约束时 sea-orm 报 RecordNotInserted，视为成功
            Err(DbErr::RecordNotInserted) => {}
            Err(err) => return Err(err.into()),
        }

        log::info!(
            "Purchase persist attempted (idempotent): user={}, sku={}",
            purchase.user_id().as_str(),
            purchase.sku().as_str()
        );
        Ok(())
    }

    async fn find_by_user(&self, sku: &Sku, user_id: &UserId) -> AppResult<Option<Purchase>> {
        let product = product_entity::Entity::find()
            .filter(product_entity::Column::Sku.eq(sku.as_str()))
            .one(&self.pool)
            .await?;

        let Some(product) = product else {
            return Ok(None);
        };

        let row = purchase_entity::Entity::find()
            .filter(purchase_entity::Column::ProductId.eq(product.id))
            .filter(purchase_entity::Column::UserId.eq(user_id.as_str()))
            .one(&self.pool)
            .await?;

        // 台账不存原始购买号，按行 ID 重建一个可展示的编号
        Ok(row.map(|row| {
            Purchase::reconstitute(
                PurchaseNumber::from_value(format!("PUR-{}", row.id)),
                sku.clone(),
                user_id.clone(),
                row.purchased_at,
            )
        }))
    }

    async fn list_user_ids(&self, product_id: i64) -> AppResult<Vec<String>> {
        let rows = purchase_entity::Entity::find()
            .filter(purchase_entity::Column::ProductId.eq(product_id))
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.user_id).collect())
    }
}
