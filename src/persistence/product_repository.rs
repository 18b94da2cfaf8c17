use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};

use crate::database::DbPool;
use crate::domain::Sku;
use crate::entities::product_entity;
use crate::error::AppResult;
use crate::ports::{ProductDraft, ProductRecord, ProductRepository};

/// 商品配置仓储，按 sku 幂等写入
#[derive(Clone)]
pub struct PgProductRepository {
    pool: DbPool,
}

impl PgProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_record(model: product_entity::Model) -> ProductRecord {
    ProductRecord {
        id: model.id,
        sku: model.sku,
        product_name: model.product_name,
        initial_stock: model.initial_stock,
        start_time: model.start_time,
        end_time: model.end_time,
        state: model.state,
        created_at: model.created_at,
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn find_by_sku(&self, sku: &Sku) -> AppResult<Option<ProductRecord>> {
        let model = product_entity::Entity::find()
            .filter(product_entity::Column::Sku.eq(sku.as_str()))
            .one(&self.pool)
            .await?;
        Ok(model.map(to_record))
    }

    async fn upsert_by_sku(&self, draft: &ProductDraft) -> AppResult<()> {
        let mut model = product_entity::ActiveModel {
            sku: Set(draft.sku.clone()),
            product_name: Set(draft.product_name.clone()),
            initial_stock: Set(draft.initial_stock),
            start_time: Set(draft.start_time),
            end_time: Set(draft.end_time),
            state: Set(draft.state.as_str().to_string()),
            created_by: Set(draft.created_by.clone()),
            ..Default::default()
        };

        let mut conflict = OnConflict::column(product_entity::Column::Sku);
        conflict.update_columns([
            product_entity::Column::ProductName,
            product_entity::Column::InitialStock,
            product_entity::Column::StartTime,
            product_entity::Column::EndTime,
            product_entity::Column::State,
        ]);
        // 只有更新路径才动审计列，创建路径保持 created_by 不被覆盖
        if let Some(updated_by) = &draft.updated_by {
            model.updated_by = Set(Some(updated_by.clone()));
            model.updated_at = Set(Some(Utc::now()));
            conflict.update_columns([
                product_entity::Column::UpdatedBy,
                product_entity::Column::UpdatedAt,
            ]);
        }

        product_entity::Entity::insert(model)
            .on_conflict(conflict)
            .exec(&self.pool)
            .await?;

        log::info!("Product upserted: sku={}", draft.sku);
        Ok(())
    }

    async fn delete_by_sku(&self, sku: &Sku) -> AppResult<()> {
        product_entity::Entity::delete_many()
            .filter(product_entity::Column::Sku.eq(sku.as_str()))
            .exec(&self.pool)
            .await?;
        log::info!("Product deleted: sku={}", sku.as_str());
        Ok(())
    }
}
