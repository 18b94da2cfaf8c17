use sea_orm_migration::prelude::*;

/// Products (秒杀商品/活动配置表)
#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Sku,
    ProductName,
    InitialStock,
    StartTime,
    EndTime,
    State,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
}

/// Purchases (持久化购买台账)
#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    ProductId,
    UserId,
    PurchasedAt,
    CreatedAt,
    CreatedBy,
    UpdatedAt,
    UpdatedBy,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 购买台账以 (product_id, user_id) 唯一约束保证幂等写入:
/// 重放与对账补写同一条购买记录时不会产生重复行。
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 商品配置表
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Sku).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Products::ProductName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Products::InitialStock).integer().not_null())
                    .col(
                        ColumnDef::new(Products::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::EndTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::State)
                            .string_len(20)
                            .not_null()
                            .default("UPCOMING"),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedBy)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Products::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Products::UpdatedBy).string_len(255).null())
                    .to_owned(),
            )
            .await?;

        // sku 唯一索引（一个 SKU 一条配置）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_products_sku_unique")
                    .table(Products::Table)
                    .col(Products::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 购买台账表
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Purchases::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Purchases::ProductId).big_integer().not_null())
                    .col(ColumnDef::new(Purchases::UserId).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Purchases::PurchasedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::cust("NOW()")),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreatedBy)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Purchases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Purchases::UpdatedBy).string_len(255).null())
                    .to_owned(),
            )
            .await?;

        // (product_id, user_id) 唯一索引（幂等写入的关键约束）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchases_product_user_unique")
                    .table(Purchases::Table)
                    .col(Purchases::ProductId)
                    .col(Purchases::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 用户查询索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchases_user")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .to_owned(),
            )
            .await?;

        // 外键不做级联删除：已有台账记录的商品行无法直接删除
        manager
            .alter_table(
                Table::alter()
                    .table(Purchases::Table)
                    .add_foreign_key(
                        TableForeignKey::new()
                            .name("fk_purchases_product")
                            .from_tbl(Purchases::Table)
                            .from_col(Purchases::ProductId)
                            .to_tbl(Products::Table)
                            .to_col(Products::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 删除顺序：台账 -> 商品
        manager
            .drop_table(Table::drop().if_exists().table(Purchases::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(Products::Table).to_owned())
            .await?;

        Ok(())
    }
}
