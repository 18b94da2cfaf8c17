use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use serde::Deserialize;

use crate::domain::{PurchaseNumber, Sale, SaleState, Sku, UserId};
use crate::error::{AppError, AppResult};
use crate::ports::{PurchaseAttempt, RejectionCode, SaleStatus, SaleStore, TransitionOutcome};
use crate::store::{extract_sku_from_key, sale_key, scripts};

/// 脚本返回的 JSON 信封
#[derive(Debug, Deserialize)]
struct PurchaseScriptReply {
    status: String,
    #[serde(rename = "remainingStock")]
    remaining_stock: Option<i64>,
    code: Option<String>,
}

/// Redis 准入引擎。所有会改写库存/买家/状态的路径都走 Lua 脚本，
/// 进程内不做任何加锁。
pub struct RedisSaleStore {
    redis: ConnectionManager,
    purchase_script: Script,
    transition_script: Script,
}

impl RedisSaleStore {
    pub fn new(redis: ConnectionManager) -> Self {
        let purchase_script = Script::new(scripts::ATOMIC_PURCHASE);
        let transition_script = Script::new(scripts::TRANSITION_STATE);
        log::debug!(
            "Sale scripts prepared: purchase={}, transition={}",
            purchase_script.get_hash(),
            transition_script.get_hash()
        );
        Self {
            redis,
            purchase_script,
            transition_script,
        }
    }
}

#[async_trait]
impl SaleStore for RedisSaleStore {
    async fn attempt_purchase(&self, sku: &Sku, user_id: &UserId) -> AppResult<PurchaseAttempt> {
        let id = sku.as_str();
        let mut conn = self.redis.clone();

        let raw: String = self
            .purchase_script
            .key(sale_key(id, "state"))
            .key(sale_key(id, "stock"))
            .key(sale_key(id, "buyers"))
            .key(sale_key(id, "config"))
            .key(sale_key(id, "end_reason"))
            .arg(user_id.as_str())
            .arg(Utc::now().timestamp_millis())
            .invoke_async(&mut conn)
            .await?;

        let reply: PurchaseScriptReply = serde_json::from_str(&raw)?;

        if reply.status == "success" {
            return Ok(PurchaseAttempt::Success {
                purchase_no: PurchaseNumber::generate(),
                remaining_stock: reply.remaining_stock.unwrap_or(0).max(0) as u32,
                purchased_at: Utc::now(),
            });
        }

        let code = reply.code.unwrap_or_default();
        let code = RejectionCode::parse(&code)
            .ok_or_else(|| AppError::InternalError(format!("Unexpected rejection code: {code}")))?;
        Ok(PurchaseAttempt::Rejected { code })
    }

    async fn get_sale_status(&self, sku: &Sku) -> AppResult<SaleStatus> {
        let id = sku.as_str();
        let mut conn = self.redis.clone();

        let state: Option<String> = conn.get(sale_key(id, "state")).await?;
        let stock: Option<String> = conn.get(sale_key(id, "stock")).await?;
        let config: HashMap<String, String> = conn.hgetall(sale_key(id, "config")).await?;

        // 不存在的销售按原始默认值返回：UPCOMING / 0 / 空配置
        Ok(SaleStatus {
            sku: id.to_string(),
            state: state
                .as_deref()
                .and_then(SaleState::parse)
                .unwrap_or(SaleState::Upcoming),
            stock: stock.as_deref().unwrap_or("0").parse().unwrap_or(0),
            initial_stock: config
                .get("initialStock")
                .map(|v| v.parse().unwrap_or(0))
                .unwrap_or(0),
            product_name: config.get("productName").cloned().unwrap_or_default(),
            start_time: config.get("startTime").cloned().unwrap_or_default(),
            end_time: config.get("endTime").cloned().unwrap_or_default(),
        })
    }

    async fn initialize_sale(&self, sale: &Sale) -> AppResult<()> {
        let id = sale.sku().as_str();
        let mut conn = self.redis.clone();

        let initial_stock = sale.stock().value().to_string();
        let start_ms = sale.time_range().start().timestamp_millis().to_string();
        let end_ms = sale.time_range().end().timestamp_millis().to_string();

        // 一个 pipeline 写齐五个键，重复初始化会重置一切派生状态
        let mut pipe = redis::pipe();
        pipe.set(sale_key(id, "state"), sale.state().as_str())
            .ignore()
            .set(sale_key(id, "stock"), sale.stock().value())
            .ignore()
            .del(sale_key(id, "buyers"))
            .ignore()
            .del(sale_key(id, "end_reason"))
            .ignore()
            .hset_multiple(
                sale_key(id, "config"),
                &[
                    ("sku", id),
                    ("productName", sale.product_name()),
                    ("initialStock", initial_stock.as_str()),
                    ("startTime", start_ms.as_str()),
                    ("endTime", end_ms.as_str()),
                ],
            )
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        log::info!("Sale initialized: sku={}, stock={}", id, sale.stock().value());
        Ok(())
    }

    async fn transition_state(
        &self,
        sku: &Sku,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let id = sku.as_str();
        let mut conn = self.redis.clone();

        let token: String = self
            .transition_script
            .key(sale_key(id, "state"))
            .key(sale_key(id, "config"))
            .key(sale_key(id, "end_reason"))
            .arg(now.timestamp_millis())
            .invoke_async(&mut conn)
            .await?;

        TransitionOutcome::parse(&token)
            .ok_or_else(|| AppError::InternalError(format!("Unexpected transition token: {token}")))
    }

    async fn delete_sale(&self, sku: &Sku) -> AppResult<()> {
        let id = sku.as_str();
        let mut conn = self.redis.clone();

        let keys = [
            sale_key(id, "state"),
            sale_key(id, "stock"),
            sale_key(id, "buyers"),
            sale_key(id, "config"),
            sale_key(id, "end_reason"),
        ];
        let _: () = conn.del(&keys).await?;

        log::info!("Sale deleted: sku={id}");
        Ok(())
    }

    async fn buyers(&self, sku: &Sku) -> AppResult<Vec<String>> {
        let mut conn = self.redis.clone();
        let members: Vec<String> = conn.smembers(sale_key(sku.as_str(), "buyers")).await?;
        Ok(members)
    }

    async fn sale_skus(&self) -> AppResult<Vec<String>> {
        let mut conn = self.redis.clone();

        // SCAN 而不是 KEYS，避免在大键空间上阻塞 Redis
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter: redis::AsyncIter<'_, String> =
                conn.scan_match("sale:*:state").await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        Ok(keys
            .iter()
            .filter_map(|k| extract_sku_from_key(k))
            .map(|s| s.to_string())
            .collect())
    }
}
