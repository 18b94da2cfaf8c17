//! Event publisher adapters. The default wiring fans every domain event
//! out to the application log and to the `sale:events` Redis channel that
//! downstream consumers (storefront gateways) subscribe to.

use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde_json::json;

use crate::domain::{DomainEvent, SaleEvent};
use crate::error::AppResult;
use crate::ports::EventPublisher;

pub const EVENTS_CHANNEL: &str = "sale:events";

/// 仅写日志的发布器
pub struct LoggingEventPublisher;

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        log::info!(
            "Domain event: {} at {}",
            event.payload.name(),
            event.occurred_at.to_rfc3339()
        );
        Ok(())
    }
}

/// 频道消息的两种形态：
/// 库存变化 `{"event":"stock-update","data":{"sku":...,"stock":n}}`，
/// 状态变化 `{"event":"state-change","data":{"sku":...,"state":...[,"reason":...]}}`。
/// 不往广播频道里放 userId。
fn channel_message(event: &SaleEvent) -> serde_json::Value {
    match event {
        SaleEvent::SaleStarted { sku } => json!({
            "event": "state-change",
            "data": { "sku": sku.as_str(), "state": "ACTIVE" },
        }),
        SaleEvent::SaleEnded { sku, reason } => json!({
            "event": "state-change",
            "data": { "sku": sku.as_str(), "state": "ENDED", "reason": reason.as_str() },
        }),
        SaleEvent::PurchaseConfirmed {
            sku,
            remaining_stock,
            ..
        } => json!({
            "event": "stock-update",
            "data": { "sku": sku.as_str(), "stock": remaining_stock },
        }),
        SaleEvent::StockDepleted { sku } => json!({
            "event": "stock-update",
            "data": { "sku": sku.as_str(), "stock": 0 },
        }),
    }
}

/// 往 `sale:events` 频道 PUBLISH 的发布器
pub struct RedisEventPublisher {
    redis: ConnectionManager,
}

impl RedisEventPublisher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        let message = serde_json::to_string(&channel_message(&event.payload))?;
        let mut conn = self.redis.clone();
        let _: () = conn.publish(EVENTS_CHANNEL, message).await?;
        Ok(())
    }
}

/// 按顺序广播到多个发布器
pub struct CompositeEventPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl CompositeEventPublisher {
    pub fn new(publishers: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { publishers }
    }
}

#[async_trait]
impl EventPublisher for CompositeEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        for publisher in &self.publishers {
            publisher.publish(event).await?;
        }
        Ok(())
    }
}
