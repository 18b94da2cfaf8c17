use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::sku::Sku;
use crate::domain::user_id::UserId;

/// 销售结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    SoldOut,
    TimeExpired,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::SoldOut => "SOLD_OUT",
            EndReason::TimeExpired => "TIME_EXPIRED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SOLD_OUT" => Some(EndReason::SoldOut),
            "TIME_EXPIRED" => Some(EndReason::TimeExpired),
            _ => None,
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 领域事件负载
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleEvent {
    SaleStarted {
        sku: Sku,
    },
    SaleEnded {
        sku: Sku,
        reason: EndReason,
    },
    PurchaseConfirmed {
        sku: Sku,
        user_id: UserId,
        remaining_stock: u32,
    },
    StockDepleted {
        sku: Sku,
    },
}

impl SaleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SaleEvent::SaleStarted { .. } => "SaleStarted",
            SaleEvent::SaleEnded { .. } => "SaleEnded",
            SaleEvent::PurchaseConfirmed { .. } => "PurchaseConfirmed",
            SaleEvent::StockDepleted { .. } => "StockDepleted",
        }
    }

    pub fn sku(&self) -> &Sku {
        match self {
            SaleEvent::SaleStarted { sku }
            | SaleEvent::SaleEnded { sku, .. }
            | SaleEvent::PurchaseConfirmed { sku, .. }
            | SaleEvent::StockDepleted { sku } => sku,
        }
    }
}

/// 发布信封：事件标识 + 发生时间 + 负载
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: SaleEvent,
}

impl DomainEvent {
    pub fn new(payload: SaleEvent) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}
