use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::events::{DomainEvent, EndReason, SaleEvent};
use crate::domain::purchase::Purchase;
use crate::domain::sku::Sku;
use crate::domain::state_machine::{self, TransitionContext};
use crate::domain::stock::Stock;
use crate::domain::time_range::TimeRange;
use crate::domain::user_id::UserId;

/// 销售生命周期状态（单向：UPCOMING -> ACTIVE -> ENDED）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleState {
    Upcoming,
    Active,
    Ended,
}

impl SaleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleState::Upcoming => "UPCOMING",
            SaleState::Active => "ACTIVE",
            SaleState::Ended => "ENDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UPCOMING" => Some(SaleState::Upcoming),
            "ACTIVE" => Some(SaleState::Active),
            "ENDED" => Some(SaleState::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for SaleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 秒杀活动聚合根。
///
/// 注意：高并发下的权威库存/买家状态在 Redis 脚本里，这个聚合只承载
/// 配置校验、状态机规则与领域事件的记录，供用例层与测试使用。
pub struct Sale {
    sku: Sku,
    product_name: String,
    state: SaleState,
    stock: Stock,
    time_range: TimeRange,
    events: Vec<DomainEvent>,
}

impl Sale {
    pub fn create(
        sku: &str,
        product_name: &str,
        initial_stock: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            sku: Sku::new(sku)?,
            product_name: product_name.to_string(),
            state: SaleState::Upcoming,
            stock: Stock::new(initial_stock)?,
            time_range: TimeRange::new(start_time, end_time)?,
            events: Vec::new(),
        })
    }

    pub fn reconstitute(
        sku: &str,
        product_name: &str,
        state: SaleState,
        current_stock: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            sku: Sku::new(sku)?,
            product_name: product_name.to_string(),
            state,
            stock: Stock::new(current_stock)?,
            time_range: TimeRange::new(start_time, end_time)?,
            events: Vec::new(),
        })
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn state(&self) -> SaleState {
        self.state
    }

    pub fn stock(&self) -> Stock {
        self.stock
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    pub fn can_transition_to(&self, target: SaleState, now: DateTime<Utc>) -> bool {
        state_machine::can_transition(
            self.state,
            target,
            &TransitionContext {
                now,
                time_range: self.time_range,
                stock: self.stock,
            },
        )
    }

    pub fn transition_to(&mut self, target: SaleState, now: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.can_transition_to(target, now) {
            return Err(DomainError::InvalidStateTransition {
                from: self.state,
                to: target,
            });
        }
        self.state = target;

        match target {
            SaleState::Active => self.record(SaleEvent::SaleStarted {
                sku: self.sku.clone(),
            }),
            SaleState::Ended => {
                let reason = if self.stock.is_zero() {
                    EndReason::SoldOut
                } else {
                    EndReason::TimeExpired
                };
                self.record(SaleEvent::SaleEnded {
                    sku: self.sku.clone(),
                    reason,
                });
            }
            SaleState::Upcoming => {}
        }
        Ok(())
    }

    /// 内存版购买流程（与 Redis 脚本同一套规则）:
    /// 1. 非 ACTIVE 拒绝
    /// 2. 无库存拒绝
    /// 3. 扣减并生成购买记录
    /// 4. 扣到零则结束销售（SOLD_OUT）并记录 StockDepleted
    pub fn attempt_purchase(&mut self, user_id: &UserId) -> Result<Purchase, DomainError> {
        if self.state != SaleState::Active {
            return Err(DomainError::SaleNotActive);
        }
        if self.stock.is_zero() {
            return Err(DomainError::SoldOut);
        }
        self.stock = self.stock.decrement()?;
        let purchase = Purchase::create(self.sku.clone(), user_id.clone());
        self.record(SaleEvent::PurchaseConfirmed {
            sku: self.sku.clone(),
            user_id: user_id.clone(),
            remaining_stock: self.stock.value(),
        });

        if self.stock.is_zero() {
            self.state = SaleState::Ended;
            self.record(SaleEvent::SaleEnded {
                sku: self.sku.clone(),
                reason: EndReason::SoldOut,
            });
            self.record(SaleEvent::StockDepleted {
                sku: self.sku.clone(),
            });
        }

        Ok(purchase)
    }

    /// 取走已记录的领域事件（取走即清空）
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }

    fn record(&mut self, payload: SaleEvent) {
        self.events.push(DomainEvent::new(payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sale(stock: i64) -> Sale {
        Sale::create("FLASH-1", "Flash Widget", stock, ts(100), ts(200)).unwrap()
    }

    #[test]
    fn test_create_starts_upcoming() {
        let sale = sale(10);
        assert_eq!(sale.state(), SaleState::Upcoming);
        assert!(sale.pending_events().is_empty());
    }

    #[test]
    fn test_transition_to_active_records_event() {
        let mut sale = sale(10);
        sale.transition_to(SaleState::Active, ts(100)).unwrap();
        assert_eq!(sale.state(), SaleState::Active);
        let events = sale.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload.name(), "SaleStarted");
        assert!(sale.pending_events().is_empty());
    }

    #[test]
    fn test_transition_before_start_rejected() {
        let mut sale = sale(10);
        let err = sale.transition_to(SaleState::Active, ts(99)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_time_expired_end_reason() {
        let mut sale = sale(10);
        sale.transition_to(SaleState::Active, ts(100)).unwrap();
        sale.transition_to(SaleState::Ended, ts(200)).unwrap();
        let events = sale.take_events();
        assert!(matches!(
            events[1].payload,
            SaleEvent::SaleEnded {
                reason: EndReason::TimeExpired,
                ..
            }
        ));
    }

    #[test]
    fn test_purchase_decrements_and_confirms() {
        let mut sale = sale(10);
        sale.transition_to(SaleState::Active, ts(100)).unwrap();
        sale.take_events();

        let user = UserId::new("user-1").unwrap();
        let purchase = sale.attempt_purchase(&user).unwrap();
        assert_eq!(purchase.sku().as_str(), "FLASH-1");
        assert_eq!(sale.stock().value(), 9);

        let events = sale.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].payload,
            SaleEvent::PurchaseConfirmed {
                remaining_stock: 9,
                ..
            }
        ));
    }

    #[test]
    fn test_last_unit_ends_sale_sold_out() {
        let mut sale = sale(1);
        sale.transition_to(SaleState::Active, ts(100)).unwrap();
        sale.take_events();

        let user = UserId::new("user-1").unwrap();
        sale.attempt_purchase(&user).unwrap();
        assert_eq!(sale.state(), SaleState::Ended);

        let names: Vec<&str> = sale
            .take_events()
            .iter()
            .map(|e| e.payload.name())
            .collect();
        assert_eq!(names, vec!["PurchaseConfirmed", "SaleEnded", "StockDepleted"]);
    }

    #[test]
    fn test_purchase_rejected_when_not_active() {
        let mut sale = sale(10);
        let user = UserId::new("user-1").unwrap();
        assert_eq!(
            sale.attempt_purchase(&user).unwrap_err(),
            DomainError::SaleNotActive
        );
    }

    #[test]
    fn test_purchase_rejected_when_ended() {
        let mut sale = sale(10);
        sale.transition_to(SaleState::Active, ts(100)).unwrap();
        sale.transition_to(SaleState::Ended, ts(200)).unwrap();
        let user = UserId::new("user-1").unwrap();
        assert_eq!(
            sale.attempt_purchase(&user).unwrap_err(),
            DomainError::SaleNotActive
        );
    }
}
