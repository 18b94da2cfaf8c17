use chrono::{DateTime, Utc};

use crate::domain::purchase_number::PurchaseNumber;
use crate::domain::sku::Sku;
use crate::domain::user_id::UserId;

/// 一条确认的购买记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Purchase {
    purchase_no: PurchaseNumber,
    sku: Sku,
    user_id: UserId,
    purchased_at: DateTime<Utc>,
}

impl Purchase {
    pub fn create(sku: Sku, user_id: UserId) -> Self {
        Self {
            purchase_no: PurchaseNumber::generate(),
            sku,
            user_id,
            purchased_at: Utc::now(),
        }
    }

    pub fn reconstitute(
        purchase_no: PurchaseNumber,
        sku: Sku,
        user_id: UserId,
        purchased_at: DateTime<Utc>,
    ) -> Self {
        Self {
            purchase_no,
            sku,
            user_id,
            purchased_at,
        }
    }

    pub fn purchase_no(&self) -> &PurchaseNumber {
        &self.purchase_no
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn purchased_at(&self) -> DateTime<Utc> {
        self.purchased_at
    }
}
