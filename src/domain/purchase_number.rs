use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;

/// 进程内递增序号（按 10000 取模，4 位补零）。
/// 台账的唯一性由 (product_id, user_id) 约束保证，编号只用于展示与追踪。
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// 购买编号，格式 `PUR-YYYYMMDD-NNNN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseNumber(String);

impl PurchaseNumber {
    pub fn generate() -> Self {
        let seq = (COUNTER.fetch_add(1, Ordering::Relaxed).wrapping_add(1)) % 10_000;
        let date_part = Utc::now().format("%Y%m%d");
        Self(format!("PUR-{date_part}-{seq:04}"))
    }

    /// 还原已存在的编号（台账读出、对账补写），不做格式校验
    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurchaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
