use thiserror::Error;

use crate::domain::sale::SaleState;

/// 领域校验/规则错误。购买被拒绝（SALE_NOT_ACTIVE 等）不属于错误，
/// 由 `PurchaseAttempt::Rejected` 作为数据返回。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid SKU: \"{0}\". Must be 1-64 alphanumeric characters or hyphens.")]
    InvalidSku(String),

    #[error("Invalid stock quantity: {0}. Must be a non-negative integer.")]
    InvalidStock(i64),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    #[error("Cannot transition from {from} to {to}.")]
    InvalidStateTransition { from: SaleState, to: SaleState },

    #[error("The sale is not currently active.")]
    SaleNotActive,

    #[error("Sorry, all items have been sold.")]
    SoldOut,
}
