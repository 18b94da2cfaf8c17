pub mod errors;
pub mod events;
pub mod purchase;
pub mod purchase_number;
pub mod sale;
pub mod sku;
pub mod state_machine;
pub mod stock;
pub mod time_range;
pub mod user_id;

pub use errors::DomainError;
pub use events::{DomainEvent, EndReason, SaleEvent};
pub use purchase::Purchase;
pub use purchase_number::PurchaseNumber;
pub use sale::{Sale, SaleState};
pub use sku::Sku;
pub use state_machine::TransitionContext;
pub use stock::Stock;
pub use time_range::TimeRange;
pub use user_id::UserId;
