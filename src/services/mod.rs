pub mod purchase_service;
pub mod reconciliation_service;
pub mod sale_service;

pub use purchase_service::*;
pub use reconciliation_service::*;
pub use sale_service::*;
