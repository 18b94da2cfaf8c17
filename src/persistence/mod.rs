pub mod product_repository;
pub mod purchase_repository;

pub use product_repository::PgProductRepository;
pub use purchase_repository::PgPurchaseRepository;
