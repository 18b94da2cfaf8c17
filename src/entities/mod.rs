pub mod products;
pub mod purchases;

pub use products as product_entity;
pub use purchases as purchase_entity;
