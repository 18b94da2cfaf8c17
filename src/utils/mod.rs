pub mod circuit_breaker;
pub mod time;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use time::parse_flexible_timestamp;
