pub mod config;
pub mod database;
pub mod domain;
pub mod entities;
pub mod error;
pub mod persistence;
pub mod ports;
pub mod publishers;
pub mod queue;
pub mod services;
pub mod store;
pub mod tasks;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult};
