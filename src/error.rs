use thiserror::Error;

use crate::domain::DomainError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Circuit breaker is OPEN, call skipped")]
    CircuitOpen,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::RedisError(_) => "REDIS_ERROR",
            AppError::DomainError(_) => "DOMAIN_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::CircuitOpen => "CIRCUIT_OPEN",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::SerdeJsonError(_) => "SERDE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::CircuitOpen.error_code(), "CIRCUIT_OPEN");
        assert_eq!(
            AppError::ValidationError("x".into()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            AppError::CircuitOpen.to_string(),
            "Circuit breaker is OPEN, call skipped"
        );
    }

    #[test]
    fn test_domain_error_conversion() {
        let err: AppError = DomainError::SaleNotActive.into();
        assert_eq!(err.error_code(), "DOMAIN_ERROR");
    }
}
