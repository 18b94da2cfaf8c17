use std::fmt;

use crate::domain::errors::DomainError;

/// 购买用户标识（去除首尾空白，非空，最长 255 字符）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let trimmed = value.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidUserId(
                "User ID must be a non-empty string".to_string(),
            ));
        }
        if trimmed.len() > 255 {
            return Err(DomainError::InvalidUserId(
                "User ID must not exceed 255 characters".to_string(),
            ));
        }
        Ok(Self(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
