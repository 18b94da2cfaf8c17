use crate::domain::errors::DomainError;

/// 剩余库存（非负整数，不可变值对象）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stock(u32);

impl Stock {
    pub fn new(quantity: i64) -> Result<Self, DomainError> {
        if quantity < 0 || quantity > u32::MAX as i64 {
            return Err(DomainError::InvalidStock(quantity));
        }
        Ok(Self(quantity as u32))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// 扣减一件，库存为零时返回 SoldOut
    pub fn decrement(&self) -> Result<Stock, DomainError> {
        if self.0 == 0 {
            return Err(DomainError::SoldOut);
        }
        Ok(Self(self.0 - 1))
    }
}
