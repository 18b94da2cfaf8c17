use chrono::{DateTime, Utc};

use crate::domain::errors::DomainError;

/// 销售时间窗口 `[start, end)`，要求 end 严格晚于 start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, DomainError> {
        if end <= start {
            return Err(DomainError::InvalidTimeRange(
                "End time must be after start time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_before_start(&self, now: DateTime<Utc>) -> bool {
        now < self.start
    }

    /// 半开区间：start 时刻算在窗口内，end 时刻不算
    pub fn is_within_range(&self, now: DateTime<Utc>) -> bool {
        now >= self.start && now < self.end
    }

    pub fn is_past_end(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }
}
