use chrono::{DateTime, Utc};

/// 解析 Redis 配置里的时间字段。历史数据存在两种格式：
/// 毫秒时间戳字符串（如 "1750057200000"）或 ISO 8601 字符串。
pub fn parse_flexible_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(ms) = trimmed.parse::<i64>()
        && ms > 0
    {
        return DateTime::from_timestamp_millis(ms);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
