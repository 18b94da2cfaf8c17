pub mod redis_store;
pub mod scripts;

pub use redis_store::RedisSaleStore;

/// 每个 SKU 的五个键：state / stock / buyers / config / end_reason
pub fn sale_key(sku: &str, suffix: &str) -> String {
    format!("sale:{sku}:{suffix}")
}

/// 从 `sale:<sku>:state` 键名中取出 SKU
pub fn extract_sku_from_key(key: &str) -> Option<&str> {
    let sku = key.strip_prefix("sale:")?.strip_suffix(":state")?;
    if sku.is_empty() { None } else { Some(sku) }
}
