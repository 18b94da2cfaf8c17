//! Lua procedures executed server-side in Redis. Redis runs scripts on a
//! single thread, so each script body is one atomic step: no app-level lock
//! can interleave between the checks and the writes.

/// 原子购买判定。KEYS: state, stock, buyers, config, end_reason；
/// ARGV: user_id, now (epoch 毫秒)。返回 JSON 字符串。
///
/// 步骤（顺序即规则）:
/// 1. ACTIVE 且已过 endTime -> 就地置 ENDED / TIME_EXPIRED（惰性过期）
/// 2. 非 ACTIVE -> SALE_NOT_ACTIVE（键不存在同样走这里）
/// 3. 已在买家集合 -> ALREADY_PURCHASED
/// 4. 库存 <= 0 -> SOLD_OUT
/// 5. DECR 库存并 SADD 买家
/// 6. 扣到 0 -> 置 ENDED / SOLD_OUT
pub const ATOMIC_PURCHASE: &str = r#"
local state = redis.call('GET', KEYS[1])

if state == 'ACTIVE' then
  local end_time = tonumber(redis.call('HGET', KEYS[4], 'endTime'))
  if end_time and tonumber(ARGV[2]) >= end_time then
    redis.call('SET', KEYS[1], 'ENDED')
    redis.call('SET', KEYS[5], 'TIME_EXPIRED')
    state = 'ENDED'
  end
end

if state ~= 'ACTIVE' then
  return cjson.encode({status='rejected', code='SALE_NOT_ACTIVE'})
end

if redis.call('SISMEMBER', KEYS[3], ARGV[1]) == 1 then
  return cjson.encode({status='rejected', code='ALREADY_PURCHASED'})
end

local stock = tonumber(redis.call('GET', KEYS[2]) or '0')
if stock <= 0 then
  return cjson.encode({status='rejected', code='SOLD_OUT'})
end

local remaining = redis.call('DECR', KEYS[2])
redis.call('SADD', KEYS[3], ARGV[1])

if remaining <= 0 then
  redis.call('SET', KEYS[1], 'ENDED')
  redis.call('SET', KEYS[5], 'SOLD_OUT')
end

return cjson.encode({status='success', remainingStock=remaining})
"#;

/// 时间驱动的状态转换。KEYS: state, config, end_reason；ARGV: now (epoch 毫秒)。
/// 返回 transitioned_to_active / transitioned_to_ended / no_transition。
///
/// 只看时间：库存扣到零的结束由购买脚本在同一原子步骤里完成，
/// 这里永远观察不到 stock=0 且 state=ACTIVE 的中间态。
pub const TRANSITION_STATE: &str = r#"
local state = redis.call('GET', KEYS[1])
local now = tonumber(ARGV[1])

if state == 'UPCOMING' then
  local start_time = tonumber(redis.call('HGET', KEYS[2], 'startTime'))
  if start_time and now >= start_time then
    redis.call('SET', KEYS[1], 'ACTIVE')
    return 'transitioned_to_active'
  end
  return 'no_transition'
end

if state == 'ACTIVE' then
  local end_time = tonumber(redis.call('HGET', KEYS[2], 'endTime'))
  if end_time and now >= end_time then
    redis.call('SET', KEYS[1], 'ENDED')
    redis.call('SET', KEYS[3], 'TIME_EXPIRED')
    return 'transitioned_to_ended'
  end
  return 'no_transition'
end

return 'no_transition'
"#;
