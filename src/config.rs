use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub breaker: BreakerConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// 同时消费队列的 worker 数
    pub concurrency: usize,
    /// 每个任务的最大尝试次数（含首次）
    pub max_attempts: u32,
    /// 指数退避基数（毫秒）：base * 2^(attempt-1)
    pub backoff_base_ms: u64,
    /// 任务去重键的保留时长（秒）
    pub dedup_ttl_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_attempts: 3,
            backoff_base_ms: 1000,
            dedup_ttl_secs: 86_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerConfig {
    pub failure_threshold: u32,
    pub recovery_time_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_time_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 状态转换扫描间隔（毫秒）
    pub state_interval_ms: u64,
    /// 对账扫描间隔（秒）
    pub reconciliation_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            state_interval_ms: 100,
            reconciliation_interval_secs: 300,
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    redis: RedisConfig {
                        url: get_env("REDIS_URL")
                            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
                    },
                    queue: QueueConfig {
                        concurrency: get_env_parse("QUEUE_CONCURRENCY", 4usize),
                        max_attempts: get_env_parse("QUEUE_MAX_ATTEMPTS", 3u32),
                        backoff_base_ms: get_env_parse("QUEUE_BACKOFF_BASE_MS", 1000u64),
                        dedup_ttl_secs: get_env_parse("QUEUE_DEDUP_TTL_SECS", 86_400u64),
                    },
                    breaker: BreakerConfig {
                        failure_threshold: get_env_parse("BREAKER_FAILURE_THRESHOLD", 5u32),
                        recovery_time_ms: get_env_parse("BREAKER_RECOVERY_TIME_MS", 30_000u64),
                    },
                    scheduler: SchedulerConfig {
                        state_interval_ms: get_env_parse("CRON_STATE_INTERVAL_MS", 100u64),
                        reconciliation_interval_secs: get_env_parse(
                            "CRON_RECONCILIATION_INTERVAL_SECS",
                            300u64,
                        ),
                    },
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("REDIS_URL") {
            config.redis.url = v;
        }
        if let Ok(v) = env::var("QUEUE_CONCURRENCY")
            && let Ok(n) = v.parse()
        {
            config.queue.concurrency = n;
        }
        if let Ok(v) = env::var("QUEUE_MAX_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            config.queue.max_attempts = n;
        }
        if let Ok(v) = env::var("QUEUE_BACKOFF_BASE_MS")
            && let Ok(n) = v.parse()
        {
            config.queue.backoff_base_ms = n;
        }
        if let Ok(v) = env::var("QUEUE_DEDUP_TTL_SECS")
            && let Ok(n) = v.parse()
        {
            config.queue.dedup_ttl_secs = n;
        }
        if let Ok(v) = env::var("BREAKER_FAILURE_THRESHOLD")
            && let Ok(n) = v.parse()
        {
            config.breaker.failure_threshold = n;
        }
        if let Ok(v) = env::var("BREAKER_RECOVERY_TIME_MS")
            && let Ok(n) = v.parse()
        {
            config.breaker.recovery_time_ms = n;
        }
        if let Ok(v) = env::var("CRON_STATE_INTERVAL_MS")
            && let Ok(n) = v.parse()
        {
            config.scheduler.state_interval_ms = n;
        }
        if let Ok(v) = env::var("CRON_RECONCILIATION_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.scheduler.reconciliation_interval_secs = n;
        }

        Ok(config)
    }
}
