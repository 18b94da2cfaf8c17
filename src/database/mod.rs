use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use redis::aio::ConnectionManager;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::{DatabaseConfig, RedisConfig};
use crate::error::AppResult;

pub type DbPool = DatabaseConnection;

pub async fn create_pool(config: &DatabaseConfig) -> AppResult<DbPool> {
    let mut opts = ConnectOptions::new(config.url.clone());
    opts.max_connections(config.max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let pool = Database::connect(opts).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> AppResult<()> {
    Migrator::up(pool, None).await?;
    Ok(())
}

pub fn create_redis_client(config: &RedisConfig) -> AppResult<redis::Client> {
    Ok(redis::Client::open(config.url.as_str())?)
}

/// 带自动重连的 Redis 连接。clone 共享同一条底层连接，
/// 所以阻塞命令（BRPOP）要用独立的 manager，不能走共享的这条。
pub async fn create_redis(client: &redis::Client) -> AppResult<ConnectionManager> {
    Ok(client.get_connection_manager().await?)
}
