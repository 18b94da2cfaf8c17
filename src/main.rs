use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use chrono::Local; // timestamp in log lines
use std::sync::Arc;

use flashsale_backend::{
    config::Config,
    database::{create_pool, create_redis, create_redis_client, run_migrations},
    persistence::{PgProductRepository, PgPurchaseRepository},
    ports::{EventPublisher, ProductRepository, PurchaseQueue, PurchaseRepository, SaleStore},
    publishers::{CompositeEventPublisher, LoggingEventPublisher, RedisEventPublisher},
    queue::{PurchaseQueueWorker, RedisPurchaseQueue},
    services::{ReconciliationService, SaleService},
    store::RedisSaleStore,
    tasks,
    utils::CircuitBreaker,
};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // Redis：一条共享复用连接给引擎，队列消费者各拿独立连接
    let redis_client = create_redis_client(&config.redis).expect("Failed to create Redis client");
    let redis = create_redis(&redis_client)
        .await
        .expect("Failed to connect to Redis");

    // 适配器
    let store: Arc<dyn SaleStore> = Arc::new(RedisSaleStore::new(redis.clone()));
    let purchases: Arc<dyn PurchaseRepository> = Arc::new(PgPurchaseRepository::new(pool.clone()));
    let products: Arc<dyn ProductRepository> = Arc::new(PgProductRepository::new(pool.clone()));
    let queue: Arc<dyn PurchaseQueue> = Arc::new(RedisPurchaseQueue::new(
        redis.clone(),
        config.queue.dedup_ttl_secs,
    ));

    // 事件发布：日志 + sale:events 频道
    let events: Arc<dyn EventPublisher> = Arc::new(CompositeEventPublisher::new(vec![
        Arc::new(LoggingEventPublisher),
        Arc::new(RedisEventPublisher::new(redis.clone())),
    ]));

    // 用例服务
    let sale_service = SaleService::new(store.clone(), products.clone(), events.clone());
    let reconciliation_service = ReconciliationService::new(
        store.clone(),
        products.clone(),
        purchases.clone(),
        queue.clone(),
    );

    // 写后队列消费者：共用一个熔断器
    let breaker = Arc::new(CircuitBreaker::new(
        config.breaker.failure_threshold,
        config.breaker.recovery_time_ms,
    ));
    let mut workers = Vec::new();
    for _ in 0..config.queue.concurrency {
        let worker_redis = create_redis(&redis_client)
            .await
            .expect("Failed to connect queue worker to Redis");
        workers.push(PurchaseQueueWorker::new(
            worker_redis,
            purchases.clone(),
            breaker.clone(),
            config.queue.max_attempts,
            config.queue.backoff_base_ms,
        ));
    }
    let promoter_redis = create_redis(&redis_client)
        .await
        .expect("Failed to connect promoter to Redis");
    let promoter = PurchaseQueueWorker::new(
        promoter_redis,
        purchases.clone(),
        breaker.clone(),
        config.queue.max_attempts,
        config.queue.backoff_base_ms,
    );

    // 启动后台循环
    tasks::spawn_all(
        sale_service,
        reconciliation_service,
        workers,
        promoter,
        config.scheduler.clone(),
    );

    log::info!("Sale engine started");

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    Ok(())
}
