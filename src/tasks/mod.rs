//! Background loops for the sale engine.
//!
//! This module centralizes the recurring jobs (state transition sweep,
//! ledger reconciliation sweep, queue workers and the delayed-job promoter).
//! Call `spawn_all` once during startup to launch them.

use std::time::Duration;

use crate::config::SchedulerConfig;
use crate::queue::PurchaseQueueWorker;
use crate::services::{ReconciliationService, SaleService};

/// Spawn all background loops.
///
/// Notes
/// - Every loop swallows and logs its own errors; one bad tick never
///   kills the loop.
/// - This function detaches tasks via `tokio::spawn`; it does not block.
pub fn spawn_all(
    sale_service: SaleService,
    reconciliation_service: ReconciliationService,
    workers: Vec<PurchaseQueueWorker>,
    promoter: PurchaseQueueWorker,
    scheduler: SchedulerConfig,
) {
    // 状态推进扫描：高频小间隔，让开始/结束贴着配置时刻发生
    {
        let svc = sale_service.clone();
        let interval_ms = scheduler.state_interval_ms;
        tokio::spawn(async move {
            log::info!("State transition sweep started (interval: {interval_ms}ms)");
            loop {
                if let Err(e) = svc.transition_all().await {
                    log::error!("State transition sweep failed: {e:?}");
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
        });
    }

    // 对账扫描：低频，修补台账里缺的购买行
    {
        let svc = reconciliation_service.clone();
        let interval_secs = scheduler.reconciliation_interval_secs;
        tokio::spawn(async move {
            log::info!("Reconciliation sweep started (interval: {interval_secs}s)");
            loop {
                tokio::time::sleep(Duration::from_secs(interval_secs)).await;
                if let Err(e) = svc.reconcile_all().await {
                    log::error!("Reconciliation sweep failed: {e:?}");
                }
            }
        });
    }

    // 队列消费者：process_next 在空队列上最多阻塞一秒，无须额外休眠
    for (index, worker) in workers.into_iter().enumerate() {
        tokio::spawn(async move {
            log::info!("Purchase queue worker {index} started");
            loop {
                if let Err(e) = worker.process_next().await {
                    log::error!("Queue worker {index} error: {e:?}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
    }

    // 延迟作业提升：到期的重试作业搬回待处理队列
    {
        tokio::spawn(async move {
            loop {
                if let Err(e) = promoter.promote_due().await {
                    log::error!("Delayed job promotion failed: {e:?}");
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        });
    }
}
