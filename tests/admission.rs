//! Admission properties under concurrency: stock never oversells, one
//! user gets at most one unit per sale, and the state machine only moves
//! forward. The in-memory store replays the fast-store script semantics.

mod support;

use std::sync::Arc;

use chrono::{Duration, Utc};

use flashsale_backend::domain::{Sale, SaleState, Sku};
use flashsale_backend::error::AppError;
use flashsale_backend::ports::{PurchaseAttempt, RejectionCode, SaleStore, TransitionOutcome};
use flashsale_backend::services::{
    CreateSaleCommand, PurchaseService, SaleService, UpdateSaleCommand,
};
use support::{CountingPublisher, MemoryLedger, MemoryProducts, MemoryQueue, MemorySaleStore};

async fn seed_sale(store: &MemorySaleStore, sku: &str, stock: i64, start_min: i64, end_min: i64) {
    let sale = Sale::create(
        sku,
        "Test Widget",
        stock,
        Utc::now() + Duration::minutes(start_min),
        Utc::now() + Duration::minutes(end_min),
    )
    .unwrap();
    store.initialize_sale(&sale).await.unwrap();
}

fn services(
    store: &Arc<MemorySaleStore>,
    ledger: &Arc<MemoryLedger>,
    queue: &Arc<MemoryQueue>,
    events: &Arc<CountingPublisher>,
) -> PurchaseService {
    PurchaseService::new(
        store.clone(),
        ledger.clone(),
        queue.clone(),
        events.clone(),
    )
}

#[tokio::test]
async fn test_concurrent_purchases_never_oversell() {
    let store = Arc::new(MemorySaleStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let queue = Arc::new(MemoryQueue::new());
    let events = Arc::new(CountingPublisher::new());
    seed_sale(&store, "FLASH-100", 10, -5, 5).await;
    store.force_state("FLASH-100", SaleState::Active);

    let service = services(&store, &ledger, &queue, &events);

    let mut handles = Vec::new();
    for i in 0..100 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .attempt_purchase("FLASH-100", &format!("user-{i}"))
                .await
                .unwrap()
        }));
    }

    let mut successes = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            PurchaseAttempt::Success { .. } => successes += 1,
            PurchaseAttempt::Rejected { code } => {
                // depletion flips the state, so late arrivals may see either code
                assert!(matches!(
                    code,
                    RejectionCode::SoldOut | RejectionCode::SaleNotActive
                ));
                rejected += 1;
            }
        }
    }
    assert_eq!(successes, 10);
    assert_eq!(rejected, 90);

    let sku = Sku::new("FLASH-100").unwrap();
    let status = store.get_sale_status(&sku).await.unwrap();
    assert_eq!(status.stock, 0);
    assert_eq!(status.state, SaleState::Ended);
    assert_eq!(store.buyers(&sku).await.unwrap().len(), 10);
    assert_eq!(queue.jobs().len(), 10);
    let confirmed = events
        .names()
        .iter()
        .filter(|name| name.as_str() == "PurchaseConfirmed")
        .count();
    assert_eq!(confirmed, 10);
}

#[tokio::test]
async fn test_same_user_admitted_once() {
    let store = Arc::new(MemorySaleStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let queue = Arc::new(MemoryQueue::new());
    let events = Arc::new(CountingPublisher::new());
    seed_sale(&store, "FLASH-DUP", 100, -5, 5).await;
    store.force_state("FLASH-DUP", SaleState::Active);

    let service = services(&store, &ledger, &queue, &events);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.attempt_purchase("FLASH-DUP", "dup-user").await.unwrap()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            PurchaseAttempt::Success { .. } => successes += 1,
            PurchaseAttempt::Rejected { code } => {
                assert_eq!(code, RejectionCode::AlreadyPurchased);
            }
        }
    }
    assert_eq!(successes, 1);

    let sku = Sku::new("FLASH-DUP").unwrap();
    let status = store.get_sale_status(&sku).await.unwrap();
    assert_eq!(status.stock, 99);
    assert_eq!(queue.jobs().len(), 1);
}

#[tokio::test]
async fn test_purchase_rejected_while_upcoming() {
    let store = Arc::new(MemorySaleStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let queue = Arc::new(MemoryQueue::new());
    let events = Arc::new(CountingPublisher::new());
    seed_sale(&store, "FLASH-SOON", 10, 5, 10).await;

    let service = services(&store, &ledger, &queue, &events);
    let result = service.attempt_purchase("FLASH-SOON", "early-bird").await.unwrap();

    assert_eq!(
        result,
        PurchaseAttempt::Rejected {
            code: RejectionCode::SaleNotActive
        }
    );
    let sku = Sku::new("FLASH-SOON").unwrap();
    assert!(store.buyers(&sku).await.unwrap().is_empty());
    assert!(queue.jobs().is_empty());
}

#[tokio::test]
async fn test_unknown_sale_rejected() {
    let store = Arc::new(MemorySaleStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let queue = Arc::new(MemoryQueue::new());
    let events = Arc::new(CountingPublisher::new());

    let service = services(&store, &ledger, &queue, &events);
    let result = service.attempt_purchase("NO-SUCH-SALE", "user-1").await.unwrap();

    assert_eq!(
        result,
        PurchaseAttempt::Rejected {
            code: RejectionCode::SaleNotActive
        }
    );
}

#[tokio::test]
async fn test_expired_sale_ends_lazily_on_purchase() {
    let store = Arc::new(MemorySaleStore::new());
    let ledger = Arc::new(MemoryLedger::new());
    let queue = Arc::new(MemoryQueue::new());
    let events = Arc::new(CountingPublisher::new());
    // window already past, but the sweep has not caught up yet
    seed_sale(&store, "FLASH-LATE", 10, -10, -5).await;
    store.force_state("FLASH-LATE", SaleState::Active);

    let service = services(&store, &ledger, &queue, &events);
    let result = service.attempt_purchase("FLASH-LATE", "too-late").await.unwrap();

    assert_eq!(
        result,
        PurchaseAttempt::Rejected {
            code: RejectionCode::SaleNotActive
        }
    );
    let sku = Sku::new("FLASH-LATE").unwrap();
    let status = store.get_sale_status(&sku).await.unwrap();
    assert_eq!(status.state, SaleState::Ended);
    assert_eq!(status.stock, 10);
}

#[tokio::test]
async fn test_transition_sweep_drives_lifecycle() {
    let store = Arc::new(MemorySaleStore::new());
    let products = Arc::new(MemoryProducts::new());
    let events = Arc::new(CountingPublisher::new());
    let sales = SaleService::new(store.clone(), products.clone(), events.clone());

    // whole window in the past: two sweeps walk it through both edges
    sales
        .create_sale(CreateSaleCommand {
            sku: "FLASH-LIFE".to_string(),
            product_name: "Lifecycle Widget".to_string(),
            initial_stock: 5,
            start_time: Utc::now() - Duration::hours(1),
            end_time: Utc::now() - Duration::minutes(30),
        })
        .await
        .unwrap();

    let sku = Sku::new("FLASH-LIFE").unwrap();
    assert_eq!(
        store.get_sale_status(&sku).await.unwrap().state,
        SaleState::Upcoming
    );

    sales.transition_all().await.unwrap();
    assert_eq!(
        store.get_sale_status(&sku).await.unwrap().state,
        SaleState::Active
    );

    sales.transition_all().await.unwrap();
    assert_eq!(
        store.get_sale_status(&sku).await.unwrap().state,
        SaleState::Ended
    );

    // ENDED is terminal, further sweeps publish nothing
    sales.transition_all().await.unwrap();
    assert_eq!(events.names(), vec!["SaleStarted", "SaleEnded"]);
}

#[tokio::test]
async fn test_transition_waits_for_start_time() {
    let store = Arc::new(MemorySaleStore::new());
    let products = Arc::new(MemoryProducts::new());
    let events = Arc::new(CountingPublisher::new());
    let sales = SaleService::new(store.clone(), products.clone(), events.clone());

    sales
        .create_sale(CreateSaleCommand {
            sku: "FLASH-WAIT".to_string(),
            product_name: "Patience Widget".to_string(),
            initial_stock: 5,
            start_time: Utc::now() + Duration::hours(1),
            end_time: Utc::now() + Duration::hours(2),
        })
        .await
        .unwrap();

    let sku = Sku::new("FLASH-WAIT").unwrap();
    let outcome = store.transition_state(&sku, Utc::now()).await.unwrap();
    assert_eq!(outcome, TransitionOutcome::NoTransition);

    sales.transition_all().await.unwrap();
    assert_eq!(
        store.get_sale_status(&sku).await.unwrap().state,
        SaleState::Upcoming
    );
    assert!(events.names().is_empty());
}

#[tokio::test]
async fn test_update_only_while_upcoming() {
    let store = Arc::new(MemorySaleStore::new());
    let products = Arc::new(MemoryProducts::new());
    let events = Arc::new(CountingPublisher::new());
    let sales = SaleService::new(store.clone(), products.clone(), events.clone());

    sales
        .create_sale(CreateSaleCommand {
            sku: "FLASH-EDIT".to_string(),
            product_name: "Original Name".to_string(),
            initial_stock: 10,
            start_time: Utc::now() + Duration::hours(1),
            end_time: Utc::now() + Duration::hours(2),
        })
        .await
        .unwrap();

    // partial update keeps the unspecified fields
    sales
        .update_sale(UpdateSaleCommand {
            sku: "FLASH-EDIT".to_string(),
            product_name: Some("Renamed".to_string()),
            initial_stock: None,
            start_time: None,
            end_time: None,
        })
        .await
        .unwrap();

    let sku = Sku::new("FLASH-EDIT").unwrap();
    let status = store.get_sale_status(&sku).await.unwrap();
    assert_eq!(status.product_name, "Renamed");
    assert_eq!(status.initial_stock, 10);

    store.force_state("FLASH-EDIT", SaleState::Active);
    let denied = sales
        .update_sale(UpdateSaleCommand {
            sku: "FLASH-EDIT".to_string(),
            product_name: Some("Too Late".to_string()),
            initial_stock: None,
            start_time: None,
            end_time: None,
        })
        .await;
    match denied {
        Err(AppError::ValidationError(message)) => {
            assert!(message.contains("cannot be modified in ACTIVE state"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_resets_existing_sale() {
    let store = Arc::new(MemorySaleStore::new());
    let products = Arc::new(MemoryProducts::new());
    let events = Arc::new(CountingPublisher::new());
    let sales = SaleService::new(store.clone(), products.clone(), events.clone());

    let command = || CreateSaleCommand {
        sku: "FLASH-RESET".to_string(),
        product_name: "Reset Widget".to_string(),
        initial_stock: 3,
        start_time: Utc::now() - Duration::minutes(5),
        end_time: Utc::now() + Duration::hours(1),
    };

    sales.create_sale(command()).await.unwrap();
    store.force_state("FLASH-RESET", SaleState::Active);
    store.seed_buyer("FLASH-RESET", "old-buyer");

    sales.create_sale(command()).await.unwrap();

    let sku = Sku::new("FLASH-RESET").unwrap();
    let status = store.get_sale_status(&sku).await.unwrap();
    assert_eq!(status.state, SaleState::Upcoming);
    assert_eq!(status.stock, 3);
    assert!(store.buyers(&sku).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_clears_store_and_product_row() {
    let store = Arc::new(MemorySaleStore::new());
    let products = Arc::new(MemoryProducts::new());
    let events = Arc::new(CountingPublisher::new());
    let sales = SaleService::new(store.clone(), products.clone(), events.clone());

    sales
        .create_sale(CreateSaleCommand {
            sku: "FLASH-GONE".to_string(),
            product_name: "Ephemeral Widget".to_string(),
            initial_stock: 1,
            start_time: Utc::now(),
            end_time: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();
    assert!(products.record("FLASH-GONE").is_some());

    sales.delete_sale("FLASH-GONE").await.unwrap();

    assert!(store.sale_skus().await.unwrap().is_empty());
    assert!(products.record("FLASH-GONE").is_none());
}
