//! In-memory fakes for the engine's collaborator seams. The sale store
//! fake mirrors the Redis script semantics step by step, with a settable
//! clock so admission windows can be tested deterministically.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use flashsale_backend::domain::{
    DomainEvent, Purchase, PurchaseNumber, Sale, SaleState, Sku, UserId,
};
use flashsale_backend::error::{AppError, AppResult};
use flashsale_backend::ports::{
    EventPublisher, ProductDraft, ProductRecord, ProductRepository, PurchaseAttempt, PurchaseJob,
    PurchaseQueue, PurchaseRepository, RejectionCode, SaleStatus, SaleStore, TransitionOutcome,
};

struct SaleRecord {
    state: SaleState,
    stock: u32,
    buyers: HashSet<String>,
    product_name: String,
    initial_stock: u32,
    start_ms: i64,
    end_ms: i64,
}

/// Replays the fast-store admission contract in memory. One mutex in
/// place of Redis single-threaded execution.
pub struct MemorySaleStore {
    sales: Mutex<HashMap<String, SaleRecord>>,
    now: Mutex<Option<DateTime<Utc>>>,
}

impl MemorySaleStore {
    pub fn new() -> Self {
        Self {
            sales: Mutex::new(HashMap::new()),
            now: Mutex::new(None),
        }
    }

    /// Pin the admission clock (transition checks use the caller's clock).
    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = Some(now);
    }

    pub fn force_state(&self, sku: &str, state: SaleState) {
        let mut sales = self.sales.lock().unwrap();
        if let Some(record) = sales.get_mut(sku) {
            record.state = state;
        }
    }

    pub fn seed_buyer(&self, sku: &str, user_id: &str) {
        let mut sales = self.sales.lock().unwrap();
        if let Some(record) = sales.get_mut(sku) {
            record.buyers.insert(user_id.to_string());
        }
    }

    fn current(&self) -> DateTime<Utc> {
        self.now.lock().unwrap().unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl SaleStore for MemorySaleStore {
    async fn attempt_purchase(&self, sku: &Sku, user_id: &UserId) -> AppResult<PurchaseAttempt> {
        let now_ms = self.current().timestamp_millis();
        let mut sales = self.sales.lock().unwrap();

        let Some(record) = sales.get_mut(sku.as_str()) else {
            return Ok(PurchaseAttempt::Rejected {
                code: RejectionCode::SaleNotActive,
            });
        };

        // Lazy expiry happens inside the admission step, same as the script.
        if record.state == SaleState::Active && now_ms >= record.end_ms {
            record.state = SaleState::Ended;
        }
        if record.state != SaleState::Active {
            return Ok(PurchaseAttempt::Rejected {
                code: RejectionCode::SaleNotActive,
            });
        }
        if record.buyers.contains(user_id.as_str()) {
            return Ok(PurchaseAttempt::Rejected {
                code: RejectionCode::AlreadyPurchased,
            });
        }
        if record.stock == 0 {
            return Ok(PurchaseAttempt::Rejected {
                code: RejectionCode::SoldOut,
            });
        }

        record.stock -= 1;
        record.buyers.insert(user_id.as_str().to_string());
        if record.stock == 0 {
            record.state = SaleState::Ended;
        }

        Ok(PurchaseAttempt::Success {
            purchase_no: PurchaseNumber::generate(),
            remaining_stock: record.stock,
            purchased_at: Utc::now(),
        })
    }

    async fn get_sale_status(&self, sku: &Sku) -> AppResult<SaleStatus> {
        let sales = self.sales.lock().unwrap();
        let Some(record) = sales.get(sku.as_str()) else {
            return Ok(SaleStatus {
                sku: sku.as_str().to_string(),
                state: SaleState::Upcoming,
                stock: 0,
                initial_stock: 0,
                product_name: String::new(),
                start_time: String::new(),
                end_time: String::new(),
            });
        };
        Ok(SaleStatus {
            sku: sku.as_str().to_string(),
            state: record.state,
            stock: record.stock,
            initial_stock: record.initial_stock,
            product_name: record.product_name.clone(),
            start_time: record.start_ms.to_string(),
            end_time: record.end_ms.to_string(),
        })
    }

    async fn initialize_sale(&self, sale: &Sale) -> AppResult<()> {
        let mut sales = self.sales.lock().unwrap();
        sales.insert(
            sale.sku().as_str().to_string(),
            SaleRecord {
                state: sale.state(),
                stock: sale.stock().value(),
                buyers: HashSet::new(),
                product_name: sale.product_name().to_string(),
                initial_stock: sale.stock().value(),
                start_ms: sale.time_range().start().timestamp_millis(),
                end_ms: sale.time_range().end().timestamp_millis(),
            },
        );
        Ok(())
    }

    async fn transition_state(
        &self,
        sku: &Sku,
        now: DateTime<Utc>,
    ) -> AppResult<TransitionOutcome> {
        let now_ms = now.timestamp_millis();
        let mut sales = self.sales.lock().unwrap();
        let Some(record) = sales.get_mut(sku.as_str()) else {
            return Ok(TransitionOutcome::NoTransition);
        };

        if record.state == SaleState::Upcoming && now_ms >= record.start_ms {
            record.state = SaleState::Active;
            return Ok(TransitionOutcome::TransitionedToActive);
        }
        if record.state == SaleState::Active && now_ms >= record.end_ms {
            record.state = SaleState::Ended;
            return Ok(TransitionOutcome::TransitionedToEnded);
        }
        Ok(TransitionOutcome::NoTransition)
    }

    async fn delete_sale(&self, sku: &Sku) -> AppResult<()> {
        self.sales.lock().unwrap().remove(sku.as_str());
        Ok(())
    }

    async fn buyers(&self, sku: &Sku) -> AppResult<Vec<String>> {
        let sales = self.sales.lock().unwrap();
        let mut buyers: Vec<String> = sales
            .get(sku.as_str())
            .map(|record| record.buyers.iter().cloned().collect())
            .unwrap_or_default();
        buyers.sort();
        Ok(buyers)
    }

    async fn sale_skus(&self) -> AppResult<Vec<String>> {
        let sales = self.sales.lock().unwrap();
        let mut skus: Vec<String> = sales.keys().cloned().collect();
        skus.sort();
        Ok(skus)
    }
}

#[derive(Clone)]
struct LedgerRow {
    product_id: i64,
    user_id: String,
    purchased_at: DateTime<Utc>,
}

/// Durable ledger fake with the same idempotency rule as the real table
/// and a switchable failure mode for breaker flows.
pub struct MemoryLedger {
    product_ids: Mutex<HashMap<String, i64>>,
    rows: Mutex<Vec<LedgerRow>>,
    failing: Mutex<bool>,
    persist_calls: AtomicU32,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            product_ids: Mutex::new(HashMap::new()),
            rows: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
            persist_calls: AtomicU32::new(0),
        }
    }

    pub fn add_product(&self, sku: &str, product_id: i64) {
        self.product_ids
            .lock()
            .unwrap()
            .insert(sku.to_string(), product_id);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn persist_calls(&self) -> u32 {
        self.persist_calls.load(Ordering::SeqCst)
    }

    pub fn user_ids(&self, product_id: i64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.product_id == product_id)
            .map(|row| row.user_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl PurchaseRepository for MemoryLedger {
    async fn persist(&self, purchase: &Purchase) -> AppResult<()> {
        self.persist_calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock().unwrap() {
            return Err(AppError::InternalError("ledger unavailable".to_string()));
        }

        let product_id = {
            let products = self.product_ids.lock().unwrap();
            products.get(purchase.sku().as_str()).copied()
        };
        let Some(product_id) = product_id else {
            return Ok(());
        };

        let mut rows = self.rows.lock().unwrap();
        let exists = rows
            .iter()
            .any(|row| row.product_id == product_id && row.user_id == purchase.user_id().as_str());
        if !exists {
            rows.push(LedgerRow {
                product_id,
                user_id: purchase.user_id().as_str().to_string(),
                purchased_at: purchase.purchased_at(),
            });
        }
        Ok(())
    }

    async fn find_by_user(&self, sku: &Sku, user_id: &UserId) -> AppResult<Option<Purchase>> {
        let product_id = {
            let products = self.product_ids.lock().unwrap();
            products.get(sku.as_str()).copied()
        };
        let Some(product_id) = product_id else {
            return Ok(None);
        };

        let rows = self.rows.lock().unwrap();
        let found = rows
            .iter()
            .position(|row| row.product_id == product_id && row.user_id == user_id.as_str());
        Ok(found.map(|index| {
            Purchase::reconstitute(
                PurchaseNumber::from_value(format!("PUR-{}", index + 1)),
                sku.clone(),
                user_id.clone(),
                rows[index].purchased_at,
            )
        }))
    }

    async fn list_user_ids(&self, product_id: i64) -> AppResult<Vec<String>> {
        Ok(self.user_ids(product_id))
    }
}

/// Product configuration rows with sequential ids starting at 1.
pub struct MemoryProducts {
    records: Mutex<HashMap<String, ProductRecord>>,
    next_id: AtomicU32,
}

impl MemoryProducts {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        }
    }

    pub fn record(&self, sku: &str) -> Option<ProductRecord> {
        self.records.lock().unwrap().get(sku).cloned()
    }
}

#[async_trait]
impl ProductRepository for MemoryProducts {
    async fn find_by_sku(&self, sku: &Sku) -> AppResult<Option<ProductRecord>> {
        Ok(self.records.lock().unwrap().get(sku.as_str()).cloned())
    }

    async fn upsert_by_sku(&self, draft: &ProductDraft) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get_mut(&draft.sku) {
            existing.product_name = draft.product_name.clone();
            existing.initial_stock = draft.initial_stock;
            existing.start_time = draft.start_time;
            existing.end_time = draft.end_time;
            existing.state = draft.state.as_str().to_string();
        } else {
            let id = i64::from(self.next_id.fetch_add(1, Ordering::SeqCst));
            records.insert(
                draft.sku.clone(),
                ProductRecord {
                    id,
                    sku: draft.sku.clone(),
                    product_name: draft.product_name.clone(),
                    initial_stock: draft.initial_stock,
                    start_time: draft.start_time,
                    end_time: draft.end_time,
                    state: draft.state.as_str().to_string(),
                    created_at: Utc::now(),
                },
            );
        }
        Ok(())
    }

    async fn delete_by_sku(&self, sku: &Sku) -> AppResult<()> {
        self.records.lock().unwrap().remove(sku.as_str());
        Ok(())
    }
}

/// Records published event names in order.
pub struct CountingPublisher {
    names: Mutex<Vec<String>>,
}

impl CountingPublisher {
    pub fn new() -> Self {
        Self {
            names: Mutex::new(Vec::new()),
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for CountingPublisher {
    async fn publish(&self, event: &DomainEvent) -> AppResult<()> {
        self.names
            .lock()
            .unwrap()
            .push(event.payload.name().to_string());
        Ok(())
    }
}

/// Captures enqueued jobs without any Redis.
pub struct MemoryQueue {
    jobs: Mutex<Vec<PurchaseJob>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn jobs(&self) -> Vec<PurchaseJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn drain(&self) -> Vec<PurchaseJob> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }
}

#[async_trait]
impl PurchaseQueue for MemoryQueue {
    async fn enqueue(&self, job: &PurchaseJob) -> AppResult<()> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}
