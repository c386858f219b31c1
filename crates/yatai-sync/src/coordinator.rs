//! # Sync Coordinator
//!
//! The orchestrator tying cache, retry, queue and ledger together.
//!
//! ## Commit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    commit_transaction Flow                              │
//! │                                                                         │
//! │  validate (sync, fail fast with VALIDATION_ERROR, nothing queued)      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fetch product stocks (cache-tolerant; advisory - a fetch failure       │
//! │  never blocks the cash sale)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  InventoryLedger (pure) ──► stock updates + oversold warnings          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  transaction row FIRST (financial record of truth),                     │
//! │  stock rows next, each independently:                                   │
//! │       online  ──► RetryExecutor ──► remote                              │
//! │                        │ failure                                        │
//! │       offline ────────┴──────────► OfflineQueue (durable)              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  optimistic cache update (products + balance) - the register stays     │
//! │  responsive while writes are in flight or queued                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CommitOutcome: Recorded │ Queued (+ warnings) - never a silent drop   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drain Flow
//! Strictly FIFO per tenant. A failed item gets its attempt count bumped
//! and the drain moves on; past the cap it is moved to the error log and
//! removed so one poisoned item never blocks the queue. An `OFFLINE`
//! classification aborts the drain without bumping anything - losing the
//! network mid-drain is not the items' fault. The whole drain is
//! single-flight: overlapping calls are no-ops.

use chrono::Utc;
use serde_json::Value;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use yatai_core::validation::validate_transaction;
use yatai_core::{
    apply_transaction, ErrorCode, ErrorRecord, Money, OversoldWarning, PosError, PosResult,
    Product, QueuedOperation, RecordRange, SessionContext, TenantId, Transaction, WriteMethod,
};
use yatai_store::{CacheKey, Store};

use crate::error::classify_store_error;
use crate::monitor::ConnectivityMonitor;
use crate::remote::RemoteRecordStore;
use crate::retry::{RetryExecutor, Sleeper, TokioSleeper};
use crate::rows;

// =============================================================================
// Outcome Types
// =============================================================================

/// How a committed transaction reached (or will reach) the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// Every write was delivered to the remote store.
    Recorded,
    /// At least one write is waiting in the offline queue.
    Queued,
}

/// Result of a committed transaction, for the operator-facing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Id of the committed transaction.
    pub transaction_id: Uuid,

    /// Recorded now, or queued for later delivery.
    pub status: CommitStatus,

    /// Oversold products, if the sale outran the books.
    pub warnings: Vec<OversoldWarning>,
}

/// Result of a queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// False when another drain was already in progress (single-flight).
    pub ran: bool,

    /// Items delivered and removed.
    pub delivered: usize,

    /// Items that failed and stay queued for the next drain.
    pub retained: usize,

    /// Items dropped to the error log at the attempt cap.
    pub dropped: usize,
}

impl DrainReport {
    /// Report for an invocation that joined an in-progress drain.
    pub fn skipped() -> Self {
        DrainReport::default()
    }
}

// =============================================================================
// Sync Coordinator
// =============================================================================

/// Orchestrates reads, sale commits and queue drains.
pub struct SyncCoordinator<R: RemoteRecordStore, S: Sleeper = TokioSleeper> {
    remote: R,
    store: Store,
    retry: RetryExecutor<S>,
    monitor: Arc<ConnectivityMonitor>,
    tenant: RwLock<TenantId>,
    /// Single-flight guard for `drain_queue`; the drain spans awaits, so
    /// the single-threaded execution model alone cannot protect it.
    drain_guard: Mutex<()>,
    last_error: StdMutex<Option<PosError>>,
    queue_max_attempts: i64,
}

impl<R: RemoteRecordStore, S: Sleeper> SyncCoordinator<R, S> {
    /// Creates a coordinator.
    pub fn new(
        remote: R,
        store: Store,
        monitor: Arc<ConnectivityMonitor>,
        retry: RetryExecutor<S>,
        tenant: TenantId,
        queue_max_attempts: i64,
    ) -> Self {
        SyncCoordinator {
            remote,
            store,
            retry,
            monitor,
            tenant: RwLock::new(tenant),
            drain_guard: Mutex::new(()),
            last_error: StdMutex::new(None),
            queue_max_attempts,
        }
    }

    /// Explicit session context for the current operation.
    pub async fn session(&self) -> SessionContext {
        SessionContext::new(self.tenant.read().await.clone(), self.monitor.is_online())
    }

    /// The connectivity monitor.
    pub fn monitor(&self) -> &ConnectivityMonitor {
        &self.monitor
    }

    /// Registers a UI callback for connectivity transitions.
    pub fn on_connectivity_change(&self, callback: impl Fn(bool) + Send + Sync + 'static) {
        self.monitor.on_change(callback);
    }

    /// The most recent terminal failure, for the UI error surface.
    pub fn last_error(&self) -> Option<PosError> {
        self.last_error.lock().ok().and_then(|guard| guard.clone())
    }

    /// Records a terminal failure and hands it back for propagation.
    async fn note_terminal_failure(&self, error: PosError) -> PosError {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(error.clone());
        }
        self.store
            .error_log()
            .append(&ErrorRecord::from_error(&error, Utc::now()))
            .await;
        error
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads rows from the remote store, cache-backed.
    ///
    /// Offline: cached rows or `OFFLINE`. Online: retry-wrapped fetch,
    /// cached on success; a terminal failure silently falls back to stale
    /// cached rows when any exist.
    pub async fn read(&self, range: &RecordRange, params: &Value) -> PosResult<Vec<Vec<Value>>> {
        let session = self.session().await;
        let key = CacheKey::new(&session.tenant, range.as_str(), params);

        if !session.online {
            return match self.store.cache().get(&key).await {
                Ok(Some(entry)) => {
                    debug!(%range, "Offline; serving cached rows");
                    rows::value_to_rows(&entry.payload)
                }
                Ok(None) | Err(_) => {
                    let err = PosError::offline(format!("offline with no cached rows for {range}"))
                        .with_context(range.to_string());
                    Err(self.note_terminal_failure(err).await)
                }
            };
        }

        let tenant = session.tenant.clone();
        match self
            .retry
            .execute(|| self.remote.get_records(&tenant, range))
            .await
        {
            Ok(fetched) => {
                self.store
                    .cache()
                    .put(&key, &tenant, &rows::rows_to_value(&fetched))
                    .await;
                Ok(fetched)
            }
            Err(err) => {
                if let Ok(Some(entry)) = self.store.cache().get(&key).await {
                    warn!(%range, code = %err.code, "Remote read failed; serving stale cache");
                    return rows::value_to_rows(&entry.payload);
                }
                Err(self.note_terminal_failure(err).await)
            }
        }
    }

    /// Fetches and parses the product master rows.
    pub async fn fetch_products(&self) -> PosResult<Vec<Product>> {
        let fetched = self.read(&rows::products_range(), &Value::Null).await?;
        rows::parse_products(&fetched)
    }

    /// Fetches the register balance.
    pub async fn fetch_register_balance(&self) -> PosResult<Money> {
        let fetched = self.read(&rows::balance_range(), &Value::Null).await?;
        rows::parse_balance(&fetched)
    }

    /// Sums the transaction log for the given UTC date.
    pub async fn fetch_daily_total(&self, date: chrono::NaiveDate) -> PosResult<Money> {
        let fetched = self
            .read(&rows::transactions_read_range(), &Value::Null)
            .await?;
        let records = fetched
            .iter()
            .map(|row| rows::parse_transaction_row(row))
            .collect::<PosResult<Vec<_>>>()?;
        Ok(rows::daily_total(&records, date))
    }

    // =========================================================================
    // Commits
    // =========================================================================

    /// Commits a sale.
    ///
    /// Validation failures surface synchronously and queue nothing. After
    /// that the sale always completes locally: writes are delivered now,
    /// or durably queued, and the operator is told which.
    pub async fn commit_transaction(&self, transaction: &Transaction) -> PosResult<CommitOutcome> {
        if let Err(err) = validate_transaction(transaction) {
            return Err(self.note_terminal_failure(err).await);
        }

        let session = self.session().await;
        let tenant = session.tenant.clone();

        // Stock state is advisory: a sale must commit even when the
        // product rows cannot be fetched.
        let products = match self.fetch_products().await {
            Ok(products) => products,
            Err(err) => {
                warn!(
                    code = %err.code,
                    "Product rows unavailable; committing sale without stock update"
                );
                Vec::new()
            }
        };

        let ledger = apply_transaction(&products, transaction);
        for warning in &ledger.warnings {
            warn!(
                product = %warning.product_name,
                attempted_ml = warning.attempted.ml(),
                available_ml = warning.available.ml(),
                "Product oversold"
            );
        }

        // The transaction row is the financial record of truth: it is
        // sent (or queued) before any stock update.
        let transaction_op = QueuedOperation {
            tenant: tenant.clone(),
            method: WriteMethod::Append,
            range: rows::transactions_range(),
            rows: vec![rows::transaction_row(transaction)],
        };

        let mut stock_ops = Vec::with_capacity(ledger.updates.len());
        for update in &ledger.updates {
            if let Some(position) = products.iter().position(|p| p.name == update.product_name) {
                stock_ops.push(QueuedOperation {
                    tenant: tenant.clone(),
                    method: WriteMethod::Update,
                    range: rows::stock_update_range(position),
                    rows: rows::stock_update_rows(update),
                });
            }
        }

        let mut queued = false;
        for op in std::iter::once(&transaction_op).chain(stock_ops.iter()) {
            if session.online {
                let sent = self
                    .retry
                    .execute(|| self.remote.write(&op.tenant, op.method, &op.range, &op.rows))
                    .await;
                match sent {
                    Ok(()) => continue,
                    Err(err) => {
                        warn!(
                            code = %err.code,
                            range = %op.range,
                            "Write failed; queueing for later delivery"
                        );
                    }
                }
            }
            self.enqueue(op).await?;
            queued = true;
        }

        // Optimistic local state: the register keeps serving while the
        // writes are in flight or queued.
        self.cache_optimistic_state(
            &tenant,
            &products,
            &ledger,
            transaction.resulting_balance,
        )
        .await;

        let status = if queued {
            info!(id = %transaction.id, total = %transaction.total, "Sale queued for sync");
            CommitStatus::Queued
        } else {
            info!(id = %transaction.id, total = %transaction.total, "Sale recorded");
            CommitStatus::Recorded
        };

        Ok(CommitOutcome {
            transaction_id: transaction.id,
            status,
            warnings: ledger.warnings,
        })
    }

    /// Durably queues one write; storage failure is surfaced, never
    /// swallowed.
    async fn enqueue(&self, operation: &QueuedOperation) -> PosResult<()> {
        match self.store.outbox().enqueue(operation).await {
            Ok(_) => Ok(()),
            Err(store_err) => {
                let err = classify_store_error(&store_err, "enqueue");
                Err(self.note_terminal_failure(err).await)
            }
        }
    }

    /// Writes the post-sale product rows and balance into the cache.
    async fn cache_optimistic_state(
        &self,
        tenant: &TenantId,
        products: &[Product],
        ledger: &yatai_core::LedgerOutcome,
        balance: Money,
    ) {
        let cache = self.store.cache();

        if !products.is_empty() {
            let updated: Vec<Vec<Value>> = products
                .iter()
                .map(|product| {
                    match ledger
                        .updates
                        .iter()
                        .find(|u| u.product_name == product.name)
                    {
                        Some(update) => rows::product_row(&rows::apply_update(product, update)),
                        None => rows::product_row(product),
                    }
                })
                .collect();

            let key = CacheKey::new(tenant, rows::products_range().as_str(), &Value::Null);
            cache.put(&key, tenant, &rows::rows_to_value(&updated)).await;
        }

        let key = CacheKey::new(tenant, rows::balance_range().as_str(), &Value::Null);
        cache
            .put(
                &key,
                tenant,
                &rows::rows_to_value(&[vec![Value::from(balance.yen())]]),
            )
            .await;
    }

    // =========================================================================
    // Queue Drain
    // =========================================================================

    /// Replays the offline queue, strictly FIFO, single-flight.
    pub async fn drain_queue(&self) -> PosResult<DrainReport> {
        let _guard = match self.drain_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!("Drain already in progress; skipping");
                return Ok(DrainReport::skipped());
            }
        };

        let tenant = self.tenant.read().await.clone();
        let outbox = self.store.outbox();
        let items = outbox
            .list_pending(&tenant)
            .await
            .map_err(|e| classify_store_error(&e, "drain list_pending"))?;

        let mut report = DrainReport {
            ran: true,
            ..DrainReport::default()
        };

        if items.is_empty() {
            return Ok(report);
        }
        info!(pending = items.len(), "Draining offline queue");

        for item in items {
            let op = &item.operation;
            let sent = self
                .retry
                .execute(|| self.remote.write(&op.tenant, op.method, &op.range, &op.rows))
                .await;

            match sent {
                Ok(()) => {
                    outbox
                        .remove(item.id)
                        .await
                        .map_err(|e| classify_store_error(&e, "drain remove"))?;
                    debug!(id = item.id, range = %op.range, "Queued write delivered");
                    report.delivered += 1;
                }
                Err(err) if err.code == ErrorCode::Offline => {
                    // Connectivity vanished mid-drain. Not the item's
                    // fault: leave everything untouched for the next
                    // reconnect.
                    warn!(id = item.id, "Connectivity lost during drain; stopping");
                    break;
                }
                Err(err) => {
                    let attempts = outbox
                        .record_failure(item.id, &err.to_string())
                        .await
                        .map_err(|e| classify_store_error(&e, "drain record_failure"))?;

                    if attempts >= self.queue_max_attempts {
                        let terminal = err.with_context(format!(
                            "queue item {} dropped after {} attempts ({} {})",
                            item.id, attempts, op.method, op.range
                        ));
                        warn!(
                            id = item.id,
                            attempts,
                            code = %terminal.code,
                            "Dropping poisoned queue item to the error log"
                        );
                        let _ = self.note_terminal_failure(terminal).await;
                        outbox
                            .remove(item.id)
                            .await
                            .map_err(|e| classify_store_error(&e, "drain remove"))?;
                        report.dropped += 1;
                    } else {
                        report.retained += 1;
                    }
                }
            }
        }

        info!(
            delivered = report.delivered,
            retained = report.retained,
            dropped = report.dropped,
            "Drain finished"
        );
        Ok(report)
    }

    /// Consumes reconnect nudges from the monitor and drains the queue.
    ///
    /// Spawn this once at startup:
    /// ```rust,ignore
    /// let nudges = monitor.drain_nudges();
    /// tokio::spawn(coordinator.clone().run_drain_loop(nudges));
    /// ```
    pub async fn run_drain_loop(self: Arc<Self>, mut nudges: mpsc::Receiver<()>) {
        while nudges.recv().await.is_some() {
            if let Err(err) = self.drain_queue().await {
                warn!(code = %err.code, "Queue drain failed");
            }
        }
        debug!("Drain loop ended");
    }

    // =========================================================================
    // Tenant & Maintenance
    // =========================================================================

    /// Switches the active tenant.
    ///
    /// The previous tenant's cache is invalidated so nothing leaks across
    /// stalls; its queued writes stay pending and will drain under their
    /// own tenant id.
    pub async fn set_tenant(&self, new_tenant: TenantId) {
        let old = {
            let mut guard = self.tenant.write().await;
            std::mem::replace(&mut *guard, new_tenant.clone())
        };

        if old == new_tenant {
            return;
        }

        info!(from = %old, to = %new_tenant, "Switching tenant");
        if let Err(err) = self.store.cache().invalidate_tenant(&old).await {
            warn!(error = %err, "Failed to invalidate previous tenant cache");
        }
    }

    /// Prunes error records older than `retention`.
    pub async fn prune_error_log(&self, retention: chrono::Duration) -> PosResult<u64> {
        self.store
            .error_log()
            .prune_older_than(retention)
            .await
            .map_err(|e| classify_store_error(&e, "prune error log"))
    }
}
