//! Bounded extraction work queue.
//!
//! A fixed pool of worker tasks drains a bounded channel; the pool size is
//! the concurrency limit on in-flight proposals. Dispatch is idempotent
//! within this process: an in-flight registry keyed by proposal id rejects
//! a second enqueue (or a concurrent direct-process request) for the same
//! proposal until the first attempt releases its claim. Exclusion across
//! multiple service processes is out of scope — deployment is single
//! process, and the upload-hash dedup bounds the damage either way.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::db::repository::pending_proposal_ids;
use crate::db::sqlite::open_database;

use super::orchestrator::Pipeline;

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Simultaneously in-flight proposals.
    pub workers: usize,
    /// Bounded channel capacity; enqueues beyond it are dropped (the scan
    /// loop will pick the proposal up again while it stays pending).
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            capacity: 64,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// In-flight registry — idempotent dispatch per proposal id
// ═══════════════════════════════════════════════════════════

#[derive(Default)]
pub struct InFlightRegistry {
    ids: Mutex<HashSet<Uuid>>,
}

impl InFlightRegistry {
    /// Claim a proposal for processing. Returns `None` if some other path
    /// (queue worker or direct process request) already holds it.
    pub fn try_claim(self: &Arc<Self>, id: Uuid) -> Option<ClaimTicket> {
        let mut ids = self.ids.lock().ok()?;
        if ids.insert(id) {
            Some(ClaimTicket {
                registry: Arc::clone(self),
                id,
            })
        } else {
            None
        }
    }

    pub fn is_in_flight(&self, id: &Uuid) -> bool {
        self.ids.lock().map(|ids| ids.contains(id)).unwrap_or(false)
    }
}

/// RAII claim on a proposal id; dropping it releases the claim.
pub struct ClaimTicket {
    registry: Arc<InFlightRegistry>,
    id: Uuid,
}

impl Drop for ClaimTicket {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.registry.ids.lock() {
            ids.remove(&self.id);
        }
    }
}

// ═══════════════════════════════════════════════════════════
// ExtractionQueue
// ═══════════════════════════════════════════════════════════

struct Job {
    id: Uuid,
    // Held for the whole processing run; dropped by the worker afterwards.
    _ticket: ClaimTicket,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>;

pub struct ExtractionQueue {
    tx: mpsc::Sender<Job>,
    registry: Arc<InFlightRegistry>,
    workers: Vec<JoinHandle<()>>,
}

impl ExtractionQueue {
    /// Spawn the worker pool and return the queue handle.
    pub fn start(pipeline: Arc<Pipeline>, config: QueueConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker| tokio::spawn(worker_loop(worker, rx.clone(), pipeline.clone())))
            .collect();

        tracing::info!(workers = config.workers, "Extraction queue started");

        Self {
            tx,
            registry: Arc::new(InFlightRegistry::default()),
            workers,
        }
    }

    /// Claim a proposal for direct (non-queued) processing. Shares the
    /// registry with the workers, so a queued proposal cannot also be
    /// processed inline.
    pub fn try_claim(&self, id: Uuid) -> Option<ClaimTicket> {
        self.registry.try_claim(id)
    }

    pub fn is_in_flight(&self, id: &Uuid) -> bool {
        self.registry.is_in_flight(id)
    }

    /// Enqueue a proposal for background extraction. Returns false when the
    /// proposal is already queued/in flight or the channel is full.
    pub fn enqueue(&self, id: Uuid) -> bool {
        let Some(ticket) = self.registry.try_claim(id) else {
            tracing::debug!(proposal_id = %id, "Proposal already in flight, skipping enqueue");
            return false;
        };

        match self.tx.try_send(Job { id, _ticket: ticket }) {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(proposal_id = %id, "Extraction queue full, dropping dispatch");
                false
            }
        }
    }

    /// Close the queue and wait for workers to drain.
    pub async fn shutdown(self) {
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.await;
        }
        tracing::info!("Extraction queue stopped");
    }
}

async fn worker_loop(worker: usize, rx: SharedReceiver, pipeline: Arc<Pipeline>) {
    loop {
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };

        tracing::debug!(worker, proposal_id = %job.id, "Worker picked up proposal");
        match pipeline.process(&job.id).await {
            Ok(outcome) => {
                tracing::info!(
                    worker,
                    proposal_id = %job.id,
                    review_needed = outcome.review_needed,
                    "Background extraction completed"
                );
            }
            Err(e) => {
                tracing::warn!(worker, proposal_id = %job.id, error = %e, "Background extraction failed");
            }
        }
        // job._ticket drops here, releasing the in-flight claim
    }
    tracing::debug!(worker, "Extraction worker stopped");
}

// ═══════════════════════════════════════════════════════════
// Pending scan — whoever observes pending work dispatches it
// ═══════════════════════════════════════════════════════════

/// Enqueue every proposal currently pending. Errors are logged and
/// swallowed; the next scan tick tries again.
pub fn scan_pending_once(queue: &ExtractionQueue, db_path: &Path) {
    let conn = match open_database(db_path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(error = %e, "Pending scan could not open database");
            return;
        }
    };

    match pending_proposal_ids(&conn) {
        Ok(ids) => {
            for id in ids {
                queue.enqueue(id);
            }
        }
        Err(e) => tracing::warn!(error = %e, "Pending scan query failed"),
    }
}

/// Periodically re-dispatch pending proposals (covers retries and any
/// dispatch dropped on a full channel).
pub fn spawn_pending_scan(
    queue: Arc<ExtractionQueue>,
    db_path: PathBuf,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            scan_pending_once(&queue, &db_path);
        }
    })
}
