/*!
 * Pending-job queue hand-off.
 *
 * The batch coordinator can hand prepared work units to a `JobQueue`
 * instead of translating inline. `LocalJobQueue` runs them on tokio tasks,
 * at most `workers` at a time.
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::orchestrator::TranslationOrchestrator;
use super::request::TranslationRequest;
use crate::catalog::MediaItem;
use crate::providers::TranslatorSettings;

/// Everything one translation needs; owned, never shared between units
#[derive(Debug, Clone)]
pub struct WorkUnit {
    /// Validated request, source language already settled
    pub request: TranslationRequest,
    /// Resolved source subtitle
    pub source_path: PathBuf,
    /// Media item with a locally reachable video path
    pub media: MediaItem,
    /// Translator settings for this call
    pub settings: TranslatorSettings,
}

impl WorkUnit {
    /// Name shown in logs and queue listings
    pub fn name(&self) -> String {
        format!(
            "Translating {} to {} for {}",
            self.request.source_language(),
            self.request.target_language(),
            self.media.title
        )
    }
}

/// Outcome of a finished work unit
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOutcome {
    /// Queue-assigned id
    pub id: Uuid,
    /// Unit name
    pub name: String,
    /// Written subtitle, or the error text
    pub result: Result<PathBuf, String>,
}

/// Target for queued translations
pub trait JobQueue: Send + Sync {
    /// Accept a work unit; the error text ends up in the batch response
    fn enqueue(&self, unit: WorkUnit) -> Result<(), String>;
}

/// In-process queue backed by tokio tasks
pub struct LocalJobQueue {
    orchestrator: Arc<TranslationOrchestrator>,
    permits: Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    outcomes: Arc<Mutex<Vec<WorkOutcome>>>,
    cancel: CancellationToken,
}

impl LocalJobQueue {
    /// Create a queue running at most `workers` units at once
    pub fn new(orchestrator: Arc<TranslationOrchestrator>, workers: usize, cancel: CancellationToken) -> Self {
        Self {
            orchestrator,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            outcomes: Arc::new(Mutex::new(Vec::new())),
            cancel,
        }
    }

    /// Units accepted but not finished
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Finished units, in completion order
    pub fn outcomes(&self) -> Vec<WorkOutcome> {
        self.outcomes.lock().clone()
    }

    /// Wait until every accepted unit has finished
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl JobQueue for LocalJobQueue {
    fn enqueue(&self, unit: WorkUnit) -> Result<(), String> {
        if self.cancel.is_cancelled() {
            return Err("queue is shutting down".to_string());
        }

        let id = Uuid::new_v4();
        let name = unit.name();
        info!("Queued job {}: {}", id, name);

        let orchestrator = Arc::clone(&self.orchestrator);
        let permits = Arc::clone(&self.permits);
        let pending = Arc::clone(&self.pending);
        let idle = Arc::clone(&self.idle);
        let outcomes = Arc::clone(&self.outcomes);
        let cancel = self.cancel.clone();

        pending.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let result = match permits.acquire_owned().await {
                Ok(_permit) => orchestrator
                    .run(&unit.request, &unit.source_path, &unit.media, &unit.settings, &cancel)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match &result {
                Ok(path) => info!("Job {} finished: {:?}", id, path),
                Err(e) => error!("Job {} failed: {}", id, e),
            }
            outcomes.lock().push(WorkOutcome { id, name, result });

            pending.fetch_sub(1, Ordering::SeqCst);
            idle.notify_waiters();
        });

        Ok(())
    }
}
