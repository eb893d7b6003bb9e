use log::{debug, info};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::catalog::{CatalogConnection, Repository};
use crate::detection::language::HeuristicLanguageDetector;
use crate::errors::AppError;
use crate::path_mapping::PathMapper;
use crate::progress::ProgressReporter;
use crate::providers::TranslationJobClient;
use crate::resolver::SubtitleResolver;
use crate::translation::{BatchCoordinator, BatchResult, DispatchPolicy, LocalJobQueue, TranslationOrchestrator};

// @module: Application controller wiring the translation pipeline

/// Read-only calls against the translation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceQuery {
    Status,
    Jobs,
    Job(String),
    CancelJob(String),
    Models,
    Config,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    repository: Arc<Repository>,
    client: Arc<TranslationJobClient>,
    progress: Arc<dyn ProgressReporter>,
    cancel: CancellationToken,
}

impl Controller {
    // @method: Create a controller over the configured catalog database
    pub fn with_config(
        config: Config,
        progress: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Result<Self, AppError> {
        let connection = match config.database_path() {
            Some(path) => CatalogConnection::new(path),
            None => CatalogConnection::new_default(),
        }
        .map_err(|e| AppError::Database(format!("{:#}", e)))?;
        info!("Using catalog database at {:?}", connection.path());

        Ok(Self::with_repository(config, Arc::new(Repository::new(connection)), progress, cancel))
    }

    // @method: Create a controller over an existing repository
    pub fn with_repository(
        config: Config,
        repository: Arc<Repository>,
        progress: Arc<dyn ProgressReporter>,
        cancel: CancellationToken,
    ) -> Self {
        let client = Arc::new(TranslationJobClient::from_config(&config.translator, Arc::clone(&progress)));
        Self { config, repository, client, progress, cancel }
    }

    /// Catalog and history store
    pub fn repository(&self) -> &Arc<Repository> {
        &self.repository
    }

    /// Translation service client
    pub fn client(&self) -> &TranslationJobClient {
        &self.client
    }

    /// Read batch items from a JSON file holding either a list or `{"items": [...]}`
    pub fn load_items<P: AsRef<Path>>(path: P) -> Result<Vec<Value>, AppError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::File(format!("Failed to read {:?}: {}", path, e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("Invalid batch file {:?}: {}", path, e)))?;

        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("items") {
                Some(Value::Array(items)) => items,
                _ => return Err(AppError::Config("No items provided".to_string())),
            },
            _ => return Err(AppError::Config("No items provided".to_string())),
        };

        if items.is_empty() {
            return Err(AppError::Config("Empty items list".to_string()));
        }
        Ok(items)
    }

    /// Translate a batch of items as configured. In queue mode this waits
    /// until every queued item has finished.
    pub async fn run_batch(&self, items: &[Value]) -> BatchResult {
        let mapper: Arc<dyn PathMapper> = Arc::new(self.config.path_mappings.to_mappings());
        let resolver = Arc::new(SubtitleResolver::new(
            Arc::clone(&mapper),
            Arc::new(HeuristicLanguageDetector::default()),
        ));
        let orchestrator = Arc::new(TranslationOrchestrator::new(
            self.client.clone(),
            self.repository.clone(),
            Arc::clone(&self.progress),
        ));

        let coordinator = BatchCoordinator::new(
            self.repository.clone(),
            resolver,
            mapper,
            Arc::clone(&orchestrator),
            self.config.translator.settings(),
        );

        match self.config.batch.dispatch {
            DispatchPolicy::Inline => coordinator.run_batch(items, &self.cancel).await,
            DispatchPolicy::Queue => {
                let queue = Arc::new(LocalJobQueue::new(
                    orchestrator,
                    self.config.batch.queue_workers,
                    self.cancel.clone(),
                ));
                let coordinator = coordinator.with_queue(queue.clone());
                let result = coordinator.run_batch(items, &self.cancel).await;

                debug!("Waiting for {} queued translations", queue.pending());
                queue.wait_idle().await;
                for outcome in queue.outcomes() {
                    if let Err(e) = &outcome.result {
                        self.progress.show_message(&format!("{}: {}", outcome.name, e));
                    }
                }
                result
            }
        }
    }

    /// Run one inspection call against the translation service
    pub async fn query_service(&self, query: ServiceQuery) -> Result<Value, AppError> {
        let value = match query {
            ServiceQuery::Status => self.client.status().await?,
            ServiceQuery::Jobs => self.client.list_jobs().await?,
            ServiceQuery::Job(id) => self.client.get_job(&id).await?,
            ServiceQuery::CancelJob(id) => self.client.cancel_job(&id).await?,
            ServiceQuery::Models => self.client.models().await?,
            ServiceQuery::Config => self.client.service_config().await?,
        };
        Ok(value)
    }
}
