/*!
 * Batch translation processing.
 *
 * Every item is validated, looked up, resolved and dispatched on its own;
 * one failing item never aborts the batch. Counts and errors follow input
 * order.
 */

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::anyhow;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::orchestrator::TranslationOrchestrator;
use super::queue::{JobQueue, WorkUnit};
use super::request::{BatchItem, BatchResult, MediaKind, MediaRef, TranslationRequest};
use crate::catalog::{MediaCatalog, MediaItem};
use crate::errors::BatchItemError;
use crate::path_mapping::PathMapper;
use crate::providers::TranslatorSettings;
use crate::resolver::SubtitleResolver;

/// Where prepared items go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchPolicy {
    /// Translate each item before moving to the next
    #[default]
    Inline,
    /// Hand items to the pending-job queue
    Queue,
}

impl FromStr for DispatchPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(DispatchPolicy::Inline),
            "queue" => Ok(DispatchPolicy::Queue),
            _ => Err(anyhow!("Invalid dispatch policy: {}", s)),
        }
    }
}

impl fmt::Display for DispatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchPolicy::Inline => write!(f, "inline"),
            DispatchPolicy::Queue => write!(f, "queue"),
        }
    }
}

enum Dispatcher {
    Inline,
    Queue(Arc<dyn JobQueue>),
}

/// Runs batches of translation items
pub struct BatchCoordinator {
    catalog: Arc<dyn MediaCatalog>,
    resolver: Arc<SubtitleResolver>,
    mapper: Arc<dyn PathMapper>,
    orchestrator: Arc<TranslationOrchestrator>,
    settings: TranslatorSettings,
    dispatcher: Dispatcher,
}

impl BatchCoordinator {
    /// Create a coordinator translating inline
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        resolver: Arc<SubtitleResolver>,
        mapper: Arc<dyn PathMapper>,
        orchestrator: Arc<TranslationOrchestrator>,
        settings: TranslatorSettings,
    ) -> Self {
        Self {
            catalog,
            resolver,
            mapper,
            orchestrator,
            settings,
            dispatcher: Dispatcher::Inline,
        }
    }

    /// Hand prepared items to `queue` instead of translating inline
    pub fn with_queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.dispatcher = Dispatcher::Queue(queue);
        self
    }

    /// Current dispatch policy
    pub fn policy(&self) -> DispatchPolicy {
        match self.dispatcher {
            Dispatcher::Inline => DispatchPolicy::Inline,
            Dispatcher::Queue(_) => DispatchPolicy::Queue,
        }
    }

    /// Process `items` in order
    pub async fn run_batch(&self, items: &[Value], cancel: &CancellationToken) -> BatchResult {
        let mut result = BatchResult::default();

        for (index, value) in items.iter().enumerate() {
            match self.process_item(value, cancel).await {
                Ok(()) => result.record_queued(),
                Err(e) => {
                    error!("Batch item {} skipped: {}", index + 1, e);
                    result.record_skipped(e.to_string());
                }
            }
        }

        info!(
            "Batch finished: {} queued, {} skipped ({} dispatch)",
            result.queued,
            result.skipped,
            self.policy()
        );
        result
    }

    async fn process_item(&self, value: &Value, cancel: &CancellationToken) -> Result<(), BatchItemError> {
        let raw = value.to_string();
        let request = BatchItem::from_value(value).to_request(&raw)?;

        let media = self.lookup(request.media_ref()).await?;
        let kind = request.kind();
        let video_path = self.mapper.map(&media.video_path, kind);

        let (source_path, request) = match request.explicit_source_path() {
            Some(path) => (path.to_path_buf(), request.clone()),
            None => self.resolve_source(&request, &media, &video_path)?,
        };

        let unit = WorkUnit {
            request,
            source_path,
            media: MediaItem { video_path, ..media },
            settings: self.settings.clone(),
        };

        match &self.dispatcher {
            Dispatcher::Inline => {
                self.orchestrator
                    .run(&unit.request, &unit.source_path, &unit.media, &unit.settings, cancel)
                    .await?;
                Ok(())
            }
            Dispatcher::Queue(queue) => queue.enqueue(unit).map_err(BatchItemError::Dispatch),
        }
    }

    async fn lookup(&self, media_ref: MediaRef) -> Result<MediaItem, BatchItemError> {
        let id = media_ref.lookup_id();
        let found = match media_ref {
            MediaRef::Episode { episode_id, .. } => self.catalog.episode(episode_id).await,
            MediaRef::Movie { movie_id } => self.catalog.movie(movie_id).await,
        }
        .map_err(|e| BatchItemError::Catalog(format!("{:#}", e)))?;

        found.ok_or(BatchItemError::MediaNotFound {
            kind: media_ref.kind().api_name(),
            id,
        })
    }

    /// Resolve the source subtitle; the resolved language replaces the
    /// requested one downstream
    fn resolve_source(
        &self,
        request: &TranslationRequest,
        media: &MediaItem,
        video_path: &std::path::Path,
    ) -> Result<(PathBuf, TranslationRequest), BatchItemError> {
        let kind = request.kind();
        let resolution = self
            .resolver
            .resolve(&media.subtitles, request.source_language(), video_path, kind)
            .map_err(|_| BatchItemError::NoSubtitle {
                kind: match kind {
                    MediaKind::Episode => "episode",
                    MediaKind::Movie => "movie",
                },
                id: request.media_ref().lookup_id(),
                language: request.source_language().to_string(),
            })?;

        if !resolution.is_exact() {
            info!(
                "Using '{}' as source language instead of '{}'",
                resolution.language,
                request.source_language()
            );
        }
        let request = request.with_source_language(&resolution.language);
        Ok((resolution.path, request))
    }
}
