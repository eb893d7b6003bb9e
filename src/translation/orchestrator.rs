/*!
 * End-to-end translation of one media item.
 *
 * Loads the resolved source subtitle, sends its plain text to the
 * translation backend, splices the result back by position, persists the
 * new file atomically and records a history entry.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info};
use tokio_util::sync::CancellationToken;

use super::request::TranslationRequest;
use crate::catalog::{HistoryAction, HistoryRecord, HistoryRecorder, MediaItem};
use crate::errors::TranslateError;
use crate::file_utils::{FileManager, PROVENANCE_MARKER};
use crate::language_utils::display_name;
use crate::progress::ProgressReporter;
use crate::providers::{TranslationBackend, TranslationMetadata, TranslatorSettings};
use crate::subtitle_processor::SubtitleCollection;

/// Progress id of the translation writing `destination`
pub fn progress_id(destination: &Path) -> String {
    format!("translate_progress_{}", destination.display())
}

/// Drives a single translation from source file to recorded result
pub struct TranslationOrchestrator {
    backend: Arc<dyn TranslationBackend>,
    history: Arc<dyn HistoryRecorder>,
    progress: Arc<dyn ProgressReporter>,
}

impl TranslationOrchestrator {
    /// Create an orchestrator over the given collaborators
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        history: Arc<dyn HistoryRecorder>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self { backend, history, progress }
    }

    /// Translate `source_path` for `media` and return the written subtitle.
    ///
    /// `media.video_path` must already be locally reachable; the output is
    /// written next to it. A source without cues returns the destination
    /// without writing anything. On failure nothing is written and no
    /// history is recorded.
    pub async fn run(
        &self,
        request: &TranslationRequest,
        source_path: &Path,
        media: &MediaItem,
        settings: &TranslatorSettings,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, TranslateError> {
        let destination = request.destination_path(&media.video_path);
        let progress_id = progress_id(&destination);

        match self
            .translate(request, source_path, media, settings, &destination, &progress_id, cancel)
            .await
        {
            Ok(()) => Ok(destination),
            Err(e) => {
                error!("Error during AI translation of {:?}: {}", source_path, e);
                self.progress.show_message(&format!("AI translation failed: {}", e));
                self.progress.hide_progress(&progress_id);
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn translate(
        &self,
        request: &TranslationRequest,
        source_path: &Path,
        media: &MediaItem,
        settings: &TranslatorSettings,
        destination: &Path,
        progress_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), TranslateError> {
        let mut subtitles = SubtitleCollection::load(source_path).map_err(|e| TranslateError::Source {
            path: source_path.to_path_buf(),
            reason: format!("{:#}", e),
        })?;

        let lines = subtitles.plain_texts();
        if lines.is_empty() {
            debug!("No lines to translate in {:?}", source_path);
            return Ok(());
        }

        debug!("Starting AI translation of {} lines from {:?}", lines.len(), source_path);
        let metadata = TranslationMetadata {
            media_id: media.media_id,
            title: media.title.clone(),
            source_language: request.source_language().to_string(),
            target_language: request.target_language().to_string(),
            kind: request.kind(),
        };

        let translated = self
            .backend
            .translate(&lines, &metadata, settings, progress_id, cancel)
            .await?;

        let replaced = subtitles.splice(&translated);
        debug!("Replaced {}/{} lines, saving to {:?}", replaced, lines.len(), destination);
        subtitles.append_marker(PROVENANCE_MARKER);

        if let Err(e) = FileManager::write_atomic(destination, &subtitles.to_srt_string()) {
            error!("Unable to save translated subtitles to {:?}: {:#}", destination, e);
            self.progress.show_message(&format!(
                "Translation failed: Unable to save translated subtitles to {}",
                destination.display()
            ));
            return Err(TranslateError::Persist {
                path: destination.to_path_buf(),
                reason: format!("{:#}", e),
            });
        }

        let description = format!(
            "{} subtitles translated to {} using AI Subtitle Translator.",
            display_name(request.source_language()),
            display_name(request.target_language())
        );
        let (series_id, episode_id, movie_id) = request.media_ref().history_ids();
        let entry = HistoryRecord::new(
            request.kind(),
            series_id,
            episode_id,
            movie_id,
            HistoryAction::Translated,
            request.target_tag(),
            request.source_language().to_string(),
            request.target_language().to_string(),
            description.clone(),
            media.video_path.to_string_lossy().into_owned(),
            destination.to_string_lossy().into_owned(),
        );
        self.history
            .record(entry)
            .await
            .map_err(|e| TranslateError::History(format!("{:#}", e)))?;

        info!("{} ({:?})", description, destination);
        Ok(())
    }
}
