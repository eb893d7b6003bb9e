/*!
 * Mock translation backend for testing.
 *
 * - `MockBackend::working()` prefixes every line with the target language
 * - `MockBackend::partial()` drops every other position
 * - `MockBackend::failing(err)` always returns `err`
 * - `MockBackend::empty()` returns no lines
 * - `MockBackend::slow(ms)` waits before answering, honouring cancellation
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::TranslationBackend;
use super::models::{TranslatedLine, TranslationMetadata, TranslatorSettings};
use crate::errors::ServiceError;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// `[target] line` for every position
    Working,
    /// Only even positions come back
    Partial,
    /// Always fails with this error
    Failing(ServiceError),
    /// Succeeds with no lines
    Empty,
    /// Working after a delay
    Slow {
        /// Delay before answering
        delay_ms: u64,
    },
}

/// One recorded `translate` call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// Lines sent
    pub lines: Vec<String>,
    /// Metadata sent
    pub metadata: TranslationMetadata,
    /// Progress id used
    pub progress_id: String,
}

/// Mock backend for exercising the orchestrator and batch flow
#[derive(Debug, Clone)]
pub struct MockBackend {
    behavior: MockBehavior,
    request_count: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<MockCall>>>,
    custom_response: Option<fn(usize, &str) -> String>,
}

impl MockBackend {
    /// Create a mock with the given behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Leaves odd positions untranslated
    pub fn partial() -> Self {
        Self::new(MockBehavior::Partial)
    }

    /// Always fails with `error`
    pub fn failing(error: ServiceError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Returns an empty list
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Replace the per-line translation
    pub fn with_custom_response(mut self, generator: fn(usize, &str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of `translate` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    fn render(&self, lines: &[String], target: &str, keep: impl Fn(usize) -> bool) -> Vec<TranslatedLine> {
        lines
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(*i))
            .map(|(i, line)| TranslatedLine {
                position: i as i64,
                line: match self.custom_response {
                    Some(generator) => generator(i, line),
                    None => format!("[{}] {}", target, line),
                },
            })
            .collect()
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    async fn translate(
        &self,
        lines: &[String],
        metadata: &TranslationMetadata,
        _settings: &TranslatorSettings,
        progress_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(MockCall {
            lines: lines.to_vec(),
            metadata: metadata.clone(),
            progress_id: progress_id.to_string(),
        });

        let target = metadata.target_language.as_str();
        match &self.behavior {
            MockBehavior::Working => Ok(self.render(lines, target, |_| true)),
            MockBehavior::Partial => Ok(self.render(lines, target, |i| i % 2 == 0)),
            MockBehavior::Failing(error) => Err(error.clone()),
            MockBehavior::Empty => Ok(Vec::new()),
            MockBehavior::Slow { delay_ms } => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(ServiceError::Cancelled),
                    _ = tokio::time::sleep(Duration::from_millis(*delay_ms)) => {
                        Ok(self.render(lines, target, |_| true))
                    }
                }
            }
        }
    }
}
