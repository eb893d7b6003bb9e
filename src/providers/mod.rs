/*!
 * Translation backends.
 *
 * The orchestrator talks to a `TranslationBackend`. The production backend
 * is the HTTP job client for the remote AI translation service; tests use
 * the mock backend.
 */

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::ServiceError;

pub mod job_client;
pub mod mock;
pub mod models;
pub mod retry;

pub use job_client::{PollSettings, ServiceTimeouts, TranslationJobClient};
pub use models::{TranslatedLine, TranslationMetadata, TranslatorSettings};
pub use retry::RetryPolicy;

/// Something that turns source lines into positional translated lines
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Translate `lines`. Progress is reported under `progress_id`; waiting
    /// stops with `ServiceError::Cancelled` once `cancel` fires.
    async fn translate(
        &self,
        lines: &[String],
        metadata: &TranslationMetadata,
        settings: &TranslatorSettings,
        progress_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranslatedLine>, ServiceError>;
}
