/*!
 * Common test utilities for the subrelay test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use subrelay::progress::ProgressReporter;
use subrelay::providers::{PollSettings, RetryPolicy, TranslationJobClient, TranslationMetadata};
use subrelay::translation::MediaKind;

pub mod fake_service;

/// Three short cues
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
<i>It contains</i>
multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
";

/// Route library logs through the test harness; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, creating parent directories
pub fn create_test_file(dir: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates the sample subtitle file
pub fn create_test_subtitle(dir: &Path, relative: &str) -> Result<PathBuf> {
    create_test_file(dir, relative, SAMPLE_SRT)
}

/// Metadata for a movie translated from English to French
pub fn movie_metadata() -> TranslationMetadata {
    TranslationMetadata {
        media_id: 7,
        title: "Film".to_string(),
        source_language: "en".to_string(),
        target_language: "fr".to_string(),
        kind: MediaKind::Movie,
    }
}

/// Job client against `base_url` with fast polling and immediate retries
pub fn fast_client(base_url: &str, progress: Arc<dyn ProgressReporter>) -> TranslationJobClient {
    TranslationJobClient::new(base_url, progress)
        .with_poll_settings(PollSettings {
            interval: Duration::from_millis(20),
            max_wait: Duration::from_secs(5),
        })
        .with_retry_policy(RetryPolicy::immediate(3))
}
