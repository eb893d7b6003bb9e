/*!
 * Error types for the subrelay library.
 *
 * This module contains custom error types for the different stages of a
 * translation: talking to the remote service, locating a source subtitle,
 * producing the translated file and processing batch items.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when talking to the remote translation service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The service could not be reached, timed out, or never recovered
    #[error("Translation service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP 429 from the synchronous endpoint
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// HTTP 5xx from the synchronous endpoint
    #[error("Server error: {status}")]
    ServerError {
        /// HTTP status code
        status: u16,
    },

    /// Any other non-success status; never retried
    #[error("API responded with error: {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// The response did not have the expected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The job endpoint accepted the submission but returned no job id
    #[error("No jobId returned from translation service")]
    MissingJobId,

    /// The remote job reached the `failed` state
    #[error("Translation job failed: {0}")]
    JobFailed(String),

    /// The remote job reached the `cancelled` state
    #[error("Translation job was cancelled")]
    JobCancelled,

    /// No terminal status was observed before the polling ceiling
    #[error("Translation timed out after {secs} seconds")]
    TimedOut {
        /// Ceiling that was reached, in seconds
        secs: u64,
    },

    /// The caller cancelled the wait
    #[error("Translation wait was cancelled by the caller")]
    Cancelled,
}

impl ServiceError {
    /// Whether the synchronous fallback should retry after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::ServerError { .. })
    }
}

/// Errors that can occur while locating a source subtitle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// Neither the catalog nor the filesystem produced a usable subtitle
    #[error("No subtitle found for language '{language}' near {video_path:?}")]
    NotFound {
        /// Requested source language
        language: String,
        /// Video whose surroundings were searched
        video_path: PathBuf,
    },
}

/// Errors that can occur while translating a single media item
#[derive(Error, Debug)]
pub enum TranslateError {
    /// The source subtitle could not be read or parsed
    #[error("Unable to load source subtitle {path:?}: {reason}")]
    Source {
        /// Source subtitle path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// Error from the translation service
    #[error("Translation failed: {0}")]
    Service(#[from] ServiceError),

    /// The translated subtitle could not be written
    #[error("Unable to save translated subtitles to {path:?}: {reason}")]
    Persist {
        /// Destination path
        path: PathBuf,
        /// Underlying reason
        reason: String,
    },

    /// The history entry could not be recorded
    #[error("Unable to record history: {0}")]
    History(String),
}

/// Per-item failure inside a batch. The display text is what ends up in the
/// batch response.
#[derive(Error, Debug)]
pub enum BatchItemError {
    /// Item lacks its type or one of the languages
    #[error("Missing required fields in item: {0}")]
    MissingFields(String),

    /// Item type is neither `episode` nor `movie`
    #[error("Invalid type \"{0}\" in item")]
    InvalidType(String),

    /// Kind-specific identifiers are missing
    #[error("Missing {0}")]
    MissingIds(&'static str),

    /// Catalog has no such media item
    #[error("{kind} {id} not found")]
    MediaNotFound {
        /// "Episode" or "Movie"
        kind: &'static str,
        /// Catalog identifier
        id: i64,
    },

    /// No source subtitle could be resolved
    #[error("No subtitle found for {kind} {id} (requested source: {language})")]
    NoSubtitle {
        /// "episode" or "movie"
        kind: &'static str,
        /// Catalog identifier
        id: i64,
        /// Requested source language
        language: String,
    },

    /// The translation itself failed
    #[error("{0}")]
    Translate(#[from] TranslateError),

    /// The work unit could not be handed to the pending-job queue
    #[error("Unable to queue translation: {0}")]
    Dispatch(String),

    /// Catalog lookup failed
    #[error("Catalog error: {0}")]
    Catalog(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog database error
    #[error("Database error: {0}")]
    Database(String),

    /// Error from the translation service
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslateError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}
