/*!
 * Wire types and job state for the remote translation service.
 */

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ServiceError;
use crate::language_utils;
use crate::translation::request::MediaKind;

/// One positional line, sent to and returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedLine {
    /// 0-based index of the cue in the source file
    pub position: i64,
    /// Cue text
    pub line: String,
}

impl TranslatedLine {
    /// Number source lines 0..n
    pub fn from_lines(lines: &[String]) -> Vec<Self> {
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| Self { position: i as i64, line: line.clone() })
            .collect()
    }
}

/// Validate a service result: it must be a list whose every element is a
/// `{position, line}` record. One bad element rejects the whole list.
pub fn parse_lines(value: &Value) -> Result<Vec<TranslatedLine>, ServiceError> {
    let items = value
        .as_array()
        .ok_or_else(|| ServiceError::MalformedResponse(format!("expected a list, got {}", value)))?;

    items
        .iter()
        .map(|item| {
            let position = item.get("position").and_then(Value::as_i64);
            let line = item.get("line").and_then(Value::as_str);
            match (position, line) {
                (Some(position), Some(line)) => Ok(TranslatedLine { position, line: line.to_string() }),
                _ => Err(ServiceError::MalformedResponse(format!("invalid line record: {}", item))),
            }
        })
        .collect()
}

/// How much hidden reasoning the service's model may spend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    /// No reasoning
    #[default]
    Disabled,
    /// 1000 tokens
    Low,
    /// 2000 tokens
    Medium,
    /// 4000 tokens
    High,
}

impl ReasoningEffort {
    /// Token budget, `None` when disabled
    pub fn max_tokens(self) -> Option<u32> {
        match self {
            ReasoningEffort::Disabled => None,
            ReasoningEffort::Low => Some(1000),
            ReasoningEffort::Medium => Some(2000),
            ReasoningEffort::High => Some(4000),
        }
    }

    /// Payload object, `None` serializes as `null`
    pub fn to_config(self) -> Option<ReasoningConfig> {
        self.max_tokens().map(|max_tokens| ReasoningConfig { enabled: true, max_tokens })
    }
}

impl std::str::FromStr for ReasoningEffort {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(ReasoningEffort::Disabled),
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            _ => Err(anyhow::anyhow!("Invalid reasoning effort: {}", s)),
        }
    }
}

/// Reasoning section of the request payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasoningConfig {
    /// Always true when present
    pub enabled: bool,
    /// Token budget
    pub max_tokens: u32,
}

/// Per-call translator settings, passed explicitly into each translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatorSettings {
    /// Key forwarded to the service's model provider
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Concurrency hint for the service
    pub max_concurrent_jobs: u32,
    /// Reasoning budget
    pub reasoning: ReasoningEffort,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: String::new(),
            temperature: 0.3,
            max_concurrent_jobs: 2,
            reasoning: ReasoningEffort::Disabled,
        }
    }
}

/// What the service is told about the media being translated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationMetadata {
    /// Series id for episodes, movie id for movies
    pub media_id: i64,
    /// Human-readable title
    pub title: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Episode or movie
    pub kind: MediaKind,
}

/// `config` section of the request payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadConfig {
    /// API key
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Temperature
    pub temperature: f32,
    /// Concurrency hint
    pub max_concurrent_jobs: u32,
    /// Reasoning object or null
    pub reasoning: Option<ReasoningConfig>,
}

/// Body of both the job submission and the synchronous endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationPayload {
    /// Series id for episodes, movie id for movies
    pub arr_media_id: i64,
    /// Title
    pub title: String,
    /// Source code, in the service's spelling
    pub source_language: String,
    /// Target code, in the service's spelling
    pub target_language: String,
    /// "Episode" or "Movie"
    pub media_type: &'static str,
    /// Lines to translate
    pub lines: Vec<TranslatedLine>,
    /// Translator settings
    pub config: PayloadConfig,
}

impl TranslationPayload {
    /// Build the payload for `lines`
    pub fn build(lines: &[String], metadata: &TranslationMetadata, settings: &TranslatorSettings) -> Self {
        Self {
            arr_media_id: metadata.media_id,
            title: metadata.title.clone(),
            source_language: language_utils::to_service_code(&metadata.source_language),
            target_language: language_utils::to_service_code(&metadata.target_language),
            media_type: metadata.kind.api_name(),
            lines: TranslatedLine::from_lines(lines),
            config: PayloadConfig {
                api_key: settings.api_key.clone(),
                model: settings.model.clone(),
                temperature: settings.temperature,
                max_concurrent_jobs: settings.max_concurrent_jobs,
                reasoning: settings.reasoning.to_config(),
            },
        }
    }
}

/// Response to a job submission
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitResponse {
    /// Job id, string or number depending on the service version
    #[serde(rename = "jobId", default)]
    pub job_id: Option<Value>,
}

impl SubmitResponse {
    /// Non-empty job id, if any
    pub fn job_id(&self) -> Option<String> {
        match self.job_id.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Response to a job status poll. Only `status` decides whether the job is
/// terminal; the other fields are read loosely.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PollResponse {
    /// Raw status string
    #[serde(default)]
    pub status: Option<String>,
    /// Percent complete, number or numeric string
    #[serde(default)]
    pub progress: Option<Value>,
    /// Status text
    #[serde(default)]
    pub message: Option<Value>,
    /// Translated lines once completed
    #[serde(default)]
    pub result: Option<Value>,
    /// Error text once failed, any JSON shape
    #[serde(default)]
    pub error: Option<Value>,
}

impl PollResponse {
    /// Percent complete, if it reads as a number
    pub fn progress_percent(&self) -> Option<f64> {
        match self.progress.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
            _ => None,
        }
    }

    /// Status text, stringified when not a string
    pub fn message_text(&self) -> Option<String> {
        loose_text(self.message.as_ref())
    }

    /// Error text, stringified when not a string
    pub fn error_text(&self) -> Option<String> {
        loose_text(self.error.as_ref())
    }
}

fn loose_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Lifecycle of a remote job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not started
    Queued,
    /// Any non-terminal poll response
    Running,
    /// Finished
    Completed,
    /// Reported failure
    Failed,
    /// Cancelled on the service side
    Cancelled,
    /// No terminal status before the polling ceiling
    TimedOut,
}

impl JobStatus {
    /// Map a wire status; anything unrecognised counts as running
    pub fn from_wire(status: Option<&str>) -> Self {
        match status.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("queued") | Some("pending") => JobStatus::Queued,
            Some("completed") => JobStatus::Completed,
            Some("failed") => JobStatus::Failed,
            Some("cancelled") | Some("canceled") => JobStatus::Cancelled,
            _ => JobStatus::Running,
        }
    }

    /// Whether polling stops in this state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::TimedOut
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Local view of one remote job, owned by the call that submitted it
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationJob {
    /// Service-assigned id
    pub job_id: String,
    /// Current state
    pub status: JobStatus,
    /// 0..=100
    pub progress_percent: u8,
    /// Latest status text
    pub progress_message: String,
    /// Lines, once completed with a valid result
    pub result: Option<Vec<TranslatedLine>>,
    /// Failure description
    pub error: Option<String>,
    timed_out_after: Option<u64>,
}

impl TranslationJob {
    /// A freshly submitted job
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            progress_percent: 0,
            progress_message: String::new(),
            result: None,
            error: None,
            timed_out_after: None,
        }
    }

    /// Apply a poll response. Returns false, changing nothing, once terminal.
    pub fn apply(&mut self, response: &PollResponse) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = JobStatus::from_wire(response.status.as_deref());
        if let Some(progress) = response.progress_percent().filter(|p| p.is_finite()) {
            self.progress_percent = progress.clamp(0.0, 100.0).round() as u8;
        }
        if let Some(message) = response.message_text() {
            self.progress_message = message;
        }

        match self.status {
            JobStatus::Completed => match response.result.as_ref() {
                None | Some(Value::Null) => {}
                Some(value) => match parse_lines(value) {
                    Ok(lines) if !lines.is_empty() => self.result = Some(lines),
                    Ok(_) => {}
                    Err(e) => self.error = Some(e.to_string()),
                },
            },
            JobStatus::Failed => {
                self.error = Some(response.error_text().unwrap_or_else(|| "Unknown error".to_string()));
            }
            _ => {}
        }

        true
    }

    /// Stop waiting; no-op once terminal
    pub fn mark_timed_out(&mut self, secs: u64) {
        if !self.status.is_terminal() {
            self.status = JobStatus::TimedOut;
            self.timed_out_after = Some(secs);
        }
    }

    /// Final outcome, `None` while the job is still in flight
    pub fn outcome(&self) -> Option<Result<Vec<TranslatedLine>, ServiceError>> {
        let outcome = match self.status {
            JobStatus::Queued | JobStatus::Running => return None,
            JobStatus::Completed => match (&self.result, &self.error) {
                (Some(lines), _) => Ok(lines.clone()),
                (None, Some(error)) => Err(ServiceError::MalformedResponse(error.clone())),
                (None, None) => Err(ServiceError::JobFailed("Job completed but no result returned".to_string())),
            },
            JobStatus::Failed => Err(ServiceError::JobFailed(
                self.error.clone().unwrap_or_else(|| "Unknown error".to_string()),
            )),
            JobStatus::Cancelled => Err(ServiceError::JobCancelled),
            JobStatus::TimedOut => Err(ServiceError::TimedOut { secs: self.timed_out_after.unwrap_or(0) }),
        };
        Some(outcome)
    }
}
