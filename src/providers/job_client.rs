/*!
 * Client for the remote AI subtitle translation service.
 *
 * A translation is submitted as an asynchronous job and polled until it
 * reaches a terminal state. When the job endpoint is not available the
 * client falls back to the synchronous endpoint, retried with backoff on
 * rate limiting and server errors.
 */

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::TranslationBackend;
use super::models::{
    PollResponse, SubmitResponse, TranslatedLine, TranslationJob, TranslationMetadata,
    TranslationPayload, TranslatorSettings, parse_lines,
};
use super::retry::RetryPolicy;
use crate::app_config::TranslatorConfig;
use crate::errors::ServiceError;
use crate::progress::ProgressReporter;

/// Header shown next to job progress
pub const PROGRESS_HEADER: &str = "Translating subtitles with AI...";

const SUBMIT_PATH: &str = "/api/v1/jobs/translate/content";
const SYNC_PATH: &str = "/api/v1/translate/content";
const JOBS_PATH: &str = "/api/v1/jobs";

/// Per-request timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimeouts {
    /// Job submission
    pub submit: Duration,
    /// One status poll
    pub poll: Duration,
    /// Synchronous translation
    pub sync: Duration,
    /// Inspection endpoints
    pub status: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            submit: Duration::from_secs(30),
            poll: Duration::from_secs(10),
            sync: Duration::from_secs(1800),
            status: Duration::from_secs(10),
        }
    }
}

/// Polling cadence and ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause between polls
    pub interval: Duration,
    /// Give up after this long without a terminal status
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(1800),
        }
    }
}

/// HTTP client for the translation service
#[derive(Clone)]
pub struct TranslationJobClient {
    base_url: String,
    client: Client,
    timeouts: ServiceTimeouts,
    poll: PollSettings,
    retry: RetryPolicy,
    progress: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for TranslationJobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationJobClient")
            .field("base_url", &self.base_url)
            .field("timeouts", &self.timeouts)
            .field("poll", &self.poll)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl TranslationJobClient {
    /// Create a client with default timeouts, polling and retry policy
    pub fn new(base_url: impl Into<String>, progress: Arc<dyn ProgressReporter>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();

        Self {
            base_url,
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            timeouts: ServiceTimeouts::default(),
            poll: PollSettings::default(),
            retry: RetryPolicy::default(),
            progress,
        }
    }

    /// Create a client from the translator configuration
    pub fn from_config(config: &TranslatorConfig, progress: Arc<dyn ProgressReporter>) -> Self {
        Self::new(config.url.clone(), progress)
            .with_timeouts(ServiceTimeouts {
                submit: Duration::from_secs(config.submit_timeout_secs),
                poll: Duration::from_secs(config.poll_timeout_secs),
                sync: Duration::from_secs(config.sync_timeout_secs),
                status: Duration::from_secs(config.status_timeout_secs),
            })
            .with_poll_settings(PollSettings {
                interval: Duration::from_secs(config.poll_interval_secs),
                max_wait: Duration::from_secs(config.max_wait_secs),
            })
            .with_retry_policy(RetryPolicy {
                attempts: config.retry_attempts,
                base_delay: Duration::from_millis(config.retry_backoff_ms),
                factor: 2,
                max_jitter: Duration::from_millis(config.retry_jitter_ms),
            })
    }

    /// Override request timeouts
    pub fn with_timeouts(mut self, timeouts: ServiceTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Override polling cadence and ceiling
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    /// Override the synchronous retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<String, ServiceError> {
        if self.base_url.is_empty() {
            return Err(ServiceError::ServiceUnavailable(
                "Translation service URL not configured".to_string(),
            ));
        }
        Ok(format!("{}{}", self.base_url, path))
    }

    /// Translate `lines`, preferring the job queue and falling back to the
    /// synchronous endpoint. Waiting stops early when `cancel` fires.
    pub async fn submit_and_await(
        &self,
        lines: &[String],
        metadata: &TranslationMetadata,
        settings: &TranslatorSettings,
        progress_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        let submit_url = self.url(SUBMIT_PATH)?;
        let payload = TranslationPayload::build(lines, metadata, settings);

        debug!("Submitting {} lines to the translation service", payload.lines.len());
        let response = self
            .client
            .post(&submit_url)
            .json(&payload)
            .timeout(self.timeouts.submit)
            .send()
            .await
            .map_err(|e| {
                error!("Translation service submission failed: {}", e);
                transport_error(e)
            })?;

        if response.status() != StatusCode::OK {
            debug!(
                "Job queue not available ({}), falling back to sync endpoint",
                response.status()
            );
            return tokio::select! {
                result = self.translate_sync(&payload) => result,
                _ = cancel.cancelled() => Err(ServiceError::Cancelled),
            };
        }

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;

        let job_id = submitted.job_id().ok_or_else(|| {
            error!("No jobId returned from translation service");
            ServiceError::MissingJobId
        })?;

        debug!("Translation job submitted: {}", job_id);
        self.await_job(TranslationJob::new(job_id), progress_id, cancel).await
    }

    /// Poll `job` until it is terminal, the ceiling is reached, or `cancel`
    /// fires. Failed polls are logged and retried on the next tick.
    async fn await_job(
        &self,
        mut job: TranslationJob,
        progress_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        let started = Instant::now();

        while started.elapsed() < self.poll.max_wait {
            if cancel.is_cancelled() {
                return self.abandon(&job, progress_id).await;
            }

            let polled = tokio::select! {
                _ = cancel.cancelled() => return self.abandon(&job, progress_id).await,
                polled = self.poll_once(&job.job_id) => polled,
            };

            match polled {
                Ok(response) => {
                    job.apply(&response);
                    self.progress.show_progress(
                        progress_id,
                        PROGRESS_HEADER,
                        &job.progress_message,
                        u64::from(job.progress_percent),
                        100,
                    );

                    if let Some(outcome) = job.outcome() {
                        self.progress.hide_progress(progress_id);
                        return self.report_outcome(&job, outcome);
                    }
                }
                Err(e) => warn!("Error polling job status for {}: {}", job.job_id, e),
            }

            tokio::select! {
                _ = cancel.cancelled() => return self.abandon(&job, progress_id).await,
                _ = tokio::time::sleep(self.poll.interval) => {}
            }
        }

        let secs = self.poll.max_wait.as_secs();
        job.mark_timed_out(secs);
        self.progress.hide_progress(progress_id);
        error!("Translation job {} timed out", job.job_id);
        self.progress
            .show_message(&format!("Translation timed out after {} minutes", secs / 60));

        job.outcome()
            .unwrap_or(Err(ServiceError::TimedOut { secs }))
    }

    fn report_outcome(
        &self,
        job: &TranslationJob,
        outcome: Result<Vec<TranslatedLine>, ServiceError>,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        match &outcome {
            Ok(lines) => debug!("Translation job {} returned {} lines", job.job_id, lines.len()),
            Err(ServiceError::JobCancelled) => info!("Translation job {} was cancelled", job.job_id),
            Err(ServiceError::JobFailed(reason)) => {
                error!("Translation job {} failed: {}", job.job_id, reason);
                self.progress.show_message(&format!("Translation failed: {}", reason));
            }
            Err(e) => error!("Translation job {} failed: {}", job.job_id, e),
        }
        outcome
    }

    async fn abandon(
        &self,
        job: &TranslationJob,
        progress_id: &str,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        self.progress.hide_progress(progress_id);
        info!("Stopped waiting for translation job {}", job.job_id);

        if let Err(e) = self.cancel_job(&job.job_id).await {
            debug!("Unable to cancel remote job {}: {}", job.job_id, e);
        }
        Err(ServiceError::Cancelled)
    }

    async fn poll_once(&self, job_id: &str) -> Result<PollResponse, ServiceError> {
        let url = self.url(&format!("{}/{}", JOBS_PATH, job_id))?;
        let response = self
            .client
            .get(&url)
            .timeout(self.timeouts.poll)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() != StatusCode::OK {
            return Err(ServiceError::Api {
                status: response.status().as_u16(),
                message: "Error getting job status".to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }

    async fn translate_sync(
        &self,
        payload: &TranslationPayload,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        self.retry.run(|| self.sync_attempt(payload)).await.inspect_err(|e| {
            error!("Synchronous translation failed: {}", e);
        })
    }

    async fn sync_attempt(
        &self,
        payload: &TranslationPayload,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        let url = self.url(SYNC_PATH)?;
        let response = self
            .client
            .post(&url)
            .json(payload)
            .timeout(self.timeouts.sync)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::OK {
            let body: Value = response
                .json()
                .await
                .map_err(|e| ServiceError::MalformedResponse(e.to_string()))?;
            return parse_lines(&body);
        }

        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ServiceError::RateLimited(message))
        } else if status.is_server_error() {
            Err(ServiceError::ServerError { status: status.as_u16() })
        } else {
            Err(ServiceError::Api { status: status.as_u16(), message })
        }
    }

    // =========================================================================
    // Service inspection
    // =========================================================================

    /// `GET /api/v1/status`
    pub async fn status(&self) -> Result<Value, ServiceError> {
        self.inspect(Method::GET, "/api/v1/status").await
    }

    /// `GET /api/v1/jobs`
    pub async fn list_jobs(&self) -> Result<Value, ServiceError> {
        self.inspect(Method::GET, JOBS_PATH).await
    }

    /// `GET /api/v1/jobs/{id}`
    pub async fn get_job(&self, job_id: &str) -> Result<Value, ServiceError> {
        self.inspect(Method::GET, &format!("{}/{}", JOBS_PATH, job_id))
            .await
            .map_err(not_found_as_missing_job)
    }

    /// `DELETE /api/v1/jobs/{id}`
    pub async fn cancel_job(&self, job_id: &str) -> Result<Value, ServiceError> {
        self.inspect(Method::DELETE, &format!("{}/{}", JOBS_PATH, job_id))
            .await
            .map_err(not_found_as_missing_job)
    }

    /// `GET /api/v1/models`
    pub async fn models(&self) -> Result<Value, ServiceError> {
        self.inspect(Method::GET, "/api/v1/models").await
    }

    /// `GET /api/v1/config`
    pub async fn service_config(&self) -> Result<Value, ServiceError> {
        self.inspect(Method::GET, "/api/v1/config").await
    }

    async fn inspect(&self, method: Method, path: &str) -> Result<Value, ServiceError> {
        let url = self.url(path)?;
        let response = self
            .client
            .request(method, &url)
            .timeout(self.timeouts.status)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api { status: status.as_u16(), message });
        }

        let body = response.text().await.map_err(transport_error)?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl TranslationBackend for TranslationJobClient {
    async fn translate(
        &self,
        lines: &[String],
        metadata: &TranslationMetadata,
        settings: &TranslatorSettings,
        progress_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TranslatedLine>, ServiceError> {
        self.submit_and_await(lines, metadata, settings, progress_id, cancel).await
    }
}

fn transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_timeout() {
        ServiceError::ServiceUnavailable(format!("request timed out: {}", e))
    } else {
        ServiceError::ServiceUnavailable(e.to_string())
    }
}

fn not_found_as_missing_job(e: ServiceError) -> ServiceError {
    match e {
        ServiceError::Api { status: 404, .. } => ServiceError::Api {
            status: 404,
            message: "Job not found".to_string(),
        },
        other => other,
    }
}
