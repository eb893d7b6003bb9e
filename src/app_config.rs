use anyhow::{Context, Result, anyhow};
use log::{LevelFilter, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use url::Url;

use crate::path_mapping::{PathMappingRule, PathMappings};
use crate::providers::models::{ReasoningEffort, TranslatorSettings};
use crate::translation::DispatchPolicy;

/// Application configuration module
/// This module handles loading, validating and saving the JSON configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Remote translation service
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// Stored path to local path rewriting
    #[serde(default)]
    pub path_mappings: PathMappingConfig,

    /// Batch processing
    #[serde(default)]
    pub batch: BatchConfig,

    /// Catalog database location, platform data dir when absent
    #[serde(default)]
    pub database_path: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Remote translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TranslatorConfig {
    // @field: Service base URL
    #[serde(default = "default_service_url")]
    pub url: String,

    // @field: Key forwarded to the model provider
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature parameter for text generation (0.0 to 2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    // @field: Concurrency hint sent to the service
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: u32,

    // @field: Reasoning budget
    #[serde(default)]
    pub reasoning: ReasoningEffort,

    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,

    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    #[serde(default = "default_sync_timeout_secs")]
    pub sync_timeout_secs: u64,

    #[serde(default = "default_status_timeout_secs")]
    pub status_timeout_secs: u64,

    /// Pause between job status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up on a job after this long
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,

    /// Attempts for the synchronous endpoint, including the first
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Upper bound of the random extra delay
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,
}

impl TranslatorConfig {
    /// Per-call settings handed to each translation
    pub fn settings(&self) -> TranslatorSettings {
        TranslatorSettings {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_concurrent_jobs: self.max_concurrent_jobs,
            reasoning: self.reasoning,
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: default_temperature(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            reasoning: ReasoningEffort::default(),
            submit_timeout_secs: default_submit_timeout_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            sync_timeout_secs: default_sync_timeout_secs(),
            status_timeout_secs: default_status_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_wait_secs: default_max_wait_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
        }
    }
}

/// Path rewriting rules, separate for series and movies
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PathMappingConfig {
    #[serde(default)]
    pub series: Vec<PathMappingRule>,

    #[serde(default)]
    pub movies: Vec<PathMappingRule>,
}

impl PathMappingConfig {
    // @returns: Mapper built from the configured rules
    pub fn to_mappings(&self) -> PathMappings {
        PathMappings::new(self.series.clone(), self.movies.clone())
    }
}

/// Batch processing configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BatchConfig {
    // @field: Inline translation or queue hand-off
    #[serde(default)]
    pub dispatch: DispatchPolicy,

    // @field: Queue workers running at once
    #[serde(default = "default_queue_workers")]
    pub queue_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            dispatch: DispatchPolicy::default(),
            queue_workers: default_queue_workers(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_service_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_model() -> String {
    "google/gemini-2.5-flash-preview-05-20".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_concurrent_jobs() -> u32 {
    2
}

fn default_submit_timeout_secs() -> u64 {
    30
}

fn default_poll_timeout_secs() -> u64 {
    10
}

fn default_sync_timeout_secs() -> u64 {
    1800
}

fn default_status_timeout_secs() -> u64 {
    10
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_max_wait_secs() -> u64 {
    1800 // 30 minutes
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_retry_jitter_ms() -> u64 {
    1000
}

fn default_queue_workers() -> usize {
    2
}

impl Config {
    /// Load the configuration at `path`, writing a default one first when
    /// the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            return serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {:?}", path));
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;

        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let translator = &self.translator;

        if translator.url.trim().is_empty() {
            return Err(anyhow!("Translation service URL is required"));
        }
        let url = Url::parse(translator.url.trim())
            .with_context(|| format!("Invalid translation service URL: {}", translator.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("Translation service URL must use http or https: {}", url));
        }

        if !(0.0..=2.0).contains(&translator.temperature) {
            return Err(anyhow!(
                "Temperature must be between 0.0 and 2.0, got {}",
                translator.temperature
            ));
        }
        if translator.max_concurrent_jobs == 0 {
            return Err(anyhow!("max_concurrent_jobs must be at least 1"));
        }
        if translator.poll_interval_secs == 0 {
            return Err(anyhow!("poll_interval_secs must be at least 1"));
        }

        Ok(())
    }

    // @returns: Configured database path, if any
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deserialize_withPartialJson_shouldFillDefaults() {
        let config: Config = serde_json::from_str(
            r#"{"translator": {"url": "http://ai:3000", "reasoning": "high"}, "batch": {"dispatch": "queue"}}"#,
        )
        .unwrap();

        assert_eq!(config.translator.url, "http://ai:3000");
        assert_eq!(config.translator.reasoning, ReasoningEffort::High);
        assert_eq!(config.translator.poll_interval_secs, 2);
        assert_eq!(config.translator.max_wait_secs, 1800);
        assert_eq!(config.batch.dispatch, DispatchPolicy::Queue);
        assert_eq!(config.batch.queue_workers, 2);
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_shouldRejectBadValues() {
        let mut config = Config::default();
        config.translator.url = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.translator.url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.translator.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.translator.max_concurrent_jobs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.translator.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_loadOrCreate_withMissingFile_shouldWriteDefaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.json");

        let created = Config::load_or_create(&path).unwrap();
        assert!(path.exists());

        let loaded = Config::load_or_create(&path).unwrap();
        assert_eq!(loaded.translator, created.translator);
    }

    #[test]
    fn test_settings_shouldCarryTranslatorValues() {
        let mut config = TranslatorConfig::default();
        config.api_key = "k".to_string();
        config.reasoning = ReasoningEffort::Low;

        let settings = config.settings();
        assert_eq!(settings.api_key, "k");
        assert_eq!(settings.temperature, 0.3);
        assert_eq!(settings.reasoning, ReasoningEffort::Low);
    }
}
