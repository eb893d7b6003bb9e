// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use subrelay::app_config::{Config, LogLevel};
use subrelay::app_controller::{Controller, ServiceQuery};
use subrelay::progress::ConsoleProgress;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate a batch of episodes and movies described in a JSON file
    Batch {
        /// JSON file with a list of items, or an object with an "items" list
        #[arg(value_name = "ITEMS_JSON")]
        items: PathBuf,
    },

    /// Show the translation service status
    Status,

    /// List jobs known to the translation service
    Jobs,

    /// Show one translation job
    Job {
        /// Job id
        id: String,
    },

    /// Cancel a translation job
    Cancel {
        /// Job id
        id: String,
    },

    /// List models offered by the translation service
    Models,

    /// Show the translation service configuration
    ServiceConfig,

    /// Generate shell completions for subrelay
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subrelay - AI subtitle translation relay
///
/// Picks the best existing subtitle for each requested episode or movie and
/// translates it through a remote AI subtitle translation service.
#[derive(Parser, Debug)]
#[command(name = "subrelay")]
#[command(version)]
#[command(about = "Relay subtitle translations to an AI translation service")]
#[command(long_about = "subrelay resolves a source subtitle for each item of a batch and translates it
through a remote AI subtitle translation service.

EXAMPLES:
    subrelay batch items.json                  # Translate every item in items.json
    subrelay --log-level debug batch items.json
    subrelay status                            # Check the translation service
    subrelay jobs                              # List service jobs
    subrelay cancel 3f2a                       # Cancel a service job
    subrelay completions bash > subrelay.bash  # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set via max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "subrelay", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = cli.log_level {
        log::set_max_level(LogLevel::from(level).to_level_filter());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight translations");
            ctrl_c_token.cancel();
        }
    });

    let controller = Controller::with_config(config, Arc::new(ConsoleProgress::new()), cancel)?;

    let query = match cli.command {
        Commands::Batch { items } => {
            let items = Controller::load_items(&items)?;
            info!("Processing {} batch items", items.len());
            let result = controller.run_batch(&items).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            return Ok(());
        }
        Commands::Status => ServiceQuery::Status,
        Commands::Jobs => ServiceQuery::Jobs,
        Commands::Job { id } => ServiceQuery::Job(id),
        Commands::Cancel { id } => ServiceQuery::CancelJob(id),
        Commands::Models => ServiceQuery::Models,
        Commands::ServiceConfig => ServiceQuery::Config,
        Commands::Completions { .. } => return Ok(()),
    };

    match controller.query_service(query).await {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e.into())
        }
    }
}
