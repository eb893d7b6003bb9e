/*!
 * Progress notifications.
 *
 * Translations report progress through `ProgressReporter`, keyed by a
 * per-translation id so concurrent items never overwrite each other.
 * All calls are fire-and-forget.
 */

use std::collections::HashMap;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;
use parking_lot::Mutex;

/// Receiver of progress updates
pub trait ProgressReporter: Send + Sync {
    /// Create or update the progress entry `id`
    fn show_progress(&self, id: &str, header: &str, name: &str, value: u64, count: u64);

    /// Remove the progress entry `id`; unknown ids are ignored
    fn hide_progress(&self, id: &str);

    /// Show a one-off message to the user
    fn show_message(&self, text: &str);
}

/// Progress bars on the terminal, one per id
pub struct ConsoleProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
    style: ProgressStyle,
}

impl ConsoleProgress {
    /// Create an empty console reporter
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {prefix} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
            style,
        }
    }

    /// Number of bars currently shown
    pub fn active(&self) -> usize {
        self.bars.lock().len()
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn show_progress(&self, id: &str, header: &str, name: &str, value: u64, count: u64) {
        let mut bars = self.bars.lock();
        let bar = bars.entry(id.to_string()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(count));
            bar.set_style(self.style.clone());
            bar.set_prefix(header.to_string());
            bar
        });

        bar.set_length(count);
        bar.set_position(value.min(count));
        bar.set_message(name.to_string());
    }

    fn hide_progress(&self, id: &str) {
        if let Some(bar) = self.bars.lock().remove(id) {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }

    fn show_message(&self, text: &str) {
        if self.multi.println(text).is_err() {
            info!("{}", text);
        }
    }
}

/// Reporter that only logs messages
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn show_progress(&self, _id: &str, _header: &str, _name: &str, _value: u64, _count: u64) {}

    fn hide_progress(&self, _id: &str) {}

    fn show_message(&self, text: &str) {
        info!("{}", text);
    }
}

/// One recorded progress call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// `show_progress` call
    Progress {
        /// Progress id
        id: String,
        /// Status text
        name: String,
        /// Current value
        value: u64,
        /// Total
        count: u64,
    },
    /// `hide_progress` call
    Hidden(String),
    /// `show_message` call
    Message(String),
}

/// Reporter that keeps every call, for inspection in tests
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Recorded user-facing messages
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Message(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn show_progress(&self, id: &str, _header: &str, name: &str, value: u64, count: u64) {
        self.events.lock().push(ProgressEvent::Progress {
            id: id.to_string(),
            name: name.to_string(),
            value,
            count,
        });
    }

    fn hide_progress(&self, id: &str) {
        self.events.lock().push(ProgressEvent::Hidden(id.to_string()));
    }

    fn show_message(&self, text: &str) {
        self.events.lock().push(ProgressEvent::Message(text.to_string()));
    }
}
