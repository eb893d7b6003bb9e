use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::detection;
use crate::providers::models::TranslatedLine;

// @module: Subtitle parsing, plain-text extraction and splicing

// @const: SRT timestamp regex, comma or dot before the milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .unwrap()
});

// @const: HTML-style tags and ASS override blocks
static FORMATTING_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>|\{[^}]*\}").unwrap());

/// Gap between the last cue and the provenance marker, in ms
const MARKER_OFFSET_MS: u64 = 1_000;

/// Duration of the provenance marker, in ms
const MARKER_DURATION_MS: u64 = 5_000;

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text, cue lines joined by '\n'
    pub text: String,
}

impl SubtitleEntry {
    /// Creates a new subtitle entry
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    /// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
    pub fn format_timestamp(ms: u64) -> String {
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let seconds = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
    }

    /// Text without formatting tags, cue line breaks kept
    pub fn plain_text(&self) -> String {
        self.text
            .lines()
            .map(|line| FORMATTING_REGEX.replace_all(line, "").trim().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(
            f,
            "{} --> {}",
            Self::format_timestamp(self.start_time_ms),
            Self::format_timestamp(self.end_time_ms)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Collection of subtitle entries loaded from one file
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Entries in file order
    pub entries: Vec<SubtitleEntry>,
}

impl SubtitleCollection {
    /// Create an empty collection
    pub fn new(source_file: PathBuf) -> Self {
        SubtitleCollection {
            source_file,
            entries: Vec::new(),
        }
    }

    /// Load an SRT file, decoding it with the sniffed byte encoding
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read subtitle file: {:?}", path))?;

        let (content, encoding) = detection::decode(&bytes);
        debug!("Decoded {:?} as {}", path, encoding.name());

        Ok(SubtitleCollection {
            source_file: path.to_path_buf(),
            entries: Self::parse_srt_string(&content),
        })
    }

    /// Plain text of every entry, in order. Index `i` is position `i`.
    pub fn plain_texts(&self) -> Vec<String> {
        self.entries.iter().map(SubtitleEntry::plain_text).collect()
    }

    /// Replace entry texts by position. Positions outside the collection and
    /// empty lines are ignored, so those entries keep their original text.
    /// Returns the number of replaced entries.
    pub fn splice(&mut self, translated: &[TranslatedLine]) -> usize {
        let mut replaced = 0;

        for item in translated {
            if item.line.is_empty() {
                continue;
            }

            let entry = usize::try_from(item.position)
                .ok()
                .and_then(|index| self.entries.get_mut(index));

            match entry {
                Some(entry) => {
                    entry.text = item.line.clone();
                    replaced += 1;
                }
                None => warn!("Ignoring translated line at unknown position {}", item.position),
            }
        }

        replaced
    }

    /// Append a final cue starting shortly after the last one
    pub fn append_marker(&mut self, text: &str) {
        let start = self
            .entries
            .iter()
            .map(|entry| entry.end_time_ms)
            .max()
            .map_or(0, |end| end + MARKER_OFFSET_MS);

        self.entries.push(SubtitleEntry::new(
            self.entries.len() + 1,
            start,
            start + MARKER_DURATION_MS,
            text.to_string(),
        ));
    }

    /// Render the collection as SRT, renumbering entries sequentially
    pub fn to_srt_string(&self) -> String {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| SubtitleEntry { seq_num: i + 1, ..entry.clone() }.to_string())
            .collect()
    }

    /// Parse SRT content. Empty or cue-less content yields no entries;
    /// blocks without a valid timing line are skipped.
    pub fn parse_srt_string(content: &str) -> Vec<SubtitleEntry> {
        let content = content.trim_start_matches('\u{feff}');
        let mut entries = Vec::new();

        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text: Vec<&str> = Vec::new();

        let mut flush = |seq: Option<usize>, times: Option<(u64, u64)>, text: &mut Vec<&str>| {
            if let Some((start_ms, end_ms)) = times {
                let seq_num = seq.unwrap_or(entries.len() + 1);
                entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, text.join("\n")));
            } else if !text.is_empty() {
                warn!("Skipping subtitle block without timing: {:?}", text.first());
            }
            text.clear();
        };

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if current_times.is_some() || !current_text.is_empty() {
                    flush(current_seq_num.take(), current_times.take(), &mut current_text);
                }
                current_seq_num = None;
                continue;
            }

            if current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_times = Some((Self::captures_to_ms(&caps, 1), Self::captures_to_ms(&caps, 5)));
                    continue;
                }
                if current_seq_num.is_none() && current_text.is_empty() {
                    if let Ok(num) = trimmed.parse::<usize>() {
                        current_seq_num = Some(num);
                        continue;
                    }
                }
            }

            current_text.push(trimmed);
        }

        if current_times.is_some() || !current_text.is_empty() {
            flush(current_seq_num, current_times, &mut current_text);
        }

        entries
    }

    fn captures_to_ms(caps: &regex::Captures, start_idx: usize) -> u64 {
        let part = |offset: usize| -> u64 {
            caps.get(start_idx + offset)
                .map_or(0, |m| m.as_str().parse().unwrap_or(0))
        };

        (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3)
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Entries: {}", self.entries.len())?;
        Ok(())
    }
}
