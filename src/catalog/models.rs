/*!
 * Catalog entity models.
 *
 * These structures map directly to database tables and provide
 * type-safe access to persisted data.
 */

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::stored::decode_stored_subtitles;
use crate::resolver::SubtitleCandidate;
use crate::translation::request::MediaKind;

/// History action codes shared with the media managers' history tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Subtitle downloaded by a provider
    Downloaded,
    /// Subtitle uploaded manually
    Uploaded,
    /// Subtitle translated
    Translated,
}

impl HistoryAction {
    /// Numeric code stored in the history table
    pub fn code(self) -> i64 {
        match self {
            HistoryAction::Downloaded => 1,
            HistoryAction::Uploaded => 4,
            HistoryAction::Translated => 6,
        }
    }

    /// Inverse of `code`
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(HistoryAction::Downloaded),
            4 => Some(HistoryAction::Uploaded),
            6 => Some(HistoryAction::Translated),
            _ => None,
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryAction::Downloaded => write!(f, "downloaded"),
            HistoryAction::Uploaded => write!(f, "uploaded"),
            HistoryAction::Translated => write!(f, "translated"),
        }
    }
}

/// Episode row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Episode identifier
    pub episode_id: i64,
    /// Owning series identifier
    pub series_id: i64,
    /// Series title
    pub series_title: String,
    /// Episode title
    pub title: String,
    /// Season number
    pub season: i64,
    /// Episode number within the season
    pub episode: i64,
    /// Video path as stored by the media manager
    pub path: String,
    /// Stored subtitle column, either encoding
    pub subtitles: Option<String>,
}

impl EpisodeRecord {
    /// Title sent to the translation service
    pub fn display_title(&self) -> String {
        format!(
            "{} - S{:02}E{:02} - {}",
            self.series_title, self.season, self.episode, self.title
        )
    }
}

/// Movie row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    /// Movie identifier
    pub movie_id: i64,
    /// Movie title
    pub title: String,
    /// Video path as stored by the media manager
    pub path: String,
    /// Stored subtitle column, either encoding
    pub subtitles: Option<String>,
}

/// What the translation pipeline needs to know about a media item
#[derive(Debug, Clone, PartialEq)]
pub struct MediaItem {
    /// Episode or movie
    pub kind: MediaKind,
    /// Series id for episodes, movie id for movies
    pub media_id: i64,
    /// Human-readable title
    pub title: String,
    /// Video path as stored
    pub video_path: PathBuf,
    /// Known subtitles, decoded
    pub subtitles: Vec<SubtitleCandidate>,
}

impl From<EpisodeRecord> for MediaItem {
    fn from(record: EpisodeRecord) -> Self {
        Self {
            kind: MediaKind::Episode,
            media_id: record.series_id,
            title: record.display_title(),
            video_path: PathBuf::from(&record.path),
            subtitles: decode_stored_subtitles(record.subtitles.as_deref()),
        }
    }
}

impl From<MovieRecord> for MediaItem {
    fn from(record: MovieRecord) -> Self {
        Self {
            kind: MediaKind::Movie,
            media_id: record.movie_id,
            title: record.title,
            video_path: PathBuf::from(&record.path),
            subtitles: decode_stored_subtitles(record.subtitles.as_deref()),
        }
    }
}

/// History row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Database ID, `None` before insertion
    pub id: Option<i64>,
    /// Episode or movie
    pub media_kind: MediaKind,
    /// Series identifier for episodes
    pub series_id: Option<i64>,
    /// Episode identifier for episodes
    pub episode_id: Option<i64>,
    /// Movie identifier for movies
    pub movie_id: Option<i64>,
    /// What happened
    pub action: HistoryAction,
    /// Resulting subtitle language tag, e.g. `fr:hi`
    pub language: String,
    /// Source language code
    pub source_language: String,
    /// Target language code
    pub target_language: String,
    /// Human-readable description
    pub description: String,
    /// Video the subtitle belongs to
    pub video_path: String,
    /// Subtitle that was written
    pub subtitle_path: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl HistoryRecord {
    /// Create a history record stamped with the current time
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        media_kind: MediaKind,
        series_id: Option<i64>,
        episode_id: Option<i64>,
        movie_id: Option<i64>,
        action: HistoryAction,
        language: String,
        source_language: String,
        target_language: String,
        description: String,
        video_path: String,
        subtitle_path: String,
    ) -> Self {
        Self {
            id: None,
            media_kind,
            series_id,
            episode_id,
            movie_id,
            action,
            language,
            source_language,
            target_language,
            description,
            video_path,
            subtitle_path,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
