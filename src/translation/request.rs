/*!
 * Translation requests and batch wire types.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::BatchItemError;

/// Kind of media a subtitle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Series episode
    Episode,
    /// Movie
    Movie,
}

impl MediaKind {
    /// Storage and batch spelling
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Episode => "episode",
            MediaKind::Movie => "movie",
        }
    }

    /// Spelling expected by the translation service
    pub fn api_name(self) -> &'static str {
        match self {
            MediaKind::Episode => "Episode",
            MediaKind::Movie => "Movie",
        }
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "episode" | "series" => Ok(MediaKind::Episode),
            "movie" | "movies" => Ok(MediaKind::Movie),
            _ => Err(anyhow!("Invalid media kind: {}", s)),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog identifiers of the media item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaRef {
    /// Episode of a series
    Episode {
        /// Series id
        series_id: i64,
        /// Episode id
        episode_id: i64,
    },
    /// Movie
    Movie {
        /// Movie id
        movie_id: i64,
    },
}

impl MediaRef {
    /// Kind matching this reference
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaRef::Episode { .. } => MediaKind::Episode,
            MediaRef::Movie { .. } => MediaKind::Movie,
        }
    }

    /// Id the catalog is queried with
    pub fn lookup_id(&self) -> i64 {
        match *self {
            MediaRef::Episode { episode_id, .. } => episode_id,
            MediaRef::Movie { movie_id } => movie_id,
        }
    }

    /// `(series_id, episode_id, movie_id)` for history rows
    pub fn history_ids(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match *self {
            MediaRef::Episode { series_id, episode_id } => (Some(series_id), Some(episode_id), None),
            MediaRef::Movie { movie_id } => (None, None, Some(movie_id)),
        }
    }
}

/// One validated translation request; immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    media_ref: MediaRef,
    source_language: String,
    target_language: String,
    forced: bool,
    hearing_impaired: bool,
    explicit_source_path: Option<PathBuf>,
}

impl TranslationRequest {
    /// Build a request. Language codes are trimmed and lower-cased.
    pub fn new(
        media_ref: MediaRef,
        source_language: &str,
        target_language: &str,
        forced: bool,
        hearing_impaired: bool,
        explicit_source_path: Option<PathBuf>,
    ) -> Self {
        Self {
            media_ref,
            source_language: source_language.trim().to_lowercase(),
            target_language: target_language.trim().to_lowercase(),
            forced,
            hearing_impaired,
            explicit_source_path,
        }
    }

    /// Copy of this request with another source language
    pub fn with_source_language(&self, language: &str) -> Self {
        Self {
            source_language: language.trim().to_lowercase(),
            ..self.clone()
        }
    }

    /// Episode or movie
    pub fn kind(&self) -> MediaKind {
        self.media_ref.kind()
    }

    /// Catalog identifiers
    pub fn media_ref(&self) -> MediaRef {
        self.media_ref
    }

    /// Source language code
    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    /// Target language code
    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Forced variant requested
    pub fn forced(&self) -> bool {
        self.forced
    }

    /// Hearing-impaired variant requested
    pub fn hearing_impaired(&self) -> bool {
        self.hearing_impaired
    }

    /// Source subtitle chosen by the caller, bypassing resolution
    pub fn explicit_source_path(&self) -> Option<&Path> {
        self.explicit_source_path.as_deref()
    }

    /// Language tag of the produced subtitle, e.g. `fr:hi`
    pub fn target_tag(&self) -> String {
        if self.hearing_impaired {
            format!("{}:hi", self.target_language)
        } else if self.forced {
            format!("{}:forced", self.target_language)
        } else {
            self.target_language.clone()
        }
    }

    /// `<video dir>/<video stem>.<target>[.hi][.forced].srt`
    pub fn destination_path(&self, video_path: &Path) -> PathBuf {
        let stem = video_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut name = format!("{}.{}", stem, self.target_language);
        if self.hearing_impaired {
            name.push_str(".hi");
        }
        if self.forced {
            name.push_str(".forced");
        }
        name.push_str(".srt");

        match video_path.parent() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

/// One element of a batch request, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// `episode` or `movie`
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    /// Series id, episodes only
    pub series_id: Option<i64>,
    /// Episode id, episodes only
    pub episode_id: Option<i64>,
    /// Movie id, movies only
    pub movie_id: Option<i64>,
    /// Requested source language
    pub source_language: Option<String>,
    /// Target language
    pub target_language: Option<String>,
    /// Source subtitle to use instead of resolving one
    pub subtitle_path: Option<String>,
    /// Forced variant
    pub forced: bool,
    /// Hearing-impaired variant
    pub hi: bool,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn present_id(value: Option<i64>) -> Option<i64> {
    value.filter(|id| *id != 0)
}

/// First of `keys` holding a value other than null
fn field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .find(|v| !v.is_null())
}

fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    field(value, keys).and_then(Value::as_str).map(str::to_string)
}

/// Integer ids, also when sent as numeric strings
fn id_field(value: &Value, keys: &[&str]) -> Option<i64> {
    match field(value, keys)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Truthy flags; null and absent mean false
fn flag_field(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !matches!(s.trim().to_lowercase().as_str(), "" | "false" | "0" | "no"),
        _ => false,
    }
}

impl BatchItem {
    /// Read an item field by field. Wrongly typed fields count as absent
    /// and never hide the others.
    pub fn from_value(value: &Value) -> Self {
        Self {
            item_type: text_field(value, &["type"]),
            series_id: id_field(value, &["seriesId", "sonarrSeriesId"]),
            episode_id: id_field(value, &["episodeId", "sonarrEpisodeId"]),
            movie_id: id_field(value, &["movieId", "radarrId"]),
            source_language: text_field(value, &["sourceLanguage"]),
            target_language: text_field(value, &["targetLanguage"]),
            subtitle_path: text_field(value, &["subtitlePath"]),
            forced: flag_field(value, "forced"),
            hi: flag_field(value, "hi"),
        }
    }

    /// Validate the item into a request. `raw` is the item as received and
    /// is quoted in the missing-fields error.
    pub fn to_request(&self, raw: &str) -> Result<TranslationRequest, BatchItemError> {
        let (Some(item_type), Some(source), Some(target)) = (
            present(&self.item_type),
            present(&self.source_language),
            present(&self.target_language),
        ) else {
            return Err(BatchItemError::MissingFields(raw.to_string()));
        };

        let media_ref = match item_type {
            "episode" => match (present_id(self.series_id), present_id(self.episode_id)) {
                (Some(series_id), Some(episode_id)) => MediaRef::Episode { series_id, episode_id },
                _ => return Err(BatchItemError::MissingIds("seriesId or episodeId")),
            },
            "movie" => match present_id(self.movie_id) {
                Some(movie_id) => MediaRef::Movie { movie_id },
                None => return Err(BatchItemError::MissingIds("movieId")),
            },
            other => return Err(BatchItemError::InvalidType(other.to_string())),
        };

        Ok(TranslationRequest::new(
            media_ref,
            source,
            target,
            self.forced,
            self.hi,
            present(&self.subtitle_path).map(PathBuf::from),
        ))
    }
}

/// Aggregated outcome of a batch, in input order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Items handed to translation
    pub queued: usize,
    /// Items that were not
    pub skipped: usize,
    /// One message per failed item
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Count a queued item
    pub fn record_queued(&mut self) {
        self.queued += 1;
    }

    /// Count a skipped item and keep its error text
    pub fn record_skipped(&mut self, error: impl Into<String>) {
        self.skipped += 1;
        self.errors.push(error.into());
    }
}
