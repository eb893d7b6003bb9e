use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::language_utils::{LanguageTag, UNDETERMINED};

// @module: Subtitle candidates and their ranking keys

/// Where a candidate was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Known to the media catalog
    Database,
    /// Found by scanning the video's surroundings
    Filesystem,
}

/// An existing subtitle that could serve as a translation source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCandidate {
    /// Lower-case two-letter code, or `und`
    pub language_code2: String,
    /// Stored path, before any path mapping
    pub path: PathBuf,
    /// Hearing-impaired variant
    pub hearing_impaired: bool,
    /// Forced variant
    pub forced: bool,
    /// Where the candidate came from
    pub origin: CandidateOrigin,
}

impl SubtitleCandidate {
    /// Build a candidate, returning `None` when the path is empty
    pub fn new(
        language_code2: &str,
        path: impl Into<PathBuf>,
        hearing_impaired: bool,
        forced: bool,
        origin: CandidateOrigin,
    ) -> Option<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return None;
        }

        let code = language_code2.trim().to_lowercase();
        Some(Self {
            language_code2: if code.is_empty() { UNDETERMINED.to_string() } else { code },
            path,
            hearing_impaired,
            forced,
            origin,
        })
    }

    /// Build a catalog candidate from a compact tag such as `en:hi`
    pub fn from_tag(tag: &str, path: impl Into<PathBuf>) -> Option<Self> {
        let tag = LanguageTag::parse(tag);
        Self::new(&tag.code, path, tag.hi, tag.forced, CandidateOrigin::Database)
    }

    /// Whether this candidate is in a widely understood source language
    pub fn is_common_language(&self) -> bool {
        matches!(self.language_code2.as_str(), "en" | "eng")
    }

    /// Exact pass ordering: plain < hi < forced
    pub fn exact_rank(&self) -> (bool, bool) {
        (self.forced, self.hearing_impaired)
    }

    /// Fallback pass ordering: variants as above, then common languages first
    pub fn fallback_rank(&self) -> (bool, bool, bool) {
        (self.forced, self.hearing_impaired, !self.is_common_language())
    }
}
