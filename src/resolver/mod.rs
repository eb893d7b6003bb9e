/*!
 * Source subtitle selection.
 *
 * `SubtitleResolver` picks which existing subtitle should feed a translation.
 * It runs three passes and the first one that yields an existing file wins:
 *
 * 1. exact language match among catalog candidates (plain, then hi, then forced)
 * 2. any catalog candidate, preferring plain variants and English
 * 3. a filesystem scan around the video (see `scanner`)
 *
 * The resolver only reads; it never mutates the catalog or the filesystem.
 */

pub mod candidate;
pub mod scanner;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::detection::LanguageDetector;
use crate::errors::ResolveError;
use crate::path_mapping::PathMapper;
use crate::translation::request::MediaKind;

pub use self::candidate::{CandidateOrigin, SubtitleCandidate};
pub use self::scanner::{FilesystemSubtitleScanner, ScannedSubtitle};

/// Which pass produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPass {
    /// Catalog candidate in the requested language
    Exact,
    /// Catalog candidate in another language
    Fallback,
    /// File found by scanning the video's surroundings
    Filesystem,
}

impl fmt::Display for ResolutionPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPass::Exact => write!(f, "exact"),
            ResolutionPass::Fallback => write!(f, "fallback"),
            ResolutionPass::Filesystem => write!(f, "filesystem"),
        }
    }
}

/// The selected source subtitle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Path that exists on disk
    pub path: PathBuf,
    /// Language of the selected subtitle
    pub language: String,
    /// Pass that found it
    pub pass: ResolutionPass,
}

impl Resolution {
    /// Whether the requested language was matched exactly
    pub fn is_exact(&self) -> bool {
        self.pass == ResolutionPass::Exact
    }
}

/// Selects the best source subtitle for a requested language
#[derive(Clone)]
pub struct SubtitleResolver {
    mapper: Arc<dyn PathMapper>,
    scanner: FilesystemSubtitleScanner,
}

impl fmt::Debug for SubtitleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubtitleResolver")
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}

impl SubtitleResolver {
    /// Create a resolver from its collaborators
    pub fn new(mapper: Arc<dyn PathMapper>, detector: Arc<dyn LanguageDetector>) -> Self {
        Self {
            mapper,
            scanner: FilesystemSubtitleScanner::new(detector),
        }
    }

    /// Resolve the source subtitle for `requested_language`.
    ///
    /// `candidates` are the catalog's known subtitles for the media item,
    /// already decoded. Returns `NotFound` only when no pass yields a file.
    pub fn resolve(
        &self,
        candidates: &[SubtitleCandidate],
        requested_language: &str,
        video_path: &Path,
        kind: MediaKind,
    ) -> Result<Resolution, ResolveError> {
        let requested = requested_language.trim().to_lowercase();

        if let Some(resolution) = self.exact_pass(candidates, &requested, kind) {
            debug!("Resolved {:?} by exact match for '{}'", resolution.path, requested);
            return Ok(resolution);
        }

        if let Some(resolution) = self.fallback_pass(candidates, kind) {
            info!(
                "No '{}' subtitle available, falling back to '{}' at {:?}",
                requested, resolution.language, resolution.path
            );
            return Ok(resolution);
        }

        if let Some(resolution) = self.filesystem_pass(video_path) {
            info!(
                "Using '{}' subtitle found on disk at {:?}",
                resolution.language, resolution.path
            );
            return Ok(resolution);
        }

        warn!("No subtitle found for '{}' near {:?}", requested, video_path);
        Err(ResolveError::NotFound {
            language: requested,
            video_path: video_path.to_path_buf(),
        })
    }

    fn exact_pass(
        &self,
        candidates: &[SubtitleCandidate],
        requested: &str,
        kind: MediaKind,
    ) -> Option<Resolution> {
        let mut matches: Vec<&SubtitleCandidate> = candidates
            .iter()
            .filter(|c| c.language_code2 == requested)
            .collect();
        // Stable sort keeps catalog order within a rank
        matches.sort_by_key(|c| c.exact_rank());

        self.first_existing(matches, kind, ResolutionPass::Exact)
    }

    fn fallback_pass(&self, candidates: &[SubtitleCandidate], kind: MediaKind) -> Option<Resolution> {
        if candidates.is_empty() {
            return None;
        }

        let mut ranked: Vec<&SubtitleCandidate> = candidates.iter().collect();
        ranked.sort_by_key(|c| c.fallback_rank());

        self.first_existing(ranked, kind, ResolutionPass::Fallback)
    }

    fn filesystem_pass(&self, video_path: &Path) -> Option<Resolution> {
        let found = self.scanner.scan(video_path);

        if let Some(english) = found.iter().find(|s| s.is_english) {
            return Some(Resolution {
                path: english.path.clone(),
                language: "en".to_string(),
                pass: ResolutionPass::Filesystem,
            });
        }

        found.into_iter().next().map(|first| Resolution {
            path: first.path,
            language: first.detected_language,
            pass: ResolutionPass::Filesystem,
        })
    }

    fn first_existing(
        &self,
        ranked: Vec<&SubtitleCandidate>,
        kind: MediaKind,
        pass: ResolutionPass,
    ) -> Option<Resolution> {
        ranked.into_iter().find_map(|candidate| {
            self.locate(&candidate.path, kind).map(|path| Resolution {
                path,
                language: candidate.language_code2.clone(),
                pass,
            })
        })
    }

    /// Mapped path when it exists, else the stored path when it exists
    fn locate(&self, stored: &Path, kind: MediaKind) -> Option<PathBuf> {
        let mapped = self.mapper.map(stored, kind);
        if mapped.exists() {
            Some(mapped)
        } else if stored.exists() {
            Some(stored.to_path_buf())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::HeuristicLanguageDetector;
    use crate::path_mapping::{PathMappingRule, PathMappings};
    use std::fs;
    use tempfile::TempDir;

    fn resolver(mappings: PathMappings) -> SubtitleResolver {
        SubtitleResolver::new(Arc::new(mappings), Arc::new(HeuristicLanguageDetector::default()))
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi\n").unwrap();
        path
    }

    #[test]
    fn test_resolve_withEnglishVariants_shouldPickPlainCandidate() {
        let dir = TempDir::new().unwrap();
        let forced = touch(&dir, "ep.en.forced.srt");
        let plain = touch(&dir, "ep.en.srt");
        let hi = touch(&dir, "ep.en.hi.srt");
        let candidates = vec![
            SubtitleCandidate::from_tag("en:forced", &forced).unwrap(),
            SubtitleCandidate::from_tag("en", &plain).unwrap(),
            SubtitleCandidate::from_tag("en:hi", &hi).unwrap(),
        ];

        let resolution = resolver(PathMappings::identity())
            .resolve(&candidates, "en", &dir.path().join("ep.mkv"), MediaKind::Episode)
            .unwrap();

        assert_eq!(resolution.path, plain);
        assert_eq!(resolution.language, "en");
        assert!(resolution.is_exact());
    }

    #[test]
    fn test_resolve_withMissingExactFile_shouldTryNextRank() {
        let dir = TempDir::new().unwrap();
        let hi = touch(&dir, "ep.en.hi.srt");
        let candidates = vec![
            SubtitleCandidate::from_tag("en", dir.path().join("gone.srt")).unwrap(),
            SubtitleCandidate::from_tag("en:hi", &hi).unwrap(),
        ];

        let resolution = resolver(PathMappings::identity())
            .resolve(&candidates, "en", &dir.path().join("ep.mkv"), MediaKind::Episode)
            .unwrap();
        assert_eq!(resolution.path, hi);
    }

    #[test]
    fn test_resolve_withoutRequestedLanguage_shouldPreferEnglishFallback() {
        let dir = TempDir::new().unwrap();
        let de = touch(&dir, "ep.de.srt");
        let en = touch(&dir, "ep.en.srt");
        let candidates = vec![
            SubtitleCandidate::from_tag("de", &de).unwrap(),
            SubtitleCandidate::from_tag("en", &en).unwrap(),
        ];

        let resolution = resolver(PathMappings::identity())
            .resolve(&candidates, "ja", &dir.path().join("ep.mkv"), MediaKind::Episode)
            .unwrap();

        assert_eq!(resolution.path, en);
        assert_eq!(resolution.language, "en");
        assert_eq!(resolution.pass, ResolutionPass::Fallback);
    }

    #[test]
    fn test_resolve_withMappedPath_shouldPreferMappedLocation() {
        let dir = TempDir::new().unwrap();
        let local = touch(&dir, "film.en.srt");
        let mappings = PathMappings::new(
            vec![],
            vec![PathMappingRule::new("/remote/movies", dir.path().to_string_lossy())],
        );
        let candidates =
            vec![SubtitleCandidate::from_tag("en", "/remote/movies/film.en.srt").unwrap()];

        let resolution = resolver(mappings)
            .resolve(&candidates, "en", &dir.path().join("film.mkv"), MediaKind::Movie)
            .unwrap();
        assert_eq!(resolution.path, local);
    }

    #[test]
    fn test_resolve_withNothingAnywhere_shouldReturnNotFound() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("ep.mkv");

        let err = resolver(PathMappings::identity())
            .resolve(&[], "en", &video, MediaKind::Episode)
            .unwrap_err();
        assert_eq!(err, ResolveError::NotFound { language: "en".to_string(), video_path: video });
    }
}
