/*!
 * Filesystem scan for subtitles next to a video file.
 *
 * Used when the catalog knows nothing usable. Every `.srt` file in the
 * video's directory and its conventional subtitle folders is classified
 * either by filename pattern or by sniffing the start of its content.
 */

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::detection::LanguageDetector;
use crate::file_utils::FileManager;
use crate::language_utils::UNDETERMINED;

/// Bytes read from a subtitle when its language has to be sniffed
pub const CONTENT_SAMPLE_BYTES: usize = 8192;

/// Conventional subtitle folders next to a video, besides one named after it
const SUBTITLE_FOLDERS: &[&str] = &["Subs", "Subtitles", "subs", "subtitles"];

static ENGLISH_FILENAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\.en\.srt$",
        r"\.eng\.srt$",
        r"\.english\.srt$",
        r"[._-]en[._-]",
        r"[._-]eng[._-]",
        r"[._-]english[._-]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// One `.srt` file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedSubtitle {
    /// Full path of the file
    pub path: PathBuf,
    /// File name, used for ordering
    pub filename: String,
    /// Classified as English by name or content
    pub is_english: bool,
    /// Detected language, `und` when unknown
    pub detected_language: String,
}

/// Discovers and classifies subtitle files around a video
#[derive(Clone)]
pub struct FilesystemSubtitleScanner {
    detector: Arc<dyn LanguageDetector>,
}

impl std::fmt::Debug for FilesystemSubtitleScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilesystemSubtitleScanner").finish_non_exhaustive()
    }
}

impl FilesystemSubtitleScanner {
    /// Create a scanner that sniffs content with the given detector
    pub fn new(detector: Arc<dyn LanguageDetector>) -> Self {
        Self { detector }
    }

    /// Whether a file name alone marks a subtitle as English
    pub fn is_english_filename(filename: &str) -> bool {
        let lowered = filename.to_lowercase();
        ENGLISH_FILENAME_PATTERNS.iter().any(|re| re.is_match(&lowered))
    }

    /// Directories searched for a video: its own directory, then existing
    /// subtitle folders. Folders resolving to the same place are listed once.
    pub fn search_dirs(video_path: &Path) -> Vec<PathBuf> {
        let video_dir = match video_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut candidates = vec![video_dir.clone()];
        candidates.extend(SUBTITLE_FOLDERS.iter().map(|name| video_dir.join(name)));
        if let Some(stem) = video_path.file_stem() {
            candidates.push(video_dir.join(stem));
        }

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|dir| dir.is_dir())
            .filter(|dir| {
                let key = dir.canonicalize().unwrap_or_else(|_| dir.clone());
                seen.insert(key)
            })
            .collect()
    }

    /// Scan and classify, English first, then by file name
    pub fn scan(&self, video_path: &Path) -> Vec<ScannedSubtitle> {
        let mut results = Vec::new();

        for dir in Self::search_dirs(video_path) {
            for path in FileManager::find_files(&dir, "srt") {
                let filename = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                results.push(self.classify(&path, filename));
            }
        }

        results.sort_by(|a, b| {
            (!a.is_english, &a.filename).cmp(&(!b.is_english, &b.filename))
        });

        debug!("Filesystem scan near {:?} found {} subtitle(s)", video_path, results.len());
        results
    }

    fn classify(&self, path: &Path, filename: String) -> ScannedSubtitle {
        let by_name = Self::is_english_filename(&filename);
        let detected = if by_name {
            Some("en".to_string())
        } else {
            self.detect_from_content(path)
        };

        ScannedSubtitle {
            path: path.to_path_buf(),
            filename,
            is_english: by_name || detected.as_deref() == Some("en"),
            detected_language: detected.unwrap_or_else(|| UNDETERMINED.to_string()),
        }
    }

    fn detect_from_content(&self, path: &Path) -> Option<String> {
        let sample = match read_sample(path) {
            Ok(sample) => sample,
            Err(e) => {
                debug!("Unable to sample {:?}: {}", path, e);
                return None;
            }
        };

        self.detector.detect(&sample).map(|code| code.to_lowercase())
    }
}

fn read_sample(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut sample = Vec::with_capacity(CONTENT_SAMPLE_BYTES);
    File::open(path)?
        .take(CONTENT_SAMPLE_BYTES as u64)
        .read_to_end(&mut sample)?;
    Ok(sample)
}
