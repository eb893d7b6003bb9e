/*!
 * Path mapping between the catalog's view of the filesystem and ours.
 *
 * The catalog stores paths as the media managers see them. When this process
 * runs on another host or inside a container, a prefix rule rewrites them to
 * a locally reachable location. Series and movies have separate rule sets.
 */

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::translation::request::MediaKind;

/// Maps a stored path to a locally reachable one
pub trait PathMapper: Send + Sync {
    /// Rewrite `path` for the given kind of media; unknown paths pass through
    fn map(&self, path: &Path, kind: MediaKind) -> PathBuf;
}

/// A single prefix rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMappingRule {
    /// Prefix as stored in the catalog
    pub from: String,
    /// Prefix on this host
    pub to: String,
}

impl PathMappingRule {
    /// Create a rule
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }

    fn apply(&self, path: &str) -> Option<String> {
        if self.from.is_empty() || !path.starts_with(&self.from) {
            return None;
        }

        let rest = &path[self.from.len()..];
        let mapped = format!("{}{}", self.to, rest);

        // Follow the separator style of the target prefix
        let windows_target = self.to.contains('\\') && !self.to.contains('/');
        Some(if windows_target {
            mapped.replace('/', "\\")
        } else {
            mapped.replace('\\', "/")
        })
    }
}

/// Prefix-rule mapper with distinct rules for series and movies
#[derive(Debug, Clone, Default)]
pub struct PathMappings {
    series: Vec<PathMappingRule>,
    movies: Vec<PathMappingRule>,
}

impl PathMappings {
    /// Create a mapper from the two rule sets; the first matching rule wins
    pub fn new(series: Vec<PathMappingRule>, movies: Vec<PathMappingRule>) -> Self {
        Self { series, movies }
    }

    /// A mapper that never rewrites anything
    pub fn identity() -> Self {
        Self::default()
    }

    fn rules(&self, kind: MediaKind) -> &[PathMappingRule] {
        match kind {
            MediaKind::Episode => &self.series,
            MediaKind::Movie => &self.movies,
        }
    }
}

impl PathMapper for PathMappings {
    fn map(&self, path: &Path, kind: MediaKind) -> PathBuf {
        let raw = path.to_string_lossy();
        self.rules(kind)
            .iter()
            .find_map(|rule| rule.apply(&raw))
            .map(PathBuf::from)
            .unwrap_or_else(|| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_withMatchingPrefix_shouldRewrite() {
        let mappings = PathMappings::new(
            vec![PathMappingRule::new("/tv", "/mnt/media/tv")],
            vec![PathMappingRule::new("/movies", "/mnt/media/movies")],
        );

        assert_eq!(
            mappings.map(Path::new("/tv/Show/S01E01.en.srt"), MediaKind::Episode),
            PathBuf::from("/mnt/media/tv/Show/S01E01.en.srt")
        );
        assert_eq!(
            mappings.map(Path::new("/movies/Film/Film.en.srt"), MediaKind::Movie),
            PathBuf::from("/mnt/media/movies/Film/Film.en.srt")
        );
    }

    #[test]
    fn test_map_shouldKeepSeriesAndMovieRulesApart() {
        let mappings = PathMappings::new(vec![PathMappingRule::new("/tv", "/mnt/tv")], vec![]);
        assert_eq!(
            mappings.map(Path::new("/tv/a.srt"), MediaKind::Movie),
            PathBuf::from("/tv/a.srt")
        );
    }

    #[test]
    fn test_map_withWindowsTarget_shouldSwitchSeparators() {
        let mappings = PathMappings::new(vec![PathMappingRule::new("/tv", "D:\\tv")], vec![]);
        assert_eq!(
            mappings.map(Path::new("/tv/Show/a.srt"), MediaKind::Episode),
            PathBuf::from("D:\\tv\\Show\\a.srt")
        );
    }

    #[test]
    fn test_identity_shouldPassThrough() {
        let path = Path::new("/anything/at/all.srt");
        assert_eq!(PathMappings::identity().map(path, MediaKind::Episode), path);
    }
}
