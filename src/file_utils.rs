use anyhow::{Context, Result, anyhow};
use log::warn;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

// @module: File utilities for subtitle persistence

/// Text of the cue appended to every translated subtitle
pub const PROVENANCE_MARKER: &str = "# Subtitles translated with AI Subtitle Translator #";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !Self::dir_exists(path) {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Write `content` to `path` through a temp file in the same directory,
    /// so readers see either the old file or the complete new one.
    pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::ensure_dir(dir)?;

        let mut temp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        temp.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write temp file for {:?}", path))?;
        temp.as_file()
            .sync_all()
            .with_context(|| format!("Failed to flush temp file for {:?}", path))?;

        // Dropping an unpersisted temp file removes it
        temp.persist(path)
            .map_err(|e| anyhow!("Failed to move temp file to {:?}: {}", path, e.error))?;
        Ok(())
    }

    /// Files directly inside `dir` with the given extension, sorted by file
    /// name. Unreadable entries are skipped; a missing directory is empty.
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Vec<PathBuf> {
        let dir = dir.as_ref();
        let extension = extension.trim_start_matches('.');

        WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry in {:?}: {}", dir, e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            })
            .collect()
    }
}
