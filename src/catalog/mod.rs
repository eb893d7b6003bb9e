/*!
 * Media catalog and history persistence.
 *
 * This module provides SQLite-based storage for:
 * - episodes and movies with their known subtitles
 * - the history of produced subtitles
 *
 * The translation pipeline only sees the `MediaCatalog` and
 * `HistoryRecorder` traits, so any other store can stand in.
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;
pub mod stored;

use anyhow::Result;
use async_trait::async_trait;

pub use self::connection::CatalogConnection;
pub use self::models::{EpisodeRecord, HistoryAction, HistoryRecord, MediaItem, MovieRecord};
pub use self::repository::Repository;
pub use self::stored::{StoredSubtitles, decode_stored_subtitles};

/// Read-only lookup of media items by stable id
#[async_trait]
pub trait MediaCatalog: Send + Sync {
    /// Look up an episode
    async fn episode(&self, episode_id: i64) -> Result<Option<MediaItem>>;

    /// Look up a movie
    async fn movie(&self, movie_id: i64) -> Result<Option<MediaItem>>;
}

/// Sink for history entries
#[async_trait]
pub trait HistoryRecorder: Send + Sync {
    /// Append one entry
    async fn record(&self, entry: HistoryRecord) -> Result<()>;
}
