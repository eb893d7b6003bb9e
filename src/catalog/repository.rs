/*!
 * Repository layer for catalog operations.
 *
 * High-level API over the catalog tables, abstracting away the SQL details.
 */

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use log::debug;
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::connection::CatalogConnection;
use super::models::{EpisodeRecord, HistoryAction, HistoryRecord, MediaItem, MovieRecord};
use super::{HistoryRecorder, MediaCatalog};

/// Repository for catalog operations
#[derive(Clone, Debug)]
pub struct Repository {
    db: CatalogConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: CatalogConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(CatalogConnection::new_default()?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(CatalogConnection::new_in_memory()?))
    }

    // =========================================================================
    // Media Operations
    // =========================================================================

    /// Insert or replace an episode
    pub async fn upsert_episode(&self, episode: &EpisodeRecord) -> Result<()> {
        let episode = episode.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO episodes (
                        episode_id, series_id, series_title, title, season, episode, path, subtitles
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(episode_id) DO UPDATE SET
                        series_id = excluded.series_id,
                        series_title = excluded.series_title,
                        title = excluded.title,
                        season = excluded.season,
                        episode = excluded.episode,
                        path = excluded.path,
                        subtitles = excluded.subtitles
                    "#,
                    params![
                        episode.episode_id,
                        episode.series_id,
                        episode.series_title,
                        episode.title,
                        episode.season,
                        episode.episode,
                        episode.path,
                        episode.subtitles,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Insert or replace a movie
    pub async fn upsert_movie(&self, movie: &MovieRecord) -> Result<()> {
        let movie = movie.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO movies (movie_id, title, path, subtitles)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(movie_id) DO UPDATE SET
                        title = excluded.title,
                        path = excluded.path,
                        subtitles = excluded.subtitles
                    "#,
                    params![movie.movie_id, movie.title, movie.path, movie.subtitles],
                )?;
                Ok(())
            })
            .await
    }

    /// Get an episode by ID
    pub async fn get_episode(&self, episode_id: i64) -> Result<Option<EpisodeRecord>> {
        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        r#"
                        SELECT episode_id, series_id, series_title, title, season, episode, path, subtitles
                        FROM episodes WHERE episode_id = ?1
                        "#,
                        [episode_id],
                        |row| {
                            Ok(EpisodeRecord {
                                episode_id: row.get(0)?,
                                series_id: row.get(1)?,
                                series_title: row.get(2)?,
                                title: row.get(3)?,
                                season: row.get(4)?,
                                episode: row.get(5)?,
                                path: row.get(6)?,
                                subtitles: row.get(7)?,
                            })
                        },
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    /// Get a movie by ID
    pub async fn get_movie(&self, movie_id: i64) -> Result<Option<MovieRecord>> {
        self.db
            .execute_async(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT movie_id, title, path, subtitles FROM movies WHERE movie_id = ?1",
                        [movie_id],
                        |row| {
                            Ok(MovieRecord {
                                movie_id: row.get(0)?,
                                title: row.get(1)?,
                                path: row.get(2)?,
                                subtitles: row.get(3)?,
                            })
                        },
                    )
                    .optional()?;

                Ok(result)
            })
            .await
    }

    // =========================================================================
    // History Operations
    // =========================================================================

    /// Append a history entry, returning its ID
    pub async fn add_history(&self, record: &HistoryRecord) -> Result<i64> {
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO history (
                        media_kind, series_id, episode_id, movie_id, action, language,
                        source_language, target_language, description, video_path,
                        subtitle_path, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    "#,
                    params![
                        record.media_kind.as_str(),
                        record.series_id,
                        record.episode_id,
                        record.movie_id,
                        record.action.code(),
                        record.language,
                        record.source_language,
                        record.target_language,
                        record.description,
                        record.video_path,
                        record.subtitle_path,
                        record.created_at,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                debug!("Recorded history entry {} ({})", id, record.action);
                Ok(id)
            })
            .await
    }

    /// Most recent history entries first
    pub async fn list_history(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.db
            .execute_async(move |conn| Self::list_history_sync(conn, limit))
            .await
    }

    fn list_history_sync(conn: &Connection, limit: usize) -> Result<Vec<HistoryRecord>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT id, media_kind, series_id, episode_id, movie_id, action, language,
                   source_language, target_language, description, video_path,
                   subtitle_path, created_at
            FROM history
            ORDER BY id DESC
            LIMIT ?1
            "#,
        )?;

        let rows = stmt.query_map([limit as i64], |row| Ok(Self::raw_history(row)))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        Ok(records)
    }

    fn raw_history(row: &Row<'_>) -> Result<HistoryRecord> {
        let kind: String = row.get(1)?;
        let action: i64 = row.get(5)?;

        Ok(HistoryRecord {
            id: Some(row.get(0)?),
            media_kind: kind.parse()?,
            series_id: row.get(2)?,
            episode_id: row.get(3)?,
            movie_id: row.get(4)?,
            action: HistoryAction::from_code(action)
                .ok_or_else(|| anyhow!("Unknown history action code: {}", action))?,
            language: row.get(6)?,
            source_language: row.get(7)?,
            target_language: row.get(8)?,
            description: row.get(9)?,
            video_path: row.get(10)?,
            subtitle_path: row.get(11)?,
            created_at: row.get(12)?,
        })
    }
}

#[async_trait]
impl MediaCatalog for Repository {
    async fn episode(&self, episode_id: i64) -> Result<Option<MediaItem>> {
        Ok(self.get_episode(episode_id).await?.map(MediaItem::from))
    }

    async fn movie(&self, movie_id: i64) -> Result<Option<MediaItem>> {
        Ok(self.get_movie(movie_id).await?.map(MediaItem::from))
    }
}

#[async_trait]
impl HistoryRecorder for Repository {
    async fn record(&self, entry: HistoryRecord) -> Result<()> {
        self.add_history(&entry).await.map(|_| ())
    }
}
