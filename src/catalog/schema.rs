/*!
 * Catalog schema definitions and migrations.
 */

use anyhow::{Context, Result};
use log::{debug, info};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Initializing catalog schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!(
            "Migrating catalog schema from v{} to v{}",
            current_version, SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        debug!("Catalog schema is up to date (v{})", current_version);
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get(0),
        )
        .context("Failed to check schema_version table existence")?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, updated_at) VALUES (1, ?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked while history is written
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS episodes (
            episode_id INTEGER PRIMARY KEY,
            series_id INTEGER NOT NULL,
            series_title TEXT NOT NULL DEFAULT '',
            title TEXT NOT NULL DEFAULT '',
            season INTEGER NOT NULL DEFAULT 0,
            episode INTEGER NOT NULL DEFAULT 0,
            path TEXT NOT NULL,
            subtitles TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_episodes_series ON episodes(series_id);
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS movies (
            movie_id INTEGER PRIMARY KEY,
            title TEXT NOT NULL DEFAULT '',
            path TEXT NOT NULL,
            subtitles TEXT
        );
        "#,
    )?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            media_kind TEXT NOT NULL,
            series_id INTEGER,
            episode_id INTEGER,
            movie_id INTEGER,
            action INTEGER NOT NULL,
            language TEXT NOT NULL,
            source_language TEXT NOT NULL,
            target_language TEXT NOT NULL,
            description TEXT NOT NULL,
            video_path TEXT NOT NULL,
            subtitle_path TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_history_episode ON history(episode_id);
        CREATE INDEX IF NOT EXISTS idx_history_movie ON history(movie_id);
        "#,
    )?;

    info!("Catalog schema created successfully");
    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<()> {
    let current = from_version;

    if current < SCHEMA_VERSION {
        return Err(anyhow::anyhow!(
            "Unknown schema version: {}. Cannot migrate.",
            current
        ));
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    info!("Schema migration completed to v{}", SCHEMA_VERSION);
    Ok(())
}
