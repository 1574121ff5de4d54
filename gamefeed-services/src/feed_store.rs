//! Feed Store
//!
//! SQLite-backed live store for crawled news items, plus read access to the
//! site's game, publisher and platform catalog tables.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, info, instrument};

use gamefeed_core::feed::split_categories;
use gamefeed_core::{
    ArchivedItem, Catalog, FeedItem, GameEntry, NewFeedItem, PlatformEntry, PublisherEntry,
};

use crate::archive::{Archive, ArchiveError};

const ITEM_COLUMNS: &str =
    "id, title, url, site, published_at, categories, game_id, created_at, updated_at";

/// Whether an upsert created a row or refreshed an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Summary of an expiry run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpireReport {
    /// Items older than the cutoff
    pub expired: usize,
    /// Snapshots newly written to the archive
    pub archived: usize,
    /// Items whose title was already archived
    pub already_archived: usize,
    /// Rows removed from the live store
    pub deleted: usize,
    /// Archive months touched, oldest first
    pub months: Vec<String>,
}

/// Errors that can occur during feed store operations
#[derive(Debug, thiserror::Error)]
pub enum FeedStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Retention of {0} days is out of range")]
    RetentionOutOfRange(i64),

    #[error("Failed to acquire lock")]
    LockError,
}

/// Live store of crawled news items
pub struct FeedStore {
    conn: Mutex<Connection>,
}

impl FeedStore {
    /// Open (or create) the store at `db_path`
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, FeedStoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FeedStoreError::Io(format!("Failed to create database directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path.as_ref())?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        info!("Initialized feed store at: {}", db_path.as_ref().display());
        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn new_in_memory() -> Result<Self, FeedStoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;

        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, FeedStoreError> {
        self.conn.lock().map_err(|_| FeedStoreError::LockError)
    }

    fn init_schema(&self) -> Result<(), FeedStoreError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feed_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                site TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                categories TEXT NOT NULL DEFAULT '',
                game_id INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (title, url)
            );

            CREATE INDEX IF NOT EXISTS idx_feed_items_published
            ON feed_items(published_at);

            CREATE INDEX IF NOT EXISTS idx_feed_items_game
            ON feed_items(game_id, published_at);

            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                aliases TEXT
            );

            CREATE TABLE IF NOT EXISTS publishers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS platforms (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS game_platform (
                game_id INTEGER NOT NULL,
                platform_id INTEGER NOT NULL,
                PRIMARY KEY (game_id, platform_id)
            );
            "#,
        )?;

        Ok(())
    }

    /// Insert an item, or refresh the row with the same (title, url)
    ///
    /// An incoming item without a game keeps the game already linked to the
    /// stored row.
    pub fn upsert(&self, item: &NewFeedItem) -> Result<UpsertOutcome, FeedStoreError> {
        let conn = self.lock()?;
        let now = Utc::now().timestamp();

        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM feed_items WHERE title = ?1 AND url = ?2)",
            params![item.title, item.url],
            |row| row.get(0),
        )?;

        conn.execute(
            r#"
            INSERT INTO feed_items (title, url, site, published_at, categories, game_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT (title, url) DO UPDATE SET
                site = excluded.site,
                published_at = excluded.published_at,
                categories = excluded.categories,
                game_id = COALESCE(excluded.game_id, feed_items.game_id),
                updated_at = excluded.updated_at
            "#,
            params![
                item.title,
                item.url,
                item.site,
                item.published_at.timestamp(),
                item.categories_string(),
                item.game_id,
                now,
            ],
        )?;

        Ok(if exists {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        })
    }

    /// Get an item by its live-store id
    pub fn find(&self, id: i64) -> Result<Option<FeedItem>, FeedStoreError> {
        let conn = self.lock()?;

        let item = conn
            .query_row(
                &format!("SELECT {} FROM feed_items WHERE id = ?1", ITEM_COLUMNS),
                params![id],
                row_to_item,
            )
            .optional()?;

        Ok(item)
    }

    /// All live items, newest first
    pub fn all(&self) -> Result<Vec<FeedItem>, FeedStoreError> {
        self.query_items(
            &format!(
                "SELECT {} FROM feed_items ORDER BY published_at DESC, id DESC",
                ITEM_COLUMNS
            ),
            &[],
        )
    }

    /// Items without a matched game, newest first
    pub fn unmatched(&self) -> Result<Vec<FeedItem>, FeedStoreError> {
        self.query_items(
            &format!(
                "SELECT {} FROM feed_items WHERE game_id IS NULL ORDER BY published_at DESC, id DESC",
                ITEM_COLUMNS
            ),
            &[],
        )
    }

    /// Unmatched items published at or after `since`, newest first
    pub fn unmatched_since(&self, since: DateTime<Utc>) -> Result<Vec<FeedItem>, FeedStoreError> {
        self.query_items(
            &format!(
                "SELECT {} FROM feed_items WHERE game_id IS NULL AND published_at >= ?1 \
                 ORDER BY published_at DESC, id DESC",
                ITEM_COLUMNS
            ),
            &[since.timestamp()],
        )
    }

    /// Items published strictly before `cutoff`, oldest first
    pub fn published_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedItem>, FeedStoreError> {
        self.query_items(
            &format!(
                "SELECT {} FROM feed_items WHERE published_at < ?1 ORDER BY published_at ASC, id ASC",
                ITEM_COLUMNS
            ),
            &[cutoff.timestamp()],
        )
    }

    fn query_items(&self, sql: &str, args: &[i64]) -> Result<Vec<FeedItem>, FeedStoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;

        let items = stmt
            .query_map(params_from_iter(args.iter()), row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Number of live items
    pub fn count(&self) -> Result<usize, FeedStoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM feed_items", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    /// Link an item to a game
    pub fn set_game(&self, item_id: i64, game_id: i64) -> Result<bool, FeedStoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE feed_items SET game_id = ?1, updated_at = ?2 WHERE id = ?3",
            params![game_id, Utc::now().timestamp(), item_id],
        )?;

        Ok(changed > 0)
    }

    /// Permanently delete items by id
    pub fn delete_items(&self, ids: &[i64]) -> Result<usize, FeedStoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM feed_items WHERE id = ?1")?;
            for id in ids {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;

        Ok(deleted)
    }

    /// Remove every item sharing a title with an earlier-ingested item
    ///
    /// The row with the lowest id in each title group is kept. Deletion is
    /// permanent; duplicates are not archived.
    #[instrument(skip(self))]
    pub fn dedupe(&self) -> Result<usize, FeedStoreError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM feed_items WHERE id NOT IN (SELECT MIN(id) FROM feed_items GROUP BY title)",
            [],
        )?;

        info!("Removed {} duplicate news items", removed);
        Ok(removed)
    }

    /// Move items older than the retention window into the monthly archive
    ///
    /// Items are grouped by publication month. A month's items leave the live
    /// store only after its archive file was written. An unreadable archive
    /// file stops the run; items of that month and later months stay live.
    #[instrument(skip(self, archive, now))]
    pub fn expire(
        &self,
        archive: &Archive,
        retention_days: i64,
        now: DateTime<Utc>,
    ) -> Result<ExpireReport, FeedStoreError> {
        let cutoff = retention_cutoff(now, retention_days)?;
        let expired = self.published_before(cutoff)?;

        let mut by_month: BTreeMap<String, (Vec<i64>, Vec<ArchivedItem>)> = BTreeMap::new();
        for item in expired {
            let snapshot = item.to_archived();
            let (ids, snapshots) = by_month.entry(snapshot.month_key()).or_default();
            ids.push(item.id);
            snapshots.push(snapshot);
        }

        let mut report = ExpireReport::default();
        for (month, (ids, snapshots)) in by_month {
            let outcome = archive.append(&month, snapshots)?;
            let deleted = self.delete_items(&ids)?;

            debug!(
                "Expired {} items of {} ({} archived)",
                ids.len(),
                month,
                outcome.added
            );
            report.expired += ids.len();
            report.archived += outcome.added;
            report.already_archived += outcome.skipped;
            report.deleted += deleted;
            report.months.push(month);
        }

        info!(
            "Expired {} news items older than {} ({} archived)",
            report.expired, cutoff, report.archived
        );
        Ok(report)
    }

    /// Record that a game is available on a platform
    pub fn link_game_platform(&self, game_id: i64, platform_id: i64) -> Result<bool, FeedStoreError> {
        let conn = self.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO game_platform (game_id, platform_id) VALUES (?1, ?2)",
            params![game_id, platform_id],
        )?;

        Ok(inserted > 0)
    }

    /// Platform ids linked to a game
    pub fn game_platforms(&self, game_id: i64) -> Result<Vec<i64>, FeedStoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT platform_id FROM game_platform WHERE game_id = ?1 ORDER BY platform_id",
        )?;

        let ids = stmt
            .query_map(params![game_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// Snapshot of the catalog tables
    pub fn load_catalog(&self) -> Result<Catalog, FeedStoreError> {
        let conn = self.lock()?;

        let games = conn
            .prepare("SELECT id, title, aliases FROM games ORDER BY id")?
            .query_map([], |row| {
                Ok(GameEntry {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    aliases: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let publishers = conn
            .prepare("SELECT id, title FROM publishers ORDER BY id")?
            .query_map([], |row| {
                Ok(PublisherEntry {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let platforms = conn
            .prepare("SELECT id, title FROM platforms ORDER BY id")?
            .query_map([], |row| {
                Ok(PlatformEntry {
                    id: row.get(0)?,
                    title: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Catalog::new(games, publishers, platforms))
    }

    /// Add a game to the catalog (catalog import)
    pub fn insert_game(&self, title: &str, aliases: Option<&str>) -> Result<i64, FeedStoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO games (title, aliases) VALUES (?1, ?2)",
            params![title, aliases],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Add a publisher to the catalog (catalog import)
    pub fn insert_publisher(&self, title: &str) -> Result<i64, FeedStoreError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO publishers (title) VALUES (?1)", params![title])?;

        Ok(conn.last_insert_rowid())
    }

    /// Add a platform to the catalog (catalog import)
    pub fn insert_platform(&self, title: &str) -> Result<i64, FeedStoreError> {
        let conn = self.lock()?;
        conn.execute("INSERT INTO platforms (title) VALUES (?1)", params![title])?;

        Ok(conn.last_insert_rowid())
    }
}

/// Oldest publication time kept by a retention window ending at `now`
pub fn retention_cutoff(now: DateTime<Utc>, retention_days: i64) -> Result<DateTime<Utc>, FeedStoreError> {
    Duration::try_days(retention_days)
        .filter(|window| *window >= Duration::zero())
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or(FeedStoreError::RetentionOutOfRange(retention_days))
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<FeedItem> {
    let categories: String = row.get(5)?;

    Ok(FeedItem {
        id: row.get(0)?,
        title: row.get(1)?,
        url: row.get(2)?,
        site: row.get(3)?,
        published_at: from_timestamp(row.get(4)?),
        categories: split_categories(&categories),
        game_id: row.get(6)?,
        created_at: from_timestamp(row.get(7)?),
        updated_at: from_timestamp(row.get(8)?),
    })
}

fn from_timestamp(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or(DateTime::UNIX_EPOCH)
}
