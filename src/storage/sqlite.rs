//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the FrontierStore
//! trait. One connection is shared behind a mutex; every call holds the lock
//! only for the duration of its statement.

use crate::storage::schema::{initialize_schema, reset_schema};
use crate::storage::traits::{FrontierStore, StorageError, StorageResult};
use crate::storage::{CrawledRecord, FetchedContent, ReadOrder, SeenRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SEEN: &str = "seen_urls";
const CRAWLED: &str = "crawled_urls";
const FORBIDDEN: &str = "forbidden_urls";
const FETCHED: &str = "fetched_content";

/// Seen URLs that are neither crawled nor forbidden
const FRONTIER_WHERE: &str = "NOT EXISTS (SELECT 1 FROM crawled_urls c WHERE c.url = s.url)
     AND NOT EXISTS (SELECT 1 FROM forbidden_urls f WHERE f.url = s.url)";

/// SQLite storage backend
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database or create the schema
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Several crawler processes may share one file
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        tracing::debug!("Opened frontier store at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            tracing::error!("Frontier store lock is poisoned");
            StorageError::LockPoisoned
        })
    }

    /// Runs `op` against the connection, logging any failure
    fn run<T>(
        &self,
        operation: &str,
        op: impl FnOnce(&Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let conn = self.lock()?;
        op(&conn).map_err(|e| {
            tracing::error!("Store operation {} failed: {}", operation, e);
            e
        })
    }

    fn exists(&self, table: &'static str, url: &str) -> StorageResult<bool> {
        tracing::trace!("Checking {} for url: {}", table, url);
        self.run("exists", |conn| {
            let found = conn.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE url = ?1)", table),
                params![url],
                |row| row.get(0),
            )?;
            Ok(found)
        })
    }

    fn remove(&self, table: &'static str, url: &str) -> StorageResult<bool> {
        tracing::debug!("Removing url from {}: {}", table, url);
        self.run("remove", |conn| {
            let removed = conn.execute(&format!("DELETE FROM {} WHERE url = ?1", table), params![url])?;
            Ok(removed > 0)
        })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        self.run("count", |conn| {
            let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }
}

impl FrontierStore for SqliteStore {
    // ===== Inserts =====

    fn add_seen(
        &self,
        url: &str,
        seen_time: Option<DateTime<Utc>>,
        crawl_time: Option<DateTime<Utc>>,
    ) -> StorageResult<bool> {
        if url.is_empty() {
            tracing::debug!("Rejecting empty seen url");
            return Ok(false);
        }

        let seen_time = format_time(&seen_time.unwrap_or_else(Utc::now));
        let crawl_time = crawl_time.as_ref().map(format_time);
        tracing::debug!("Inserting seen url: {} {}", url, seen_time);

        self.run("add_seen", |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO seen_urls (url, seen_time, crawl_time) VALUES (?1, ?2, ?3)",
                params![url, seen_time, crawl_time],
            )?;
            Ok(inserted == 1)
        })
    }

    fn add_crawled(
        &self,
        url: &str,
        seen_time: Option<DateTime<Utc>>,
        crawl_time: Option<DateTime<Utc>>,
    ) -> StorageResult<bool> {
        if url.is_empty() {
            tracing::debug!("Rejecting empty crawled url");
            return Ok(false);
        }

        let seen_time = seen_time.as_ref().map(format_time);
        let crawl_time = format_time(&crawl_time.unwrap_or_else(Utc::now));
        tracing::debug!("Inserting crawled url: {} {}", url, crawl_time);

        self.run("add_crawled", |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO crawled_urls (url, seen_time, crawl_time) VALUES (?1, ?2, ?3)",
                params![url, seen_time, crawl_time],
            )?;
            Ok(inserted == 1)
        })
    }

    fn add_forbidden(&self, url: &str) -> StorageResult<bool> {
        if url.is_empty() {
            tracing::debug!("Rejecting empty forbidden url");
            return Ok(false);
        }

        tracing::debug!("Inserting forbidden url: {}", url);
        self.run("add_forbidden", |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO forbidden_urls (url) VALUES (?1)",
                params![url],
            )?;
            Ok(inserted == 1)
        })
    }

    fn add_fetched_content(&self, content: &FetchedContent) -> StorageResult<bool> {
        if !content.is_complete() {
            tracing::debug!(
                "Both heading and body should be available: {}",
                content.url
            );
            return Ok(false);
        }

        tracing::debug!("Inserting fetched content url: {}", content.url);
        self.run("add_fetched_content", |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO fetched_content (url, heading, body, heading_hash, body_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    content.url,
                    content.heading,
                    content.body,
                    content.heading_hash,
                    content.body_hash
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    // ===== Existence predicates =====

    fn is_seen(&self, url: &str) -> StorageResult<bool> {
        self.exists(SEEN, url)
    }

    fn is_crawled(&self, url: &str) -> StorageResult<bool> {
        self.exists(CRAWLED, url)
    }

    fn is_forbidden(&self, url: &str) -> StorageResult<bool> {
        self.exists(FORBIDDEN, url)
    }

    fn is_content_fetched(&self, url: &str) -> StorageResult<bool> {
        self.exists(FETCHED, url)
    }

    // ===== Deletions =====

    fn remove_seen(&self, url: &str) -> StorageResult<bool> {
        self.remove(SEEN, url)
    }

    fn remove_crawled(&self, url: &str) -> StorageResult<bool> {
        self.remove(CRAWLED, url)
    }

    fn remove_forbidden(&self, url: &str) -> StorageResult<bool> {
        self.remove(FORBIDDEN, url)
    }

    fn remove_fetched_content(&self, url: &str) -> StorageResult<bool> {
        self.remove(FETCHED, url)
    }

    // ===== Reads =====

    fn read_seen(
        &self,
        max_time: Option<DateTime<Utc>>,
        limit: usize,
        order: ReadOrder,
    ) -> StorageResult<Vec<String>> {
        let max_time = format_time(&max_time.unwrap_or_else(Utc::now));
        tracing::debug!("Reading up to {} urls seen before {}", limit, max_time);

        let order_by = match order {
            ReadOrder::Recent => "seen_time DESC, rowid DESC",
            ReadOrder::Random => "RANDOM()",
        };
        let sql = format!(
            "SELECT url FROM seen_urls WHERE seen_time < ?1 ORDER BY {} LIMIT ?2",
            order_by
        );

        self.run("read_seen", |conn| {
            query_urls(conn, &sql, params![max_time, sql_limit(limit)])
        })
    }

    fn read_frontier(&self, limit: usize, order: ReadOrder) -> StorageResult<Vec<String>> {
        let order_by = match order {
            ReadOrder::Recent => "s.seen_time DESC, s.rowid DESC",
            ReadOrder::Random => "RANDOM()",
        };
        let sql = format!(
            "SELECT s.url FROM seen_urls s WHERE {} ORDER BY {} LIMIT ?1",
            FRONTIER_WHERE, order_by
        );

        let urls = self.run("read_frontier", |conn| {
            query_urls(conn, &sql, params![sql_limit(limit)])
        })?;
        tracing::debug!("Read {} frontier urls", urls.len());
        Ok(urls)
    }

    fn read_crawled(
        &self,
        max_time: Option<DateTime<Utc>>,
        limit: usize,
    ) -> StorageResult<Vec<String>> {
        let max_time = format_time(&max_time.unwrap_or_else(Utc::now));
        self.run("read_crawled", |conn| {
            query_urls(
                conn,
                "SELECT url FROM crawled_urls WHERE crawl_time < ?1
                 ORDER BY crawl_time DESC, rowid DESC LIMIT ?2",
                params![max_time, sql_limit(limit)],
            )
        })
    }

    fn read_fetched_content(&self, url: &str) -> StorageResult<Option<FetchedContent>> {
        self.run("read_fetched_content", |conn| {
            let content = conn
                .query_row(
                    "SELECT url, heading, body, heading_hash, body_hash
                     FROM fetched_content WHERE url = ?1",
                    params![url],
                    content_from_row,
                )
                .optional()?;
            Ok(content)
        })
    }

    fn get_matching_content(&self, body_hash: &str) -> StorageResult<Vec<String>> {
        let urls = self.run("get_matching_content", |conn| {
            query_urls(
                conn,
                "SELECT url FROM fetched_content WHERE body_hash = ?1 ORDER BY rowid",
                params![body_hash],
            )
        })?;
        tracing::debug!("{} rows share body hash {}", urls.len(), body_hash);
        Ok(urls)
    }

    fn duplicate_body_hashes(&self) -> StorageResult<Vec<String>> {
        self.run("duplicate_body_hashes", |conn| {
            query_urls(
                conn,
                "SELECT body_hash FROM fetched_content
                 GROUP BY body_hash HAVING COUNT(*) > 1 ORDER BY MIN(rowid)",
                [],
            )
        })
    }

    // ===== Paginated full-row reads =====

    fn seen_records(&self, limit: usize, offset: usize) -> StorageResult<Vec<SeenRecord>> {
        self.run("seen_records", |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, seen_time, crawl_time FROM seen_urls ORDER BY rowid LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![sql_limit(limit), sql_limit(offset)], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(url, seen_time, crawl_time)| {
                    Ok::<_, StorageError>(SeenRecord {
                        url,
                        seen_time: parse_time(SEEN, &seen_time)?,
                        crawl_time: crawl_time.map(|t| parse_time(SEEN, &t)).transpose()?,
                    })
                })
                .collect()
        })
    }

    fn crawled_records(&self, limit: usize, offset: usize) -> StorageResult<Vec<CrawledRecord>> {
        self.run("crawled_records", |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, seen_time, crawl_time FROM crawled_urls ORDER BY rowid LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![sql_limit(limit), sql_limit(offset)], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(url, seen_time, crawl_time)| {
                    Ok::<_, StorageError>(CrawledRecord {
                        url,
                        seen_time: seen_time.map(|t| parse_time(CRAWLED, &t)).transpose()?,
                        crawl_time: parse_time(CRAWLED, &crawl_time)?,
                    })
                })
                .collect()
        })
    }

    fn forbidden_urls(&self, limit: usize, offset: usize) -> StorageResult<Vec<String>> {
        self.run("forbidden_urls", |conn| {
            query_urls(
                conn,
                "SELECT url FROM forbidden_urls ORDER BY rowid LIMIT ?1 OFFSET ?2",
                params![sql_limit(limit), sql_limit(offset)],
            )
        })
    }

    fn fetched_records(
        &self,
        limit: usize,
        offset: usize,
    ) -> StorageResult<Vec<FetchedContent>> {
        self.run("fetched_records", |conn| {
            let mut stmt = conn.prepare(
                "SELECT url, heading, body, heading_hash, body_hash
                 FROM fetched_content ORDER BY rowid LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(params![sql_limit(limit), sql_limit(offset)], content_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // ===== Statistics =====

    fn count_seen(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM seen_urls")
    }

    fn count_crawled(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM crawled_urls")
    }

    fn count_forbidden(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM forbidden_urls")
    }

    fn count_fetched(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM fetched_content")
    }

    fn count_frontier(&self) -> StorageResult<u64> {
        self.count(&format!(
            "SELECT COUNT(*) FROM seen_urls s WHERE {}",
            FRONTIER_WHERE
        ))
    }

    // ===== Maintenance =====

    fn reset_all(&self) -> StorageResult<()> {
        self.run("reset_all", |conn| {
            reset_schema(conn)?;
            Ok(())
        })?;
        tracing::info!("Successfully reset all frontier tables");
        Ok(())
    }
}

/// Formats a timestamp with fixed precision so text order is time order
fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(table: &'static str, value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| StorageError::Timestamp {
            table,
            value: value.to_string(),
        })
}

fn sql_limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn query_urls<P: Params>(conn: &Connection, sql: &str, params: P) -> StorageResult<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let urls = stmt
        .query_map(params, |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(urls)
}

fn content_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FetchedContent> {
    Ok(FetchedContent {
        url: row.get(0)?,
        heading: row.get(1)?,
        body: row.get(2)?,
        heading_hash: row.get(3)?,
        body_hash: row.get(4)?,
    })
}
