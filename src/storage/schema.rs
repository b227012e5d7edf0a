//! Database schema definitions
//!
//! Four record sets, each keyed by canonical URL. The UNIQUE constraints are
//! what make concurrent inserts idempotent: writers use `INSERT OR IGNORE`
//! instead of checking for existence first.

/// SQL schema for the database
///
/// Timestamps are RFC 3339 UTC strings with fixed microsecond precision, so
/// lexicographic order equals chronological order.
pub const SCHEMA_SQL: &str = r#"
-- Every discovered URL
CREATE TABLE IF NOT EXISTS seen_urls (
    url TEXT NOT NULL UNIQUE,
    seen_time TEXT NOT NULL,
    crawl_time TEXT
);

CREATE INDEX IF NOT EXISTS idx_seen_urls_seen_time ON seen_urls(seen_time);

-- URLs whose fetch completed with a usable result
CREATE TABLE IF NOT EXISTS crawled_urls (
    url TEXT NOT NULL UNIQUE,
    seen_time TEXT,
    crawl_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawled_urls_crawl_time ON crawled_urls(crawl_time);

-- URLs that yielded no usable outcome
CREATE TABLE IF NOT EXISTS forbidden_urls (
    url TEXT NOT NULL UNIQUE
);

-- Extracted heading/body per URL
CREATE TABLE IF NOT EXISTS fetched_content (
    url TEXT NOT NULL UNIQUE,
    heading TEXT NOT NULL,
    body TEXT NOT NULL,
    heading_hash TEXT NOT NULL,
    body_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_fetched_content_body_hash ON fetched_content(body_hash);
"#;

/// SQL that drops every record set
pub const DROP_SQL: &str = r#"
DROP TABLE IF EXISTS seen_urls;
DROP TABLE IF EXISTS crawled_urls;
DROP TABLE IF EXISTS forbidden_urls;
DROP TABLE IF EXISTS fetched_content;
"#;

/// Initializes the database schema
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Drops and recreates all tables inside one transaction
pub fn reset_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(&format!("BEGIN;\n{}{}COMMIT;", DROP_SQL, SCHEMA_SQL))
}
