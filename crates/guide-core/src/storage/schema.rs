//! SQLite schema for the link catalog
//!
//! `links.successor` has no foreign key, so a chain may point at
//! an id that does not exist and the lineage resolver copes with it. The
//! association tables do reference their parents, so an unknown topic key
//! or persona id fails the statement that inserts it.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Links table
        CREATE TABLE IF NOT EXISTS links (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            name TEXT NOT NULL UNIQUE,
            certification INTEGER NOT NULL DEFAULT 0,
            valid INTEGER NOT NULL DEFAULT 1,
            successor INTEGER
        );

        -- Topic reference data, grouped by MADE category
        CREATE TABLE IF NOT EXISTS made_topics (
            topic TEXT PRIMARY KEY,
            made TEXT NOT NULL,
            label TEXT
        );

        -- Persona reference data
        CREATE TABLE IF NOT EXISTS personas (
            id INTEGER PRIMARY KEY,
            persona TEXT NOT NULL
        );

        -- Link-topic junction table (many-to-many)
        CREATE TABLE IF NOT EXISTS topic_links (
            topic TEXT NOT NULL,
            link INTEGER NOT NULL,
            PRIMARY KEY (topic, link),
            FOREIGN KEY (topic) REFERENCES made_topics(topic),
            FOREIGN KEY (link) REFERENCES links(id)
        );

        -- Link-persona junction table (many-to-many)
        CREATE TABLE IF NOT EXISTS persona_links (
            link_id INTEGER NOT NULL,
            persona_id INTEGER NOT NULL,
            PRIMARY KEY (link_id, persona_id),
            FOREIGN KEY (link_id) REFERENCES links(id),
            FOREIGN KEY (persona_id) REFERENCES personas(id)
        );

        -- Currently valid links only
        CREATE VIEW IF NOT EXISTS valid_links AS
            SELECT id, url, name, certification, valid, successor
            FROM links
            WHERE valid = 1;

        -- Indexes for common query patterns
        CREATE INDEX IF NOT EXISTS idx_links_successor ON links(successor);
        CREATE INDEX IF NOT EXISTS idx_topic_links_link ON topic_links(link);
        CREATE INDEX IF NOT EXISTS idx_persona_links_persona ON persona_links(persona_id);
        "#,
    )?;

    // Set schema version
    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_info'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
