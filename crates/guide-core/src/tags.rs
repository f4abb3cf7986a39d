//! Topic and persona associations
//!
//! A link's association set is replaced wholesale on every write: all
//! existing rows for the link are deleted, then one row is inserted per
//! supplied key. Duplicate keys are ignored, so replaying a replacement
//! leaves the same set behind.
//!
//! The connection-level functions never open a transaction of their own;
//! they run inside whatever transaction the caller holds. The
//! [`TagRepository`] methods wrap them in a transaction when called alone.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use tracing::info;

use crate::models::{LinkId, Persona, PersonaId, Topic};
use crate::storage::gateway::{query_all, query_one, run, Gateway};
use crate::storage::{StoreError, StoreResult};

/// Association and reference-data access
#[derive(Debug, Clone)]
pub struct TagRepository {
    gateway: Gateway,
}

impl TagRepository {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Make `topic_keys` the complete topic set of a link
    pub fn replace_topics_for_link(&self, link_id: LinkId, topic_keys: &[String]) -> StoreResult<()> {
        self.gateway.with_transaction(|tx| {
            ensure_link_exists(tx, link_id)?;
            replace_topics(tx, link_id, topic_keys)
        })
    }

    /// Make `persona_ids` the complete persona set of a link
    pub fn replace_personas_for_link(
        &self,
        link_id: LinkId,
        persona_ids: &[PersonaId],
    ) -> StoreResult<()> {
        self.gateway.with_transaction(|tx| {
            ensure_link_exists(tx, link_id)?;
            replace_personas(tx, link_id, persona_ids)
        })
    }

    /// Topic keys attached to a link, in the order they were written
    pub fn fetch_topics_for_link(&self, link_id: LinkId) -> StoreResult<Vec<String>> {
        self.gateway
            .with_connection(|conn| topics_for_link(conn, link_id))
    }

    /// Persona ids attached to a link, in the order they were written
    pub fn fetch_personas_for_link(&self, link_id: LinkId) -> StoreResult<Vec<PersonaId>> {
        self.gateway
            .with_connection(|conn| personas_for_link(conn, link_id))
    }

    /// Every topic in the reference table
    pub fn fetch_all_topics(&self) -> StoreResult<Vec<Topic>> {
        self.gateway.with_connection(all_topics)
    }

    /// Every persona in the reference table
    pub fn fetch_all_personas(&self) -> StoreResult<Vec<Persona>> {
        self.gateway.with_connection(all_personas)
    }
}

// ==================== Connection-level operations ====================

/// Replace the topic set of a link within the caller's transaction
pub fn replace_topics(conn: &Connection, link_id: LinkId, topic_keys: &[String]) -> StoreResult<()> {
    run(conn, "DELETE FROM topic_links WHERE link = ?", [link_id])?;

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO topic_links (topic, link) VALUES (?, ?)")?;
    for key in topic_keys {
        stmt.execute(params![key, link_id])?;
    }

    info!("Replaced topics for link {} ({} key(s))", link_id, topic_keys.len());
    Ok(())
}

/// Replace the persona set of a link within the caller's transaction
pub fn replace_personas(
    conn: &Connection,
    link_id: LinkId,
    persona_ids: &[PersonaId],
) -> StoreResult<()> {
    run(conn, "DELETE FROM persona_links WHERE link_id = ?", [link_id])?;

    let mut stmt =
        conn.prepare("INSERT OR IGNORE INTO persona_links (link_id, persona_id) VALUES (?, ?)")?;
    for persona_id in persona_ids {
        stmt.execute(params![link_id, persona_id])?;
    }

    info!(
        "Replaced personas for link {} ({} id(s))",
        link_id,
        persona_ids.len()
    );
    Ok(())
}

pub fn topics_for_link(conn: &Connection, link_id: LinkId) -> StoreResult<Vec<String>> {
    query_all(
        conn,
        "SELECT topic FROM topic_links WHERE link = ? ORDER BY rowid",
        [link_id],
        |row| row.get(0),
    )
}

pub fn personas_for_link(conn: &Connection, link_id: LinkId) -> StoreResult<Vec<PersonaId>> {
    query_all(
        conn,
        "SELECT persona_id FROM persona_links WHERE link_id = ? ORDER BY rowid",
        [link_id],
        |row| row.get(0),
    )
}

/// Topic keys for every link, grouped by link id
pub fn topics_by_link(conn: &Connection) -> StoreResult<HashMap<LinkId, Vec<String>>> {
    let rows: Vec<(LinkId, String)> = query_all(
        conn,
        "SELECT link, topic FROM topic_links ORDER BY rowid",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(group_by_link(rows))
}

/// Persona ids for every link, grouped by link id
pub fn personas_by_link(conn: &Connection) -> StoreResult<HashMap<LinkId, Vec<PersonaId>>> {
    let rows: Vec<(LinkId, PersonaId)> = query_all(
        conn,
        "SELECT link_id, persona_id FROM persona_links ORDER BY rowid",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(group_by_link(rows))
}

pub fn all_topics(conn: &Connection) -> StoreResult<Vec<Topic>> {
    query_all(
        conn,
        "SELECT made, topic, label FROM made_topics ORDER BY made, topic",
        [],
        |row| {
            Ok(Topic {
                category: row.get(0)?,
                key: row.get(1)?,
                label: row.get(2)?,
            })
        },
    )
}

pub fn all_personas(conn: &Connection) -> StoreResult<Vec<Persona>> {
    query_all(
        conn,
        "SELECT id, persona FROM personas ORDER BY id",
        [],
        |row| {
            Ok(Persona {
                id: row.get(0)?,
                label: row.get(1)?,
            })
        },
    )
}

/// Fail with `NotFound` unless a link with this id exists
pub(crate) fn ensure_link_exists(conn: &Connection, link_id: LinkId) -> StoreResult<()> {
    let found: Option<LinkId> =
        query_one(conn, "SELECT id FROM links WHERE id = ?", [link_id], |row| row.get(0))?;
    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::NotFound { id: link_id }),
    }
}

fn group_by_link<T>(rows: Vec<(LinkId, T)>) -> HashMap<LinkId, Vec<T>> {
    let mut grouped: HashMap<LinkId, Vec<T>> = HashMap::new();
    for (link_id, value) in rows {
        grouped.entry(link_id).or_default().push(value);
    }
    grouped
}
