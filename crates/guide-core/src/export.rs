//! Catalog export and import
//!
//! An export is a single JSON document:
//!
//! ```json
//! {
//!   "links": [{"id": 1, "url": "...", "name": "...", "certification": false,
//!              "valid": false, "successor": 2, "topics": ["sql"], "personas": [1]}],
//!   "topics": [{"MADE": "Data", "Topic": "sql"}],
//!   "personas": [{"id": 1, "persona": "Analyst"}],
//!   "successors": {"1": 2}
//! }
//! ```
//!
//! The field names and nesting are the compatibility contract with earlier
//! exports; `successors` is the lineage map at export time.

use std::collections::BTreeMap;
use std::path::Path;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::links::load_links;
use crate::lineage::{load_edges, resolve};
use crate::models::{Link, LinkId, Persona, Topic};
use crate::storage::gateway::{query_one, run};
use crate::storage::{StoreError, StoreResult};
use crate::tags::{all_personas, all_topics, replace_personas, replace_topics};

/// Full snapshot of the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub links: Vec<Link>,
    pub topics: Vec<Topic>,
    pub personas: Vec<Persona>,
    pub successors: BTreeMap<LinkId, LinkId>,
}

impl ExportDocument {
    /// Encode as pretty-printed JSON
    pub fn to_json(&self) -> StoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the document to a file
    pub fn write_to(&self, path: &Path) -> StoreResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Exported {} link(s) to {:?}", self.links.len(), path);
        Ok(())
    }

    /// Read a document from a file
    pub fn read_from(path: &Path) -> StoreResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Snapshot the catalog through one connection
pub fn snapshot(conn: &Connection) -> StoreResult<ExportDocument> {
    let links = load_links(conn, true)?;
    let topics = all_topics(conn)?;
    let personas = all_personas(conn)?;
    let successors = resolve(&load_edges(conn)?).terminals;

    Ok(ExportDocument {
        links,
        topics,
        personas,
        successors,
    })
}

/// Load a document into an empty catalog within the caller's transaction
///
/// Links keep their exported ids so successor pointers stay intact. The
/// `successors` map is derived data and is not written back.
pub fn restore(conn: &Connection, doc: &ExportDocument) -> StoreResult<()> {
    let existing: i64 =
        query_one(conn, "SELECT COUNT(*) FROM links", [], |row| row.get(0))?.unwrap_or(0);
    if existing > 0 {
        return Err(StoreError::NotEmpty { links: existing });
    }

    for topic in &doc.topics {
        run(
            conn,
            "INSERT OR REPLACE INTO made_topics (topic, made, label) VALUES (?, ?, ?)",
            params![topic.key, topic.category, topic.label],
        )?;
    }
    for persona in &doc.personas {
        run(
            conn,
            "INSERT OR REPLACE INTO personas (id, persona) VALUES (?, ?)",
            params![persona.id, persona.label],
        )?;
    }

    for link in &doc.links {
        run(
            conn,
            "INSERT INTO links (id, url, name, certification, valid, successor) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                link.id,
                link.url,
                link.name,
                link.certification,
                link.valid,
                link.successor
            ],
        )?;
    }
    for link in &doc.links {
        replace_topics(conn, link.id, &link.topics)?;
        replace_personas(conn, link.id, &link.personas)?;
    }

    info!(
        "Imported {} link(s), {} topic(s), {} persona(s)",
        doc.links.len(),
        doc.topics.len(),
        doc.personas.len()
    );
    Ok(())
}
