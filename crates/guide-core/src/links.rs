//! Link repository
//!
//! CRUD over the `links` table. Links are never deleted: a new version is
//! created with a `predecessor`, which retires the predecessor and points
//! it at the new record in the same transaction.

use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::VersionCopy;
use crate::models::{Link, LinkFields, LinkId, LinkUpdate, NewLink};
use crate::storage::gateway::{query_all, query_one, run, Gateway};
use crate::storage::{StoreError, StoreResult};
use crate::tags::{
    ensure_link_exists, personas_by_link, personas_for_link, replace_personas, replace_topics,
    topics_by_link, topics_for_link,
};

const LINK_COLUMNS: &str = "id, url, name, certification, valid, successor";

/// Row counts across the catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub links: i64,
    pub valid_links: i64,
    pub superseded: i64,
    pub topics: i64,
    pub personas: i64,
}

/// Link CRUD
#[derive(Debug, Clone)]
pub struct LinkRepository {
    gateway: Gateway,
    version_copy: VersionCopy,
}

impl LinkRepository {
    pub fn new(gateway: Gateway, version_copy: VersionCopy) -> Self {
        Self {
            gateway,
            version_copy,
        }
    }

    /// All links ordered by id, with their associations attached
    pub fn fetch_links(&self, include_invalid: bool) -> StoreResult<Vec<Link>> {
        self.gateway
            .with_connection(|conn| load_links(conn, include_invalid))
    }

    /// One link by id
    ///
    /// An invalid link is reported as `NotFound` unless `include_invalid`.
    pub fn find_link_by_id(&self, id: LinkId, include_invalid: bool) -> StoreResult<Link> {
        self.gateway
            .with_connection(|conn| load_link(conn, id, include_invalid))
    }

    /// Apply every aspect present in `update` in one transaction
    pub fn update_link(&self, update: &LinkUpdate) -> StoreResult<()> {
        self.gateway.with_transaction(|tx| {
            ensure_link_exists(tx, update.id)?;

            if let Some(ref fields) = update.fields {
                write_fields(tx, update.id, fields)?;
            }
            if let Some(ref topics) = update.topics {
                replace_topics(tx, update.id, topics)?;
            }
            if let Some(ref personas) = update.personas {
                replace_personas(tx, update.id, personas)?;
            }

            info!("Updated link {}", update.id);
            Ok(())
        })
    }

    /// Insert a link and return its new id
    ///
    /// With a predecessor, the predecessor is retired and pointed at the
    /// new link, and associations are inherited per the copy policy.
    pub fn create_link(&self, link: &NewLink) -> StoreResult<LinkId> {
        self.gateway
            .with_transaction(|tx| insert_link(tx, link, self.version_copy))
    }

    /// Row counts for status reporting
    pub fn stats(&self) -> StoreResult<CatalogStats> {
        self.gateway.with_connection(load_stats)
    }
}

// ==================== Connection-level operations ====================

/// Load all links and attach their associations
///
/// Associations come from two bulk queries merged by id rather than a
/// join, so many-to-many rows never duplicate a link.
pub fn load_links(conn: &Connection, include_invalid: bool) -> StoreResult<Vec<Link>> {
    let source = if include_invalid { "links" } else { "valid_links" };
    let sql = format!("SELECT {} FROM {} ORDER BY id", LINK_COLUMNS, source);

    let mut links = query_all(conn, &sql, [], link_from_row)?;
    let mut topics = topics_by_link(conn)?;
    let mut personas = personas_by_link(conn)?;

    for link in &mut links {
        link.topics = topics.remove(&link.id).unwrap_or_default();
        link.personas = personas.remove(&link.id).unwrap_or_default();
    }

    debug!("Loaded {} link(s), include_invalid={}", links.len(), include_invalid);
    Ok(links)
}

/// Load one link with its associations
pub fn load_link(conn: &Connection, id: LinkId, include_invalid: bool) -> StoreResult<Link> {
    let source = if include_invalid { "links" } else { "valid_links" };
    let sql = format!("SELECT {} FROM {} WHERE id = ?", LINK_COLUMNS, source);

    let mut link = query_one(conn, &sql, [id], link_from_row)?
        .ok_or(StoreError::NotFound { id })?;
    link.topics = topics_for_link(conn, id)?;
    link.personas = personas_for_link(conn, id)?;
    Ok(link)
}

/// Insert a new link within the caller's transaction
pub fn insert_link(conn: &Connection, link: &NewLink, policy: VersionCopy) -> StoreResult<LinkId> {
    // Snapshot what the new version inherits before anything changes
    let inherited = match link.predecessor {
        Some(predecessor) => {
            ensure_link_exists(conn, predecessor)?;
            let topics = if policy.copies_topics() {
                topics_for_link(conn, predecessor)?
            } else {
                Vec::new()
            };
            let personas = if policy.copies_personas() {
                personas_for_link(conn, predecessor)?
            } else {
                Vec::new()
            };
            Some((predecessor, topics, personas))
        }
        None => None,
    };

    let new_id = run(
        conn,
        "INSERT INTO links (url, name, certification, valid, successor) VALUES (?, ?, ?, ?, ?)",
        params![
            link.url,
            link.name,
            link.certification,
            link.valid,
            link.successor
        ],
    )?
    .last_insert_id;

    let mut topics = link.topics.clone();
    let mut personas = link.personas.clone();

    if let Some((predecessor, inherited_topics, inherited_personas)) = inherited {
        run(
            conn,
            "UPDATE links SET successor = ?, valid = 0 WHERE id = ?",
            params![new_id, predecessor],
        )?;
        merge_unique(&mut topics, inherited_topics);
        merge_unique(&mut personas, inherited_personas);
        info!("Link {} superseded by {}", predecessor, new_id);
    }

    if !topics.is_empty() {
        replace_topics(conn, new_id, &topics)?;
    }
    if !personas.is_empty() {
        replace_personas(conn, new_id, &personas)?;
    }

    info!("Created link {} ({})", new_id, link.name);
    Ok(new_id)
}

fn write_fields(conn: &Connection, id: LinkId, fields: &LinkFields) -> StoreResult<()> {
    run(
        conn,
        "UPDATE links SET url = ?, name = ?, certification = ?, valid = ?, successor = ? WHERE id = ?",
        params![
            fields.url,
            fields.name,
            fields.certification,
            fields.valid,
            fields.successor,
            id
        ],
    )?;
    Ok(())
}

pub fn load_stats(conn: &Connection) -> StoreResult<CatalogStats> {
    let count = |sql: &str| -> StoreResult<i64> {
        Ok(query_one(conn, sql, [], |row| row.get(0))?.unwrap_or(0))
    };

    Ok(CatalogStats {
        links: count("SELECT COUNT(*) FROM links")?,
        valid_links: count("SELECT COUNT(*) FROM valid_links")?,
        superseded: count("SELECT COUNT(*) FROM links WHERE successor IS NOT NULL")?,
        topics: count("SELECT COUNT(*) FROM made_topics")?,
        personas: count("SELECT COUNT(*) FROM personas")?,
    })
}

fn link_from_row(row: &Row<'_>) -> rusqlite::Result<Link> {
    Ok(Link {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        certification: row.get(3)?,
        valid: row.get(4)?,
        successor: row.get(5)?,
        topics: Vec::new(),
        personas: Vec::new(),
    })
}

/// Append the items of `extra` not already in `target`, keeping order
fn merge_unique<T: PartialEq>(target: &mut Vec<T>, extra: Vec<T>) {
    for item in extra {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(temp_dir: &TempDir, policy: VersionCopy) -> LinkRepository {
        let gateway = Gateway::new(temp_dir.path().join("guide.db"));
        gateway
            .with_connection(|conn| {
                conn.execute_batch(
                    r#"
                    INSERT INTO made_topics (topic, made) VALUES ('sql', 'Data');
                    INSERT INTO made_topics (topic, made) VALUES ('etl', 'Data');
                    INSERT INTO made_topics (topic, made) VALUES ('css', 'Design');
                    INSERT INTO personas (id, persona) VALUES (1, 'Analyst');
                    INSERT INTO personas (id, persona) VALUES (2, 'Engineer');
                    "#,
                )?;
                Ok(())
            })
            .unwrap();
        LinkRepository::new(gateway, policy)
    }

    fn topics(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_create_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let id = repo
            .create_link(
                &NewLink::new("https://rust-lang.org", "Rust")
                    .certified(true)
                    .with_topics(topics(&["sql"]))
                    .with_personas(vec![2]),
            )
            .unwrap();

        let link = repo.find_link_by_id(id, false).unwrap();
        assert_eq!(link.url, "https://rust-lang.org");
        assert_eq!(link.name, "Rust");
        assert!(link.certification);
        assert!(link.valid);
        assert!(link.successor.is_none());
        assert_eq!(link.topics, topics(&["sql"]));
        assert_eq!(link.personas, vec![2]);
    }

    #[test]
    fn test_fetch_links_filters_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let a = repo.create_link(&NewLink::new("https://a", "A")).unwrap();
        let mut retired = NewLink::new("https://b", "B");
        retired.valid = false;
        let b = repo.create_link(&retired).unwrap();
        let c = repo.create_link(&NewLink::new("https://c", "C")).unwrap();

        let valid: Vec<LinkId> = repo
            .fetch_links(false)
            .unwrap()
            .iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(valid, vec![a, c]);
        assert!(repo.fetch_links(false).unwrap().iter().all(|l| l.valid));

        let all: Vec<LinkId> = repo.fetch_links(true).unwrap().iter().map(|l| l.id).collect();
        assert_eq!(all, vec![a, b, c]);
    }

    #[test]
    fn test_find_invalid_link() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let mut retired = NewLink::new("https://old", "Old");
        retired.valid = false;
        let id = repo.create_link(&retired).unwrap();

        let err = repo.find_link_by_id(id, false).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(!repo.find_link_by_id(id, true).unwrap().valid);

        assert!(repo.find_link_by_id(999, true).unwrap_err().is_not_found());
    }

    #[test]
    fn test_fetch_links_attaches_associations_without_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        repo.create_link(
            &NewLink::new("https://a", "A")
                .with_topics(topics(&["sql", "etl", "css"]))
                .with_personas(vec![1, 2]),
        )
        .unwrap();
        repo.create_link(&NewLink::new("https://b", "B")).unwrap();

        let links = repo.fetch_links(true).unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].topics.len(), 3);
        assert_eq!(links[0].personas, vec![1, 2]);
        assert!(links[1].topics.is_empty());
    }

    #[test]
    fn test_new_version_supersedes_predecessor() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let p = repo
            .create_link(
                &NewLink::new("https://v1", "Doc v1")
                    .with_topics(topics(&["sql", "etl"]))
                    .with_personas(vec![1]),
            )
            .unwrap();

        let new_id = repo
            .create_link(&NewLink::new("https://v2", "Doc v2").superseding(p))
            .unwrap();

        let created = repo.find_link_by_id(new_id, false).unwrap();
        assert!(created.valid);
        assert_eq!(created.topics, topics(&["sql", "etl"]));
        assert!(created.personas.is_empty());

        let predecessor = repo.find_link_by_id(p, true).unwrap();
        assert!(!predecessor.valid);
        assert_eq!(predecessor.successor, Some(new_id));
        // The predecessor keeps its own associations
        assert_eq!(predecessor.topics, topics(&["sql", "etl"]));
    }

    #[test]
    fn test_new_version_merges_supplied_topics() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let p = repo
            .create_link(&NewLink::new("https://v1", "v1").with_topics(topics(&["sql"])))
            .unwrap();
        let new_id = repo
            .create_link(
                &NewLink::new("https://v2", "v2")
                    .superseding(p)
                    .with_topics(topics(&["css", "sql"]))
                    .with_personas(vec![2]),
            )
            .unwrap();

        let created = repo.find_link_by_id(new_id, true).unwrap();
        assert_eq!(created.topics, topics(&["css", "sql"]));
        assert_eq!(created.personas, vec![2]);
    }

    #[test]
    fn test_copy_policy_both_and_neither() {
        let temp_dir = TempDir::new().unwrap();
        let both = setup(&temp_dir, VersionCopy::Both);

        let p = both
            .create_link(
                &NewLink::new("https://v1", "v1")
                    .with_topics(topics(&["sql"]))
                    .with_personas(vec![1]),
            )
            .unwrap();
        let v2 = both
            .create_link(&NewLink::new("https://v2", "v2").superseding(p))
            .unwrap();
        let created = both.find_link_by_id(v2, true).unwrap();
        assert_eq!(created.topics, topics(&["sql"]));
        assert_eq!(created.personas, vec![1]);

        let neither = LinkRepository::new(both.gateway.clone(), VersionCopy::Neither);
        let v3 = neither
            .create_link(&NewLink::new("https://v3", "v3").superseding(v2))
            .unwrap();
        let created = neither.find_link_by_id(v3, true).unwrap();
        assert!(created.topics.is_empty());
        assert!(created.personas.is_empty());
        assert_eq!(neither.find_link_by_id(v2, true).unwrap().successor, Some(v3));
    }

    #[test]
    fn test_missing_predecessor_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let err = repo
            .create_link(&NewLink::new("https://v2", "v2").superseding(77))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 77 }));
        assert!(repo.fetch_links(true).unwrap().is_empty());
    }

    #[test]
    fn test_failed_version_leaves_predecessor_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let p = repo.create_link(&NewLink::new("https://v1", "Doc")).unwrap();

        // Reusing the predecessor's name violates the UNIQUE constraint
        let err = repo
            .create_link(&NewLink::new("https://v2", "Doc").superseding(p))
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));

        let predecessor = repo.find_link_by_id(p, false).unwrap();
        assert!(predecessor.valid);
        assert!(predecessor.successor.is_none());
        assert_eq!(repo.fetch_links(true).unwrap().len(), 1);
    }

    #[test]
    fn test_update_fields_only() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let id = repo
            .create_link(&NewLink::new("https://a", "A").with_topics(topics(&["sql"])))
            .unwrap();
        let mut fields = repo.find_link_by_id(id, false).unwrap().fields();
        fields.url = "https://a.example/moved".to_string();
        fields.certification = true;

        repo.update_link(&LinkUpdate::new(id).with_fields(fields))
            .unwrap();

        let link = repo.find_link_by_id(id, false).unwrap();
        assert_eq!(link.url, "https://a.example/moved");
        assert!(link.certification);
        assert_eq!(link.topics, topics(&["sql"]));
    }

    #[test]
    fn test_update_all_aspects_together() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let id = repo.create_link(&NewLink::new("https://a", "A")).unwrap();
        let mut fields = repo.find_link_by_id(id, false).unwrap().fields();
        fields.name = "Renamed".to_string();

        repo.update_link(
            &LinkUpdate::new(id)
                .with_fields(fields)
                .with_topics(topics(&["css"]))
                .with_personas(vec![1, 2]),
        )
        .unwrap();

        let link = repo.find_link_by_id(id, false).unwrap();
        assert_eq!(link.name, "Renamed");
        assert_eq!(link.topics, topics(&["css"]));
        assert_eq!(link.personas, vec![1, 2]);
    }

    #[test]
    fn test_update_rolls_back_when_tags_fail() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let id = repo
            .create_link(&NewLink::new("https://a", "A").with_topics(topics(&["sql"])))
            .unwrap();
        let mut fields = repo.find_link_by_id(id, false).unwrap().fields();
        fields.name = "Should not stick".to_string();

        let result = repo.update_link(
            &LinkUpdate::new(id)
                .with_fields(fields)
                .with_topics(topics(&["etl", "missing"])),
        );
        assert!(matches!(result, Err(StoreError::Query(_))));

        let link = repo.find_link_by_id(id, false).unwrap();
        assert_eq!(link.name, "A");
        assert_eq!(link.topics, topics(&["sql"]));
    }

    #[test]
    fn test_update_missing_link() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let err = repo
            .update_link(&LinkUpdate::new(5).with_topics(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 5 }));
    }

    #[test]
    fn test_stats() {
        let temp_dir = TempDir::new().unwrap();
        let repo = setup(&temp_dir, VersionCopy::TopicsOnly);

        let p = repo.create_link(&NewLink::new("https://v1", "v1")).unwrap();
        repo.create_link(&NewLink::new("https://v2", "v2").superseding(p))
            .unwrap();

        let stats = repo.stats().unwrap();
        assert_eq!(stats.links, 2);
        assert_eq!(stats.valid_links, 1);
        assert_eq!(stats.superseded, 1);
        assert_eq!(stats.topics, 3);
        assert_eq!(stats.personas, 2);
    }

    #[test]
    fn test_merge_unique() {
        let mut target = vec![1, 2];
        merge_unique(&mut target, vec![2, 3, 1, 4]);
        assert_eq!(target, vec![1, 2, 3, 4]);
    }
}
