//! Catalog interface
//!
//! The `Catalog` is the data-access contract a UI or CLI calls. Each
//! operation runs its synchronous store work on a blocking worker, so the
//! connection it opens is used and closed on a single thread.
//!
//! ## Usage
//!
//! ```ignore
//! let catalog = Catalog::open()?;
//!
//! let id = catalog.create_link(NewLink::new("https://example.com", "Example")).await?;
//! let links = catalog.fetch_links(false).await?;
//! let successors = catalog.fetch_successor_map().await?;
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::{Config, VersionCopy};
use crate::export::{restore, snapshot, ExportDocument};
use crate::lineage::{live_id, load_edges, resolve, LineageResolver, SuccessorMap};
use crate::links::{load_link, CatalogStats, LinkRepository};
use crate::models::{Link, LinkId, LinkUpdate, NewLink, Persona, PersonaId, Topic};
use crate::storage::{Gateway, StoreResult};
use crate::tags::TagRepository;

/// Async data-access interface over the link catalog
#[derive(Debug, Clone)]
pub struct Catalog {
    gateway: Gateway,
    version_copy: VersionCopy,
}

impl Catalog {
    /// Open the catalog described by the default configuration
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Self::with_config(&config))
    }

    /// Catalog for a specific configuration
    pub fn with_config(config: &Config) -> Self {
        Self::new(Gateway::from_config(config), config.version_copy)
    }

    pub fn new(gateway: Gateway, version_copy: VersionCopy) -> Self {
        Self {
            gateway,
            version_copy,
        }
    }

    /// Path of the database file
    pub fn database_path(&self) -> &Path {
        self.gateway.path()
    }

    /// Association copy policy for new versions
    pub fn version_copy(&self) -> VersionCopy {
        self.version_copy
    }

    /// Synchronous link repository
    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.gateway.clone(), self.version_copy)
    }

    /// Synchronous tag repository
    pub fn tags(&self) -> TagRepository {
        TagRepository::new(self.gateway.clone())
    }

    /// Synchronous lineage resolver
    pub fn lineage(&self) -> LineageResolver {
        LineageResolver::new(self.gateway.clone())
    }

    // ==================== Link Operations ====================

    /// All links with topics and personas attached, ordered by id
    pub async fn fetch_links(&self, include_invalid: bool) -> StoreResult<Vec<Link>> {
        let links = self.links();
        blocking(move || links.fetch_links(include_invalid)).await
    }

    /// One link by id, or `NotFound`
    pub async fn find_link_by_id(&self, id: LinkId, include_invalid: bool) -> StoreResult<Link> {
        let links = self.links();
        blocking(move || links.find_link_by_id(id, include_invalid)).await
    }

    /// Apply an update in one transaction
    pub async fn update_link(&self, update: LinkUpdate) -> StoreResult<()> {
        let links = self.links();
        blocking(move || links.update_link(&update)).await
    }

    /// Insert a link, returning its new id
    pub async fn create_link(&self, link: NewLink) -> StoreResult<LinkId> {
        let links = self.links();
        blocking(move || links.create_link(&link)).await
    }

    /// Row counts across the catalog
    pub async fn stats(&self) -> StoreResult<CatalogStats> {
        let links = self.links();
        blocking(move || links.stats()).await
    }

    // ==================== Tag Operations ====================

    /// Make `topic_keys` the complete topic set of a link
    pub async fn replace_topics_for_link(
        &self,
        link_id: LinkId,
        topic_keys: Vec<String>,
    ) -> StoreResult<()> {
        let tags = self.tags();
        blocking(move || tags.replace_topics_for_link(link_id, &topic_keys)).await
    }

    /// Make `persona_ids` the complete persona set of a link
    pub async fn replace_personas_for_link(
        &self,
        link_id: LinkId,
        persona_ids: Vec<PersonaId>,
    ) -> StoreResult<()> {
        let tags = self.tags();
        blocking(move || tags.replace_personas_for_link(link_id, &persona_ids)).await
    }

    pub async fn fetch_topics_for_link(&self, link_id: LinkId) -> StoreResult<Vec<String>> {
        let tags = self.tags();
        blocking(move || tags.fetch_topics_for_link(link_id)).await
    }

    pub async fn fetch_personas_for_link(&self, link_id: LinkId) -> StoreResult<Vec<PersonaId>> {
        let tags = self.tags();
        blocking(move || tags.fetch_personas_for_link(link_id)).await
    }

    pub async fn fetch_all_topics(&self) -> StoreResult<Vec<Topic>> {
        let tags = self.tags();
        blocking(move || tags.fetch_all_topics()).await
    }

    pub async fn fetch_all_personas(&self) -> StoreResult<Vec<Persona>> {
        let tags = self.tags();
        blocking(move || tags.fetch_all_personas()).await
    }

    // ==================== Lineage Operations ====================

    /// Terminal id for every link that has a successor
    pub async fn fetch_successor_map(&self) -> StoreResult<SuccessorMap> {
        let lineage = self.lineage();
        blocking(move || lineage.fetch_successor_map()).await
    }

    /// The live version of a link, following its successor chain
    pub async fn resolve_live(&self, id: LinkId) -> StoreResult<Link> {
        let gateway = self.gateway.clone();
        blocking(move || {
            gateway.with_connection(|conn| {
                let edges = load_edges(conn)?;
                let live = live_id(&resolve(&edges), &edges, id)?;
                load_link(conn, live, true)
            })
        })
        .await
    }

    // ==================== Export / Import ====================

    /// Snapshot links, reference data and lineage in one read transaction
    pub async fn export(&self) -> StoreResult<ExportDocument> {
        let gateway = self.gateway.clone();
        blocking(move || gateway.with_read_transaction(|tx| snapshot(tx))).await
    }

    /// Export straight to a file
    pub async fn export_to(&self, path: PathBuf) -> StoreResult<ExportDocument> {
        let doc = self.export().await?;
        let written = doc.clone();
        blocking(move || written.write_to(&path)).await?;
        Ok(doc)
    }

    /// Load an export into an empty catalog
    pub async fn import(&self, doc: ExportDocument) -> StoreResult<()> {
        let gateway = self.gateway.clone();
        blocking(move || gateway.with_transaction(|tx| restore(tx, &doc))).await
    }
}

/// Run store work on the blocking pool
async fn blocking<T, F>(work: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
