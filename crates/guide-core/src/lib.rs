//! Guide Core Library
//!
//! This crate provides the data-access core for Guide, a curated catalog
//! of web links annotated with topics, personas, a trust marker and a
//! version lineage.
//!
//! # Architecture
//!
//! - **SQLite**: the single local store, opened per operation
//! - **Lineage**: superseded links point forward to their successor, and
//!   every chain resolves to a terminal, currently valid link
//!
//! # Quick Start
//!
//! ```text
//! let catalog = Catalog::open()?;
//!
//! // Create a link, then a new version of it
//! let v1 = catalog.create_link(NewLink::new("https://example.com", "Example")).await?;
//! let v2 = catalog
//!     .create_link(NewLink::new("https://example.com/v2", "Example v2").superseding(v1))
//!     .await?;
//!
//! // Redirect the old id to its live version
//! let live = catalog.resolve_live(v1).await?;
//! ```
//!
//! # Modules
//!
//! - `catalog`: Async data-access interface (main entry point)
//! - `models`: Links, topics, personas and request types
//! - `links`: Link repository
//! - `tags`: Topic and persona associations
//! - `lineage`: Successor chain resolution
//! - `export`: JSON export and import
//! - `storage`: Connection gateway, schema and errors
//! - `config`: Application configuration

pub mod catalog;
pub mod config;
pub mod export;
pub mod lineage;
pub mod links;
pub mod models;
pub mod storage;
pub mod tags;

pub use catalog::Catalog;
pub use config::{Config, VersionCopy};
pub use export::ExportDocument;
pub use lineage::{CycleReport, LineageResolver, SuccessorMap};
pub use links::{CatalogStats, LinkRepository};
pub use models::{Link, LinkFields, LinkId, LinkUpdate, NewLink, Persona, PersonaId, Topic};
pub use storage::{Gateway, StoreError, StoreResult};
pub use tags::TagRepository;
