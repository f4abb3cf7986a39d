//! Storage error handling
//!
//! Provides typed errors for catalog operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::models::LinkId;

/// Errors that can occur during catalog operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database could not be opened
    #[error("Failed to open database '{path}': {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Failed to create the directory holding the database
    #[error("Failed to create data directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed statement or constraint violation
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// No link with this id (or it is invalid and was excluded)
    #[error("Link not found: {id}")]
    NotFound { id: LinkId },

    /// Following successor pointers from `origin` revisits a link
    #[error("Successor cycle starting at link {origin}: {}", format_chain(.chain))]
    CycleDetected { origin: LinkId, chain: Vec<LinkId> },

    /// Import was given a store that already holds links
    #[error("Refusing to import into a catalog that already holds {links} link(s)")]
    NotEmpty { links: i64 },

    /// Export document could not be encoded or decoded
    #[error("Invalid export document: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Export or import file I/O failed
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The blocking worker running the operation did not complete
    #[error("Catalog task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Check if this error is an expected outcome rather than a fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Check if this error is recoverable by the user
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound { .. }
                | StoreError::CycleDetected { .. }
                | StoreError::CreateDirectory { .. }
                | StoreError::NotEmpty { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Connection { .. } => {
                Some("Check that the database path is correct and the file is readable.")
            }
            StoreError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            StoreError::CycleDetected { .. } => {
                Some("Point one link in the chain at a terminal link, or clear its successor.")
            }
            StoreError::NotEmpty { .. } => {
                Some("Import into a fresh database by setting GUIDE_DATABASE to a new path.")
            }
            StoreError::NotFound { .. } => Some("Use `guide link list --all` to see every id."),
            _ => None,
        }
    }
}

fn format_chain(chain: &[LinkId]) -> String {
    chain
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for catalog operations
pub type StoreResult<T> = Result<T, StoreError>;
