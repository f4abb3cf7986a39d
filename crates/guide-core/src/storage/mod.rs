//! Storage layer
//!
//! Owns everything that touches SQLite directly: opening and closing
//! connections, transactions, the schema, and the error taxonomy shared
//! by the repositories.
//!
//! ## Architecture
//!
//! - **Gateway**: one short-lived connection per operation
//! - **Schema**: created on first open, versioned in `schema_info`

pub mod error;
pub mod gateway;
pub mod schema;

pub use error::{StoreError, StoreResult};
pub use gateway::{Execution, Gateway};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
