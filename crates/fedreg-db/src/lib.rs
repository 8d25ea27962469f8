//! Federation Registry database layer.
//!
//! This crate provides:
//! - Connection settings and sessions ([`DbConfig`], [`DbManager`])
//! - Schema initialization and migrations ([`run_migrations`], [`schema_v1`])
//! - The SurrealDB [`GraphStore`](fedreg_core::repository::GraphStore)
//!   implementation ([`SurrealGraphStore`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod schema;
mod store;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::{run_migrations, schema_v1};
pub use store::SurrealGraphStore;
