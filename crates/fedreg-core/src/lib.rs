//! Federation Registry core: domain models, graph vocabulary, error
//! taxonomy and the persistence-adapter trait shared by every crate.

pub mod error;
pub mod graph;
pub mod models;
pub mod repository;
