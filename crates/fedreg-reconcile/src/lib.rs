//! Federation Registry reconciliation engine.
//!
//! Takes the desired state of a provider aggregate and makes the graph
//! store match it: nodes are created, updated or removed and relations
//! connected or disconnected, one store call at a time. Every update
//! operation returns `None` when nothing had to change.
//!
//! All operations live on [`Reconciler`], which is generic over the
//! [`GraphStore`](fedreg_core::repository::GraphStore) so that this crate
//! has no dependency on the database crate.

pub mod access;
pub mod config;
mod identity_provider;
mod items;
mod location;
mod project;
mod provider;
pub mod query;
mod quota;
mod reconciler;
mod region;
mod remove;
mod service;
mod sla;
pub mod upsert;
mod user_group;

pub use config::ReconcileConfig;
pub use provider::ApplyOutcome;
pub use reconciler::Reconciler;
