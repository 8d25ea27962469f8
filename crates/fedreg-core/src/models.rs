//! Domain models for the Federation Registry.
//!
//! Every entity comes in up to three shapes:
//! - `XAttrs`: the scalar attribute set persisted on the graph node.
//! - `X`: the stored node, i.e. [`node::Node<XAttrs>`].
//! - `CreateX`: the desired state of the entity plus the children
//!   reconciled together with it.

pub mod flavor;
pub mod identity_provider;
pub mod image;
pub mod item;
pub mod location;
pub mod network;
pub mod node;
pub mod project;
pub mod provider;
pub mod quota;
pub mod region;
pub mod service;
pub mod sla;
pub mod user_group;
