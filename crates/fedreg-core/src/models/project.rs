//! Project domain model.

use serde::{Deserialize, Serialize};

use crate::graph::Label;
use crate::models::node::{Node, NodeAttrs};

/// A provider-side tenancy. `uuid` is the provider's own identifier and is
/// unique within a single provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
    pub uuid: String,
}

impl NodeAttrs for ProjectAttrs {
    const LABEL: Label = Label::Project;
}

pub type Project = Node<ProjectAttrs>;
