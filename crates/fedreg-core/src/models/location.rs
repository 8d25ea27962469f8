//! Location domain model.

use serde::{Deserialize, Serialize};

use crate::graph::Label;
use crate::models::node::{Node, NodeAttrs};

/// Physical site hosting one or more regions. `site` is globally unique.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationAttrs {
    #[serde(default)]
    pub description: String,
    pub site: String,
    pub country: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl NodeAttrs for LocationAttrs {
    const LABEL: Label = Label::Location;
}

pub type Location = Node<LocationAttrs>;
