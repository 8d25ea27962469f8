//! Network domain model.

use serde::{Deserialize, Serialize};

use crate::graph::{Label, Relation};
use crate::models::item::{default_shared, CreateItem, ServiceItem};
use crate::models::node::{Node, NodeAttrs};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
    pub uuid: String,
    /// Reachable from outside the provider.
    #[serde(default)]
    pub is_router_external: bool,
    /// Network picked when the user does not choose one.
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub mtu: Option<u32>,
    #[serde(default)]
    pub proxy_host: Option<String>,
    #[serde(default)]
    pub proxy_user: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_shared")]
    pub is_shared: bool,
}

impl Default for NetworkAttrs {
    fn default() -> Self {
        Self {
            description: String::new(),
            name: String::new(),
            uuid: String::new(),
            is_router_external: false,
            is_default: false,
            mtu: None,
            proxy_host: None,
            proxy_user: None,
            tags: Vec::new(),
            is_shared: true,
        }
    }
}

impl NodeAttrs for NetworkAttrs {
    const LABEL: Label = Label::Network;
}

impl ServiceItem for NetworkAttrs {
    const SERVICE_RELATION: Relation = Relation::ServiceNetwork;
    const PROJECT_RELATION: Relation = Relation::ProjectNetwork;

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn is_shared(&self) -> bool {
        self.is_shared
    }
}

pub type Network = Node<NetworkAttrs>;
pub type CreateNetwork = CreateItem<NetworkAttrs>;
