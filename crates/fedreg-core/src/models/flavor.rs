//! Flavor domain model.

use serde::{Deserialize, Serialize};

use crate::graph::{Label, Relation};
use crate::models::item::{default_shared, CreateItem, ServiceItem};
use crate::models::node::{Node, NodeAttrs};

/// Virtual machine size offered by a compute service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlavorAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
    pub uuid: String,
    /// GiB.
    #[serde(default)]
    pub disk: u64,
    /// MiB.
    #[serde(default)]
    pub ram: u64,
    #[serde(default)]
    pub vcpus: u64,
    #[serde(default)]
    pub swap: u64,
    #[serde(default)]
    pub ephemeral: u64,
    #[serde(default)]
    pub infiniband: bool,
    #[serde(default)]
    pub gpus: u64,
    #[serde(default)]
    pub gpu_model: Option<String>,
    #[serde(default)]
    pub gpu_vendor: Option<String>,
    #[serde(default)]
    pub local_storage: Option<String>,
    #[serde(default = "default_shared")]
    pub is_shared: bool,
}

impl Default for FlavorAttrs {
    fn default() -> Self {
        Self {
            description: String::new(),
            name: String::new(),
            uuid: String::new(),
            disk: 0,
            ram: 0,
            vcpus: 0,
            swap: 0,
            ephemeral: 0,
            infiniband: false,
            gpus: 0,
            gpu_model: None,
            gpu_vendor: None,
            local_storage: None,
            is_shared: true,
        }
    }
}

impl NodeAttrs for FlavorAttrs {
    const LABEL: Label = Label::Flavor;
}

impl ServiceItem for FlavorAttrs {
    const SERVICE_RELATION: Relation = Relation::ServiceFlavor;
    const PROJECT_RELATION: Relation = Relation::ProjectFlavor;

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn is_shared(&self) -> bool {
        self.is_shared
    }
}

pub type Flavor = Node<FlavorAttrs>;
pub type CreateFlavor = CreateItem<FlavorAttrs>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::Visibility;
    use serde_json::json;

    #[test]
    fn defaults_to_shared() {
        let flavor: CreateFlavor =
            serde_json::from_value(json!({"name": "tiny", "uuid": "f1"})).unwrap();
        assert_eq!(flavor.visibility(), Visibility::Shared);
        flavor.validate().unwrap();
    }

    #[test]
    fn private_flavor_needs_projects() {
        let flavor: CreateFlavor = serde_json::from_value(
            json!({"name": "tiny", "uuid": "f1", "is_shared": false}),
        )
        .unwrap();
        assert!(flavor.validate().is_err());
    }

    #[test]
    fn shared_flavor_rejects_projects() {
        let flavor: CreateFlavor = serde_json::from_value(
            json!({"name": "tiny", "uuid": "f1", "projects": ["p1"]}),
        )
        .unwrap();
        assert!(flavor.validate().is_err());
    }
}
