//! Region domain model.

use serde::{Deserialize, Serialize};

use crate::error::{FedRegError, FedRegResult};
use crate::graph::Label;
use crate::models::location::LocationAttrs;
use crate::models::node::{Node, NodeAttrs};
use crate::models::provider::ensure_unique;
use crate::models::service::{CreateService, ServiceKind};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
}

impl NodeAttrs for RegionAttrs {
    const LABEL: Label = Label::Region;
}

pub type Region = Node<RegionAttrs>;

/// Desired state of a region, its location and its services grouped by
/// kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRegion {
    #[serde(flatten)]
    pub attrs: RegionAttrs,
    #[serde(default)]
    pub location: Option<LocationAttrs>,
    #[serde(default)]
    pub block_storage_services: Vec<CreateService>,
    #[serde(default)]
    pub compute_services: Vec<CreateService>,
    #[serde(default)]
    pub identity_services: Vec<CreateService>,
    #[serde(default)]
    pub network_services: Vec<CreateService>,
    #[serde(default)]
    pub object_store_services: Vec<CreateService>,
}

impl CreateRegion {
    /// Every desired service, regardless of kind.
    pub fn services(&self) -> impl Iterator<Item = &CreateService> {
        self.block_storage_services
            .iter()
            .chain(&self.compute_services)
            .chain(&self.identity_services)
            .chain(&self.network_services)
            .chain(&self.object_store_services)
    }

    pub fn validate(&self) -> FedRegResult<()> {
        let lists = [
            (ServiceKind::BlockStorage, &self.block_storage_services),
            (ServiceKind::Compute, &self.compute_services),
            (ServiceKind::Identity, &self.identity_services),
            (ServiceKind::Network, &self.network_services),
            (ServiceKind::ObjectStore, &self.object_store_services),
        ];
        for (kind, services) in lists {
            if let Some(s) = services.iter().find(|s| s.attrs.kind != kind) {
                return Err(FedRegError::validation(format!(
                    "service '{}' of type '{}' listed among the {kind} services of region '{}'",
                    s.attrs.endpoint, s.attrs.kind, self.attrs.name
                )));
            }
        }
        ensure_unique(
            "service endpoint",
            self.services().map(|s| s.attrs.endpoint.as_str()),
        )?;
        for service in self.services() {
            service.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_service_in_wrong_list() {
        let region: CreateRegion = serde_json::from_value(json!({
            "name": "r1",
            "compute_services": [
                {"name": "cinder", "endpoint": "https://bs.example", "type": "block-storage"}
            ]
        }))
        .unwrap();
        assert!(matches!(
            region.validate(),
            Err(FedRegError::Validation { .. })
        ));
    }

    #[test]
    fn services_chains_every_kind() {
        let region: CreateRegion = serde_json::from_value(json!({
            "name": "r1",
            "compute_services": [{"name": "nova", "endpoint": "https://c.example", "type": "compute"}],
            "network_services": [{"name": "neutron", "endpoint": "https://n.example", "type": "network"}]
        }))
        .unwrap();
        region.validate().unwrap();
        assert_eq!(region.services().count(), 2);
    }
}
