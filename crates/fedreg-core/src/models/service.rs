//! Service domain model.

use serde::{Deserialize, Serialize};

use crate::error::{FedRegError, FedRegResult};
use crate::graph::Label;
use crate::models::flavor::CreateFlavor;
use crate::models::image::CreateImage;
use crate::models::network::CreateNetwork;
use crate::models::node::{Node, NodeAttrs};
use crate::models::provider::ensure_unique;
use crate::models::quota::CreateQuota;

/// Service kind. Also used as the quota kind: a quota applies to services of
/// the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    BlockStorage,
    #[default]
    Compute,
    Identity,
    Network,
    ObjectStore,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::BlockStorage => "block-storage",
            ServiceKind::Compute => "compute",
            ServiceKind::Identity => "identity",
            ServiceKind::Network => "network",
            ServiceKind::ObjectStore => "object-store",
        }
    }

    pub fn has_quotas(self) -> bool {
        !matches!(self, ServiceKind::Identity)
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ServiceAttrs {
    #[serde(default)]
    pub description: String,
    pub endpoint: String,
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    pub name: String,
}

impl NodeAttrs for ServiceAttrs {
    const LABEL: Label = Label::Service;
}

pub type Service = Node<ServiceAttrs>;

/// Desired state of a service with its quotas and the items it offers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateService {
    #[serde(flatten)]
    pub attrs: ServiceAttrs,
    #[serde(default)]
    pub quotas: Vec<CreateQuota>,
    #[serde(default)]
    pub flavors: Vec<CreateFlavor>,
    #[serde(default)]
    pub images: Vec<CreateImage>,
    #[serde(default)]
    pub networks: Vec<CreateNetwork>,
}

impl CreateService {
    pub fn validate(&self) -> FedRegResult<()> {
        let kind = self.attrs.kind;
        let endpoint = &self.attrs.endpoint;
        if !kind.has_quotas() && !self.quotas.is_empty() {
            return Err(FedRegError::validation(format!(
                "{kind} service '{endpoint}' cannot own quotas"
            )));
        }
        if kind != ServiceKind::Compute && !(self.flavors.is_empty() && self.images.is_empty()) {
            return Err(FedRegError::validation(format!(
                "only compute services own flavors and images, '{endpoint}' is {kind}"
            )));
        }
        if kind != ServiceKind::Network && !self.networks.is_empty() {
            return Err(FedRegError::validation(format!(
                "only network services own networks, '{endpoint}' is {kind}"
            )));
        }
        for quota in &self.quotas {
            if quota.attrs.limits.kind() != kind {
                return Err(FedRegError::validation(format!(
                    "{} quota does not apply to {kind} service '{endpoint}'",
                    quota.attrs.limits.kind()
                )));
            }
        }
        ensure_unique("flavor uuid", self.flavors.iter().map(|f| f.attrs.uuid.as_str()))?;
        ensure_unique("image uuid", self.images.iter().map(|i| i.attrs.uuid.as_str()))?;
        ensure_unique("network uuid", self.networks.iter().map(|n| n.attrs.uuid.as_str()))?;
        for flavor in &self.flavors {
            flavor.validate()?;
        }
        for image in &self.images {
            image.validate()?;
        }
        for network in &self.networks {
            network.validate()?;
        }
        Ok(())
    }
}
