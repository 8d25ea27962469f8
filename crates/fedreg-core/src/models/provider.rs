//! Provider domain model.

use serde::{Deserialize, Serialize};

use crate::error::{FedRegError, FedRegResult};
use crate::graph::Label;
use crate::models::identity_provider::CreateIdentityProvider;
use crate::models::item::ensure_consistent_private;
use crate::models::node::{Node, NodeAttrs};
use crate::models::project::ProjectAttrs;
use crate::models::region::CreateRegion;
use crate::models::service::CreateService;

/// Resource management technology exposed by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Openstack,
    Kubernetes,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Openstack => "openstack",
            ProviderKind::Kubernetes => "kubernetes",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = FedRegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openstack" => Ok(ProviderKind::Openstack),
            "kubernetes" => Ok(ProviderKind::Kubernetes),
            other => Err(FedRegError::validation(format!(
                "unknown provider type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    #[default]
    Active,
    Maintenance,
    Limited,
    Deprecated,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub status: ProviderStatus,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub support_emails: Vec<String>,
}

impl NodeAttrs for ProviderAttrs {
    const LABEL: Label = Label::Provider;
}

/// A federated resource provider: the root of every aggregate.
pub type Provider = Node<ProviderAttrs>;

/// Desired state of a provider and everything it owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProvider {
    #[serde(flatten)]
    pub attrs: ProviderAttrs,
    #[serde(default)]
    pub projects: Vec<ProjectAttrs>,
    #[serde(default)]
    pub regions: Vec<CreateRegion>,
    #[serde(default)]
    pub identity_providers: Vec<CreateIdentityProvider>,
}

impl CreateProvider {
    /// Checks the document for duplicated natural keys and inconsistent
    /// nesting before any write is attempted.
    pub fn validate(&self) -> FedRegResult<()> {
        ensure_unique("project uuid", self.projects.iter().map(|p| p.uuid.as_str()))?;
        ensure_unique("region name", self.regions.iter().map(|r| r.attrs.name.as_str()))?;
        ensure_unique(
            "identity provider endpoint",
            self.identity_providers
                .iter()
                .map(|i| i.attrs.endpoint.as_str()),
        )?;
        for region in &self.regions {
            region.validate()?;
        }
        let services: Vec<&CreateService> =
            self.regions.iter().flat_map(|r| r.services()).collect();
        ensure_consistent_private(services.iter().flat_map(|s| &s.flavors))?;
        ensure_consistent_private(services.iter().flat_map(|s| &s.images))?;
        ensure_consistent_private(services.iter().flat_map(|s| &s.networks))?;
        for idp in &self.identity_providers {
            idp.validate()?;
        }
        Ok(())
    }
}

/// Fails with a Validation error naming the first repeated key.
pub fn ensure_unique<'a>(what: &str, keys: impl IntoIterator<Item = &'a str>) -> FedRegResult<()> {
    let mut seen = std::collections::HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(FedRegError::validation(format!(
                "there are multiple items with identical {what} '{key}'"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_flat_document() {
        let doc: CreateProvider = serde_json::from_value(json!({
            "name": "p1",
            "type": "kubernetes",
            "projects": [{"name": "proj", "uuid": "u1"}]
        }))
        .unwrap();
        assert_eq!(doc.attrs.kind, ProviderKind::Kubernetes);
        assert_eq!(doc.attrs.status, ProviderStatus::Active);
        assert_eq!(doc.projects.len(), 1);
        assert!(doc.regions.is_empty());
    }

    #[test]
    fn rejects_duplicate_projects() {
        let doc: CreateProvider = serde_json::from_value(json!({
            "name": "p1",
            "type": "openstack",
            "projects": [{"name": "a", "uuid": "u1"}, {"name": "b", "uuid": "u1"}]
        }))
        .unwrap();
        let err = doc.validate().unwrap_err();
        assert!(err.to_string().contains("u1"));
    }

    #[test]
    fn parses_kind() {
        assert_eq!("openstack".parse::<ProviderKind>().unwrap(), ProviderKind::Openstack);
        assert!("aws".parse::<ProviderKind>().is_err());
    }
}
