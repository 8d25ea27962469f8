//! Identity provider domain model.

use serde::{Deserialize, Serialize};

use crate::error::FedRegResult;
use crate::graph::Label;
use crate::models::node::{Node, NodeAttrs};
use crate::models::provider::ensure_unique;
use crate::models::user_group::CreateUserGroup;

/// An identity provider trusted by one or more providers. `endpoint` is
/// globally unique, so providers pointing at the same endpoint share one
/// node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentityProviderAttrs {
    #[serde(default)]
    pub description: String,
    pub endpoint: String,
    /// Token claim carrying the user's groups.
    pub group_claim: String,
}

impl NodeAttrs for IdentityProviderAttrs {
    const LABEL: Label = Label::IdentityProvider;
}

pub type IdentityProvider = Node<IdentityProviderAttrs>;

/// How a provider authenticates users against an identity provider.
/// Stored on the provider -> identity provider edge.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthMethod {
    /// Name the provider registered the identity provider under.
    pub idp_name: String,
    pub protocol: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateIdentityProvider {
    #[serde(flatten)]
    pub attrs: IdentityProviderAttrs,
    pub relationship: AuthMethod,
    #[serde(default)]
    pub user_groups: Vec<CreateUserGroup>,
}

impl CreateIdentityProvider {
    pub fn validate(&self) -> FedRegResult<()> {
        ensure_unique(
            "user group name",
            self.user_groups.iter().map(|g| g.attrs.name.as_str()),
        )?;
        for group in &self.user_groups {
            group.sla.validate()?;
        }
        Ok(())
    }
}
