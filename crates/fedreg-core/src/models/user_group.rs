//! User group domain model.

use serde::{Deserialize, Serialize};

use crate::graph::Label;
use crate::models::node::{Node, NodeAttrs};
use crate::models::sla::CreateSla;

/// A group of users defined in an identity provider. `name` is unique
/// within its identity provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserGroupAttrs {
    #[serde(default)]
    pub description: String,
    pub name: String,
}

impl NodeAttrs for UserGroupAttrs {
    const LABEL: Label = Label::UserGroup;
}

pub type UserGroup = Node<UserGroupAttrs>;

/// Desired user group together with the agreement granting it access to
/// one of the provider's projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserGroup {
    #[serde(flatten)]
    pub attrs: UserGroupAttrs,
    pub sla: CreateSla,
}
