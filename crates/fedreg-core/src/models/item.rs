//! Items offered by a service: flavors, images and networks.
//!
//! An item is either shared with every project of the provider or private
//! to an explicit set of projects.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{FedRegError, FedRegResult};
use crate::graph::Relation;
use crate::models::node::NodeAttrs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Shared,
    Private,
}

impl Visibility {
    pub fn from_shared(is_shared: bool) -> Self {
        if is_shared {
            Visibility::Shared
        } else {
            Visibility::Private
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::Shared => f.write_str("shared"),
            Visibility::Private => f.write_str("private"),
        }
    }
}

/// Attribute set of a node owned by services and, when private, by
/// projects.
pub trait ServiceItem: NodeAttrs {
    /// Service -> item relation.
    const SERVICE_RELATION: Relation;
    /// Project -> item relation used by the private variant.
    const PROJECT_RELATION: Relation;

    /// Natural key, unique within a provider.
    fn uuid(&self) -> &str;

    fn is_shared(&self) -> bool;

    fn visibility(&self) -> Visibility {
        Visibility::from_shared(self.is_shared())
    }
}

/// Desired item. `projects` lists the provider-side uuids of the projects
/// allowed to use a private item and must be empty for shared ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateItem<A> {
    #[serde(flatten)]
    pub attrs: A,
    #[serde(default)]
    pub projects: Vec<String>,
}

impl<A: ServiceItem> CreateItem<A> {
    pub fn visibility(&self) -> Visibility {
        self.attrs.visibility()
    }

    pub fn validate(&self) -> FedRegResult<()> {
        let label = A::LABEL;
        let uuid = self.attrs.uuid();
        match self.visibility() {
            Visibility::Shared if !self.projects.is_empty() => Err(FedRegError::validation(
                format!("shared {label} '{uuid}' cannot list projects"),
            )),
            Visibility::Private if self.projects.is_empty() => Err(FedRegError::validation(
                format!("private {label} '{uuid}' needs at least one project"),
            )),
            _ => Ok(()),
        }
    }
}

/// Fails when two services of one provider describe the same private
/// item uuid with different attributes or projects. Such items share a
/// single node, so the descriptions must agree.
pub fn ensure_consistent_private<'a, A: ServiceItem>(
    items: impl IntoIterator<Item = &'a CreateItem<A>>,
) -> FedRegResult<()> {
    let mut seen: HashMap<&str, &CreateItem<A>> = HashMap::new();
    for item in items {
        if item.visibility() != Visibility::Private {
            continue;
        }
        let uuid = item.attrs.uuid();
        match seen.get(uuid) {
            Some(first) if first.attrs != item.attrs || project_set(first) != project_set(item) => {
                return Err(FedRegError::validation(format!(
                    "private {} '{uuid}' is described differently by two services",
                    A::LABEL
                )));
            }
            Some(_) => {}
            None => {
                seen.insert(uuid, item);
            }
        }
    }
    Ok(())
}

fn project_set<A>(item: &CreateItem<A>) -> BTreeSet<&str> {
    item.projects.iter().map(String::as_str).collect()
}

pub(crate) fn default_shared() -> bool {
    true
}
