//! Persistence adapter contract.
//!
//! The reconcilers only talk to storage through [`GraphStore`]: typed nodes
//! addressed by id, directed relations between them and optional edge
//! properties. Implementations enforce the declared relation cardinality
//! on every connect and disconnect.

use std::fmt;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{FedRegError, FedRegResult};
use crate::graph::{Label, Relation};
use crate::models::node::{Node, NodeAttrs};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// Conjunction of attribute equality conditions.
///
/// A condition on `null` matches nodes where the attribute is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::new().and(field, value)
    }

    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions.push((field.to_owned(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Rejects attribute names that are not plain identifiers, since they
    /// end up in query text.
    pub fn validate(&self) -> FedRegResult<()> {
        for (field, _) in &self.conditions {
            if !is_attribute_name(field) {
                return Err(FedRegError::validation(format!(
                    "invalid attribute name '{field}' in filter"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, props: &Map<String, Value>) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| props.get(field).unwrap_or(&Value::Null) == value)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (field, value)) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        f.write_str("}")
    }
}

pub fn is_attribute_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

pub trait GraphStore: Send + Sync {
    /// Persists a new node with a freshly generated id.
    fn create_node<A: NodeAttrs>(
        &self,
        attrs: &A,
    ) -> impl Future<Output = FedRegResult<Node<A>>> + Send;

    fn get_node<A: NodeAttrs>(
        &self,
        id: Uuid,
    ) -> impl Future<Output = FedRegResult<Option<Node<A>>>> + Send;

    /// Replaces the attributes of an existing node and bumps `updated_at`.
    fn update_node<A: NodeAttrs>(
        &self,
        id: Uuid,
        attrs: &A,
    ) -> impl Future<Output = FedRegResult<Node<A>>> + Send;

    /// Deletes a node together with every edge touching it. Deleting a
    /// missing node is not an error.
    fn delete_node(&self, label: Label, id: Uuid) -> impl Future<Output = FedRegResult<()>> + Send;

    /// Nodes matching every condition of `filter`, oldest first.
    fn find_nodes<A: NodeAttrs>(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = FedRegResult<Vec<Node<A>>>> + Send;

    /// At most one node matching `filter`; more than one is a
    /// [`FedRegError::MultipleMatches`].
    fn find_one<A: NodeAttrs>(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = FedRegResult<Option<Node<A>>>> + Send {
        async move {
            let mut nodes = self.find_nodes::<A>(filter).await?;
            if nodes.len() > 1 {
                return Err(FedRegError::MultipleMatches {
                    entity: A::LABEL.to_string(),
                    filter: filter.to_string(),
                });
            }
            Ok(nodes.pop())
        }
    }

    /// Creates the `from -> to` edge. Connecting an already connected pair
    /// only replaces the edge properties when some are given. Fails with a
    /// [`FedRegError::Cardinality`] when either end would exceed its
    /// maximum.
    fn connect(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
        props: Option<Value>,
    ) -> impl Future<Output = FedRegResult<()>> + Send;

    /// Removes the `from -> to` edge. Fails with a
    /// [`FedRegError::Cardinality`] when the target would drop below the
    /// minimum number of sources; owners must replace or delete the target
    /// instead.
    fn disconnect(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
    ) -> impl Future<Output = FedRegResult<()>> + Send;

    /// Moves the single `One` source of `to` onto `new_from` in one step.
    fn replace_source(
        &self,
        rel: Relation,
        to: Uuid,
        new_from: Uuid,
    ) -> impl Future<Output = FedRegResult<()>> + Send;

    fn is_connected(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
    ) -> impl Future<Output = FedRegResult<bool>> + Send;

    /// Every node `from` points at through `rel`.
    fn targets<A: NodeAttrs>(
        &self,
        rel: Relation,
        from: Uuid,
    ) -> impl Future<Output = FedRegResult<Vec<Node<A>>>> + Send;

    /// Every node pointing at `to` through `rel`.
    fn sources<A: NodeAttrs>(
        &self,
        rel: Relation,
        to: Uuid,
    ) -> impl Future<Output = FedRegResult<Vec<Node<A>>>> + Send;

    fn count_targets(
        &self,
        rel: Relation,
        from: Uuid,
    ) -> impl Future<Output = FedRegResult<u64>> + Send;

    fn count_sources(
        &self,
        rel: Relation,
        to: Uuid,
    ) -> impl Future<Output = FedRegResult<u64>> + Send;

    /// The only target of `from`, checked against the declared cardinality.
    fn single_target<A: NodeAttrs>(
        &self,
        rel: Relation,
        from: Uuid,
    ) -> impl Future<Output = FedRegResult<Option<Node<A>>>> + Send {
        async move {
            let nodes = self.targets::<A>(rel, from).await?;
            single(rel, rel.targets().min(), nodes)
        }
    }

    /// The only source of `to`, checked against the declared cardinality.
    fn single_source<A: NodeAttrs>(
        &self,
        rel: Relation,
        to: Uuid,
    ) -> impl Future<Output = FedRegResult<Option<Node<A>>>> + Send {
        async move {
            let nodes = self.sources::<A>(rel, to).await?;
            single(rel, rel.sources().min(), nodes)
        }
    }

    /// Properties stored on the `from -> to` edge, `None` when the pair is
    /// not connected.
    fn edge_props(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
    ) -> impl Future<Output = FedRegResult<Option<Value>>> + Send;

    fn set_edge_props(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
        props: Value,
    ) -> impl Future<Output = FedRegResult<()>> + Send;
}

fn single<A>(rel: Relation, min: u64, mut nodes: Vec<Node<A>>) -> FedRegResult<Option<Node<A>>> {
    match nodes.len() {
        0 if min > 0 => Err(FedRegError::Cardinality {
            relation: rel.to_string(),
            message: "expected exactly one node, found none".into(),
        }),
        0 | 1 => Ok(nodes.pop()),
        n => Err(FedRegError::Cardinality {
            relation: rel.to_string(),
            message: format!("expected a single node, found {n}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_missing_as_null() {
        let props = json!({"name": "a"});
        let props = props.as_object().unwrap();
        assert!(Filter::eq("name", "a").matches(props));
        assert!(Filter::eq("name", "a").and("site", Value::Null).matches(props));
        assert!(!Filter::eq("name", "b").matches(props));
    }

    #[test]
    fn filter_rejects_odd_attribute_names() {
        assert!(Filter::eq("doc_uuid", "x").validate().is_ok());
        assert!(Filter::eq("name` = 1 OR true", "x").validate().is_err());
        assert!(Filter::eq("", "x").validate().is_err());
    }

    #[test]
    fn filter_display_lists_conditions() {
        let filter = Filter::eq("name", "p1").and("type", "openstack");
        assert_eq!(filter.to_string(), r#"{name="p1", type="openstack"}"#);
    }
}
