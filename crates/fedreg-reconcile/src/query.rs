//! Read access to single nodes and filtered, sorted, paginated lists.

use std::cmp::Ordering;

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::models::node::{Node, NodeAttrs, to_value_map};
use fedreg_core::repository::{Filter, GraphStore, PaginatedResult, Pagination, is_attribute_name};
use serde_json::Value;
use uuid::Uuid;

use crate::reconciler::Reconciler;

/// Sort order parsed from a sort key such as `name` or `-created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(key: &str) -> FedRegResult<Self> {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key, false),
        };
        if !is_attribute_name(field) {
            return Err(FedRegError::validation(format!(
                "invalid sort attribute '{field}'"
            )));
        }
        Ok(Self {
            field: field.to_string(),
            descending,
        })
    }
}

impl<G: GraphStore> Reconciler<G> {
    pub async fn get<A: NodeAttrs>(&self, id: Uuid) -> FedRegResult<Node<A>> {
        self.store
            .get_node(id)
            .await?
            .ok_or_else(|| FedRegError::not_found(A::LABEL.table(), id))
    }

    /// Nodes matching `filter`, ordered by `sort` (oldest first when
    /// absent), then paginated.
    pub async fn get_multi<A: NodeAttrs>(
        &self,
        filter: &Filter,
        sort: Option<&str>,
        pagination: Pagination,
    ) -> FedRegResult<PaginatedResult<Node<A>>> {
        filter.validate()?;
        let sort = sort.map(SortKey::parse).transpose()?;
        let mut nodes = self.store.find_nodes::<A>(filter).await?;
        if let Some(sort) = sort {
            sort_nodes(&mut nodes, &sort)?;
        }

        let total = nodes.len() as u64;
        let items = nodes
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

fn sort_nodes<A: NodeAttrs>(nodes: &mut Vec<Node<A>>, sort: &SortKey) -> FedRegResult<()> {
    let mut keyed = Vec::with_capacity(nodes.len());
    for node in nodes.drain(..) {
        let key = match sort.field.as_str() {
            "id" => Value::String(node.id.to_string()),
            "created_at" => Value::from(node.created_at.timestamp_micros()),
            "updated_at" => Value::from(node.updated_at.timestamp_micros()),
            field => {
                let mut props = to_value_map(&node.attrs)?;
                props.remove(field).ok_or_else(|| {
                    FedRegError::validation(format!(
                        "invalid sort attribute '{field}' for {}",
                        A::LABEL
                    ))
                })?
            }
        };
        keyed.push((key, node));
    }
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = compare_values(a, b);
        if sort.descending { ord.reverse() } else { ord }
    });
    nodes.extend(keyed.into_iter().map(|(_, node)| node));
    Ok(())
}

/// Total order over attribute values: nulls first, then booleans, numbers
/// and strings. Other values compare equal.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) | Value::Object(_) => 4,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_descending_sort_key() {
        let key = SortKey::parse("-name").unwrap();
        assert_eq!(key.field, "name");
        assert!(key.descending);
        assert!(!SortKey::parse("created_at").unwrap().descending);
        assert!(SortKey::parse("-").is_err());
        assert!(SortKey::parse("name; DROP").is_err());
    }

    #[test]
    fn values_order_nulls_first_and_numbers_numerically() {
        assert_eq!(compare_values(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!(1.5), &json!(1.5)), Ordering::Equal);
    }
}
