//! SurrealDB implementation of [`GraphStore`].
//!
//! Nodes live in one table per [`Label`] with their attributes in `props`.
//! Relations map to RELATION tables whose `in`/`out` are the record links.
//! SurrealDB does not know about relation cardinality, so [`connect`] and
//! [`disconnect`] count the existing edges before writing.
//!
//! [`connect`]: GraphStore::connect
//! [`disconnect`]: GraphStore::disconnect

use chrono::{DateTime, Utc};
use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::node::{Node, NodeAttrs, from_props, to_props};
use fedreg_core::repository::{Filter, GraphStore};
use serde_json::{Map, Value};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct NodeRow {
    props: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct NodeRowWithId {
    record_id: String,
    props: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

#[derive(Debug, SurrealValue)]
struct EdgeRow {
    props: serde_json::Value,
}

fn props_object(props: serde_json::Value) -> Result<Map<String, Value>, DbError> {
    match props {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(DbError::Decode(format!("props is not an object: {other}"))),
    }
}

impl NodeRow {
    fn try_into_node<A: NodeAttrs>(self, id: Uuid) -> FedRegResult<Node<A>> {
        Ok(Node {
            id,
            attrs: from_props(props_object(self.props)?)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl NodeRowWithId {
    fn try_into_node<A: NodeAttrs>(self) -> FedRegResult<Node<A>> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        NodeRow {
            props: self.props,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_node(id)
    }
}

fn into_nodes<A: NodeAttrs>(rows: Vec<NodeRowWithId>) -> FedRegResult<Vec<Node<A>>> {
    rows.into_iter().map(NodeRowWithId::try_into_node).collect()
}

/// Record literal, e.g. ``sla:`<uuid>` ``.
fn record(label: Label, id: Uuid) -> String {
    format!("{}:`{id}`", label.table())
}

fn edge_where(rel: Relation, from: Uuid, to: Uuid) -> String {
    format!(
        "in = {} AND out = {}",
        record(rel.from_label(), from),
        record(rel.to_label(), to)
    )
}

fn cardinality(rel: Relation, message: String) -> FedRegError {
    FedRegError::Cardinality {
        relation: rel.to_string(),
        message,
    }
}

/// SurrealDB-backed graph store.
#[derive(Clone)]
pub struct SurrealGraphStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealGraphStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn count(&self, query: String) -> FedRegResult<u64> {
        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn exists(&self, label: Label, id: Uuid) -> FedRegResult<bool> {
        let total = self
            .count(format!(
                "SELECT count() AS total FROM {} WHERE id = {} GROUP ALL",
                label.table(),
                record(label, id)
            ))
            .await?;
        Ok(total > 0)
    }

    async fn ensure_exists(&self, label: Label, id: Uuid) -> FedRegResult<()> {
        if self.exists(label, id).await? {
            Ok(())
        } else {
            Err(FedRegError::not_found(label.table(), id))
        }
    }

    async fn select_nodes<A: NodeAttrs>(&self, query: String) -> FedRegResult<Vec<Node<A>>> {
        let mut result = self.db.query(query).await.map_err(DbError::from)?;
        let rows: Vec<NodeRowWithId> = result.take(0).map_err(DbError::from)?;
        into_nodes(rows)
    }

    async fn relate(&self, rel: Relation, from: Uuid, to: Uuid, props: Value) -> FedRegResult<()> {
        let query = format!(
            "RELATE {} -> {} -> {} SET props = $props;",
            record(rel.from_label(), from),
            rel.edge(),
            record(rel.to_label(), to)
        );
        self.db
            .query(query)
            .bind(("props", props))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        Ok(())
    }
}

impl<C: Connection> GraphStore for SurrealGraphStore<C> {
    async fn create_node<A: NodeAttrs>(&self, attrs: &A) -> FedRegResult<Node<A>> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let props = Value::Object(to_props(attrs)?);

        let result = self
            .db
            .query(format!(
                "CREATE type::record('{}', $id) SET props = $props",
                A::LABEL.table()
            ))
            .bind(("id", id_str.clone()))
            .bind(("props", props))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<NodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: A::LABEL.table().into(),
            id: id_str,
        })?;

        debug!(label = %A::LABEL, %id, "Created node");
        row.try_into_node(id)
    }

    async fn get_node<A: NodeAttrs>(&self, id: Uuid) -> FedRegResult<Option<Node<A>>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT * FROM type::record('{}', $id)",
                A::LABEL.table()
            ))
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NodeRow> = result.take(0).map_err(DbError::from)?;
        rows.into_iter()
            .next()
            .map(|row| row.try_into_node(id))
            .transpose()
    }

    async fn update_node<A: NodeAttrs>(&self, id: Uuid, attrs: &A) -> FedRegResult<Node<A>> {
        let id_str = id.to_string();
        let props = Value::Object(to_props(attrs)?);

        let result = self
            .db
            .query(format!(
                "UPDATE type::record('{}', $id) SET props = $props, \
                 updated_at = time::now()",
                A::LABEL.table()
            ))
            .bind(("id", id_str.clone()))
            .bind(("props", props))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(DbError::from_statement)?;

        let rows: Vec<NodeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: A::LABEL.table().into(),
            id: id_str,
        })?;

        debug!(label = %A::LABEL, %id, "Updated node");
        row.try_into_node(id)
    }

    async fn delete_node(&self, label: Label, id: Uuid) -> FedRegResult<()> {
        let rec = record(label, id);

        // Edges first, then the node itself.
        let mut query = String::new();
        for rel in Relation::touching(label) {
            query.push_str(&format!(
                "DELETE {} WHERE in = {rec} OR out = {rec};\n",
                rel.edge()
            ));
        }
        query.push_str(&format!("DELETE {rec};"));

        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;

        debug!(%label, %id, "Deleted node");
        Ok(())
    }

    async fn find_nodes<A: NodeAttrs>(&self, filter: &Filter) -> FedRegResult<Vec<Node<A>>> {
        filter.validate()?;

        let mut conditions = Vec::new();
        for (i, (field, value)) in filter.conditions().iter().enumerate() {
            if value.is_null() {
                conditions.push(format!("props.{field} = NONE"));
            } else {
                conditions.push(format!("props.{field} = $filter[{i}]"));
            }
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let values: Vec<Value> = filter.conditions().iter().map(|(_, v)| v.clone()).collect();
        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM {} {where_clause} \
                 ORDER BY created_at ASC",
                A::LABEL.table()
            ))
            .bind(("filter", Value::Array(values)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<NodeRowWithId> = result.take(0).map_err(DbError::from)?;
        into_nodes(rows)
    }

    async fn connect(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
        props: Option<Value>,
    ) -> FedRegResult<()> {
        if self.is_connected(rel, from, to).await? {
            if let Some(props) = props {
                self.set_edge_props(rel, from, to, props).await?;
            }
            return Ok(());
        }

        self.ensure_exists(rel.from_label(), from).await?;
        self.ensure_exists(rel.to_label(), to).await?;

        if let Some(max) = rel.targets().max() {
            let count = self.count_targets(rel, from).await?;
            if count >= max {
                return Err(cardinality(
                    rel,
                    format!(
                        "{} {from} already points at {count} {} node(s), at most {max} allowed",
                        rel.from_label(),
                        rel.to_label()
                    ),
                ));
            }
        }
        if let Some(max) = rel.sources().max() {
            let count = self.count_sources(rel, to).await?;
            if count >= max {
                return Err(cardinality(
                    rel,
                    format!(
                        "{} {to} already has {count} {} source(s), at most {max} allowed",
                        rel.to_label(),
                        rel.from_label()
                    ),
                ));
            }
        }

        self.relate(rel, from, to, props.unwrap_or_else(|| Value::Object(Map::new())))
            .await?;
        debug!(relation = %rel, %from, %to, "Connected");
        Ok(())
    }

    async fn disconnect(&self, rel: Relation, from: Uuid, to: Uuid) -> FedRegResult<()> {
        if !self.is_connected(rel, from, to).await? {
            return Ok(());
        }

        let min_sources = rel.sources().min();
        if min_sources > 0 && self.count_sources(rel, to).await? <= min_sources {
            return Err(cardinality(
                rel,
                format!(
                    "{} {to} needs at least {min_sources} {} source(s)",
                    rel.to_label(),
                    rel.from_label()
                ),
            ));
        }
        let min_targets = rel.targets().min();
        if min_targets > 0 && self.count_targets(rel, from).await? <= min_targets {
            return Err(cardinality(
                rel,
                format!(
                    "{} {from} needs at least {min_targets} {} target(s)",
                    rel.from_label(),
                    rel.to_label()
                ),
            ));
        }

        self.db
            .query(format!("DELETE {} WHERE {}", rel.edge(), edge_where(rel, from, to)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        debug!(relation = %rel, %from, %to, "Disconnected");
        Ok(())
    }

    async fn replace_source(&self, rel: Relation, to: Uuid, new_from: Uuid) -> FedRegResult<()> {
        if self.is_connected(rel, new_from, to).await? {
            return Ok(());
        }
        self.ensure_exists(rel.from_label(), new_from).await?;
        if let Some(max) = rel.targets().max() {
            let count = self.count_targets(rel, new_from).await?;
            if count >= max {
                return Err(cardinality(
                    rel,
                    format!("{} {new_from} cannot take another target", rel.from_label()),
                ));
            }
        }

        let query = format!(
            "DELETE {edge} WHERE out = {to_rec};\n\
             RELATE {from_rec} -> {edge} -> {to_rec};",
            edge = rel.edge(),
            to_rec = record(rel.to_label(), to),
            from_rec = record(rel.from_label(), new_from),
        );
        self.db
            .query(query)
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        debug!(relation = %rel, %to, %new_from, "Replaced source");
        Ok(())
    }

    async fn is_connected(&self, rel: Relation, from: Uuid, to: Uuid) -> FedRegResult<bool> {
        let total = self
            .count(format!(
                "SELECT count() AS total FROM {} WHERE {} GROUP ALL",
                rel.edge(),
                edge_where(rel, from, to)
            ))
            .await?;
        Ok(total > 0)
    }

    async fn targets<A: NodeAttrs>(&self, rel: Relation, from: Uuid) -> FedRegResult<Vec<Node<A>>> {
        debug_assert_eq!(A::LABEL, rel.to_label());
        self.select_nodes(format!(
            "SELECT meta::id(id) AS record_id, * FROM {} \
             WHERE id IN (SELECT VALUE out FROM {} WHERE in = {}) \
             ORDER BY created_at ASC",
            rel.to_label().table(),
            rel.edge(),
            record(rel.from_label(), from)
        ))
        .await
    }

    async fn sources<A: NodeAttrs>(&self, rel: Relation, to: Uuid) -> FedRegResult<Vec<Node<A>>> {
        debug_assert_eq!(A::LABEL, rel.from_label());
        self.select_nodes(format!(
            "SELECT meta::id(id) AS record_id, * FROM {} \
             WHERE id IN (SELECT VALUE in FROM {} WHERE out = {}) \
             ORDER BY created_at ASC",
            rel.from_label().table(),
            rel.edge(),
            record(rel.to_label(), to)
        ))
        .await
    }

    async fn count_targets(&self, rel: Relation, from: Uuid) -> FedRegResult<u64> {
        self.count(format!(
            "SELECT count() AS total FROM {} WHERE in = {} GROUP ALL",
            rel.edge(),
            record(rel.from_label(), from)
        ))
        .await
    }

    async fn count_sources(&self, rel: Relation, to: Uuid) -> FedRegResult<u64> {
        self.count(format!(
            "SELECT count() AS total FROM {} WHERE out = {} GROUP ALL",
            rel.edge(),
            record(rel.to_label(), to)
        ))
        .await
    }

    async fn edge_props(&self, rel: Relation, from: Uuid, to: Uuid) -> FedRegResult<Option<Value>> {
        let mut result = self
            .db
            .query(format!(
                "SELECT props FROM {} WHERE {}",
                rel.edge(),
                edge_where(rel, from, to)
            ))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<EdgeRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.into_iter().next().map(|row| row.props))
    }

    async fn set_edge_props(
        &self,
        rel: Relation,
        from: Uuid,
        to: Uuid,
        props: Value,
    ) -> FedRegResult<()> {
        let mut result = self
            .db
            .query(format!(
                "UPDATE {} SET props = $props WHERE {}",
                rel.edge(),
                edge_where(rel, from, to)
            ))
            .bind(("props", props))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_statement)?;
        let rows: Vec<EdgeRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(FedRegError::not_found(rel.edge(), format!("{from} -> {to}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_quotes_uuid() {
        let id = Uuid::nil();
        assert_eq!(
            record(Label::UserGroup, id),
            "user_group:`00000000-0000-0000-0000-000000000000`"
        );
    }

    #[test]
    fn edge_where_links_both_ends() {
        let (a, b) = (Uuid::nil(), Uuid::max());
        let clause = edge_where(Relation::SlaProject, a, b);
        assert!(clause.starts_with("in = sla:`"));
        assert!(clause.contains("out = project:`ffffffff"));
    }

    #[test]
    fn props_object_accepts_null() {
        assert!(props_object(Value::Null).unwrap().is_empty());
        assert!(props_object(Value::Bool(true)).is_err());
    }
}
