//! Generic create / update / patch of a single node.
//!
//! Updates compute the resulting attribute set first and only write when
//! it differs from the stored one, so callers can tell a no-op from a
//! change by the returned `Option`.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::models::node::{Node, NodeAttrs, from_props, to_props, to_value_map};
use fedreg_core::repository::GraphStore;
use serde_json::{Map, Value};
use tracing::debug;

use crate::reconciler::Reconciler;

/// Attribute set resulting from applying `desired` onto `current`.
///
/// With `force` every desired attribute wins. Without it, desired
/// attributes equal to the type's default are considered not supplied and
/// keep their current value.
pub fn merge_attrs<A: NodeAttrs>(current: &A, desired: &A, force: bool) -> FedRegResult<A> {
    if force {
        return Ok(desired.clone());
    }
    let defaults = to_props(&A::default())?;
    let mut props = to_props(current)?;
    for (key, value) in to_props(desired)? {
        if defaults.get(&key) != Some(&value) {
            props.insert(key, value);
        }
    }
    from_props(props)
}

/// Attribute set resulting from applying a partial attribute map onto
/// `current`. Absent keys are untouched and `null` clears the attribute.
pub fn patch_attrs<A: NodeAttrs>(current: &A, fields: &Map<String, Value>) -> FedRegResult<A> {
    let known = to_value_map(current)?;
    let mut props = to_props(current)?;
    for (key, value) in fields {
        if !known.contains_key(key) {
            return Err(FedRegError::validation(format!(
                "unknown {} attribute '{key}'",
                A::LABEL
            )));
        }
        if value.is_null() {
            props.remove(key);
        } else {
            props.insert(key.clone(), value.clone());
        }
    }
    from_props(props).map_err(|e| match e {
        FedRegError::Validation { message } => FedRegError::validation(format!(
            "{} patch rejected: {message}",
            A::LABEL
        )),
        other => other,
    })
}

impl<G: GraphStore> Reconciler<G> {
    pub async fn create<A: NodeAttrs>(&self, attrs: &A) -> FedRegResult<Node<A>> {
        self.store.create_node(attrs).await
    }

    /// Applies `desired` onto `existing`, see [`merge_attrs`].
    pub async fn update<A: NodeAttrs>(
        &self,
        existing: &Node<A>,
        desired: &A,
        force: bool,
    ) -> FedRegResult<Option<Node<A>>> {
        let merged = merge_attrs(&existing.attrs, desired, force)?;
        self.write_if_changed(existing, merged).await
    }

    /// Applies a partial attribute map onto `existing`, see
    /// [`patch_attrs`].
    pub async fn patch<A: NodeAttrs>(
        &self,
        existing: &Node<A>,
        fields: &Map<String, Value>,
    ) -> FedRegResult<Option<Node<A>>> {
        let merged = patch_attrs(&existing.attrs, fields)?;
        self.write_if_changed(existing, merged).await
    }

    async fn write_if_changed<A: NodeAttrs>(
        &self,
        existing: &Node<A>,
        attrs: A,
    ) -> FedRegResult<Option<Node<A>>> {
        if attrs == existing.attrs {
            return Ok(None);
        }
        debug!(label = %A::LABEL, id = %existing.id, "Attributes changed");
        self.store.update_node(existing.id, &attrs).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedreg_core::models::location::LocationAttrs;
    use fedreg_core::models::provider::{ProviderAttrs, ProviderStatus};
    use serde_json::json;

    fn location() -> LocationAttrs {
        LocationAttrs {
            description: "main site".into(),
            site: "bologna".into(),
            country: "Italy".into(),
            latitude: Some(44.49),
            longitude: Some(11.34),
        }
    }

    #[test]
    fn forced_merge_applies_defaults() {
        let desired = LocationAttrs {
            site: "bologna".into(),
            country: "Italy".into(),
            ..Default::default()
        };
        let merged = merge_attrs(&location(), &desired, true).unwrap();
        assert_eq!(merged, desired);
    }

    #[test]
    fn unforced_merge_skips_default_values() {
        let desired = LocationAttrs {
            site: "bologna".into(),
            country: "Italia".into(),
            ..Default::default()
        };
        let merged = merge_attrs(&location(), &desired, false).unwrap();
        assert_eq!(merged.country, "Italia");
        assert_eq!(merged.description, "main site");
        assert_eq!(merged.latitude, Some(44.49));
    }

    #[test]
    fn unforced_merge_keeps_non_default_enum() {
        let current = ProviderAttrs {
            name: "p1".into(),
            status: ProviderStatus::Maintenance,
            ..Default::default()
        };
        let desired = ProviderAttrs {
            name: "p1".into(),
            ..Default::default()
        };
        let merged = merge_attrs(&current, &desired, false).unwrap();
        assert_eq!(merged.status, ProviderStatus::Maintenance);
    }

    #[test]
    fn patch_sets_and_clears() {
        let fields = json!({"latitude": null, "country": "IT"});
        let patched = patch_attrs(&location(), fields.as_object().unwrap()).unwrap();
        assert_eq!(patched.latitude, None);
        assert_eq!(patched.country, "IT");
        assert_eq!(patched.longitude, Some(11.34));
    }

    #[test]
    fn patch_rejects_unknown_attribute() {
        let fields = json!({"altitude": 3});
        let err = patch_attrs(&location(), fields.as_object().unwrap()).unwrap_err();
        assert!(err.to_string().contains("altitude"));
    }

    #[test]
    fn patch_rejects_clearing_required_attribute() {
        let fields = json!({"site": null});
        let err = patch_attrs(&location(), fields.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, FedRegError::Validation { .. }));
    }

    #[test]
    fn patch_with_stored_values_is_identity() {
        let current = location();
        let fields = to_props(&current).unwrap();
        assert_eq!(patch_attrs(&current, &fields).unwrap(), current);
    }
}
