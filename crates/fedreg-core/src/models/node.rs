//! Generic graph node and the attribute-set trait.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{FedRegError, FedRegResult};
use crate::graph::Label;

/// Scalar attribute set persisted on a node of a given label.
///
/// `Default` provides the reference values used to decide which
/// attributes count as "not supplied" in a non-forced update.
pub trait NodeAttrs:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Default + PartialEq + Send + Sync + 'static
{
    const LABEL: Label;
}

/// A persisted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node<A> {
    pub id: Uuid,
    #[serde(flatten)]
    pub attrs: A,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serializes an attribute set into the property map stored on a node.
///
/// Null entries are dropped: a missing property and a null one mean the
/// same thing.
pub fn to_props<A: Serialize>(attrs: &A) -> FedRegResult<Map<String, Value>> {
    to_value_map(attrs).map(strip_nulls)
}

/// Serializes an attribute set keeping null entries, so the result lists
/// every declared attribute name.
pub fn to_value_map<A: Serialize>(attrs: &A) -> FedRegResult<Map<String, Value>> {
    match serde_json::to_value(attrs) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(FedRegError::Internal(format!(
            "attributes must serialize to an object, got {other}"
        ))),
        Err(e) => Err(FedRegError::Internal(format!(
            "failed to serialize attributes: {e}"
        ))),
    }
}

/// Rebuilds an attribute set from a stored property map.
pub fn from_props<A: DeserializeOwned>(props: Map<String, Value>) -> FedRegResult<A> {
    serde_json::from_value(Value::Object(props))
        .map_err(|e| FedRegError::validation(format!("invalid attributes: {e}")))
}

pub fn strip_nulls(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().filter(|(_, v)| !v.is_null()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        note: Option<String>,
    }

    #[test]
    fn to_props_drops_nulls() {
        let props = to_props(&Sample {
            name: "a".into(),
            note: None,
        })
        .unwrap();
        assert_eq!(Value::Object(props), json!({"name": "a"}));
    }

    #[test]
    fn from_props_treats_missing_option_as_none() {
        let mut map = Map::new();
        map.insert("name".into(), json!("a"));
        let sample: Sample = from_props(map).unwrap();
        assert_eq!(sample.note, None);
    }

    #[test]
    fn from_props_rejects_missing_required_field() {
        let err = from_props::<Sample>(Map::new()).unwrap_err();
        assert!(matches!(err, FedRegError::Validation { .. }));
    }
}
