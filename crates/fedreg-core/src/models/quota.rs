//! Quota domain model.
//!
//! A quota carries the limits a project may consume on one service. The
//! limit set depends on the quota kind, which is the `type` discriminant of
//! the flattened [`QuotaLimits`].

use serde::{Deserialize, Serialize};

use crate::graph::Label;
use crate::models::node::{Node, NodeAttrs};
use crate::models::service::ServiceKind;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlockStorageLimits {
    #[serde(default)]
    pub gigabytes: Option<i64>,
    #[serde(default)]
    pub per_volume_gigabytes: Option<i64>,
    #[serde(default)]
    pub volumes: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComputeLimits {
    #[serde(default)]
    pub cores: Option<i64>,
    #[serde(default)]
    pub instances: Option<i64>,
    /// MiB.
    #[serde(default)]
    pub ram: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkLimits {
    #[serde(default)]
    pub public_ips: Option<i64>,
    #[serde(default)]
    pub networks: Option<i64>,
    #[serde(default)]
    pub ports: Option<i64>,
    #[serde(default)]
    pub security_groups: Option<i64>,
    #[serde(default)]
    pub security_group_rules: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectStoreLimits {
    #[serde(default)]
    pub bytes: Option<i64>,
    #[serde(default)]
    pub containers: Option<i64>,
    #[serde(default)]
    pub objects: Option<i64>,
}

/// Kind-specific limits. `-1` means unlimited, a missing value means the
/// provider default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuotaLimits {
    BlockStorage(BlockStorageLimits),
    Compute(ComputeLimits),
    Network(NetworkLimits),
    ObjectStore(ObjectStoreLimits),
}

impl Default for QuotaLimits {
    fn default() -> Self {
        QuotaLimits::Compute(ComputeLimits::default())
    }
}

impl QuotaLimits {
    /// Kind of service this quota applies to.
    pub fn kind(&self) -> ServiceKind {
        match self {
            QuotaLimits::BlockStorage(_) => ServiceKind::BlockStorage,
            QuotaLimits::Compute(_) => ServiceKind::Compute,
            QuotaLimits::Network(_) => ServiceKind::Network,
            QuotaLimits::ObjectStore(_) => ServiceKind::ObjectStore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotaAttrs {
    #[serde(default)]
    pub description: String,
    /// Limits apply to each user of the project instead of the whole
    /// project.
    #[serde(default)]
    pub per_user: bool,
    /// The values report current usage rather than limits.
    #[serde(default)]
    pub usage: bool,
    #[serde(flatten)]
    pub limits: QuotaLimits,
}

impl NodeAttrs for QuotaAttrs {
    const LABEL: Label = Label::Quota;
}

pub type Quota = Node<QuotaAttrs>;

/// Desired quota. `project` is the provider-side uuid of the target project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateQuota {
    #[serde(flatten)]
    pub attrs: QuotaAttrs,
    pub project: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_limits_with_type_tag() {
        let attrs = QuotaAttrs {
            per_user: true,
            limits: QuotaLimits::Network(NetworkLimits {
                ports: Some(10),
                ..Default::default()
            }),
            ..Default::default()
        };
        let value = serde_json::to_value(&attrs).unwrap();
        assert_eq!(value["type"], "network");
        assert_eq!(value["ports"], 10);
        assert_eq!(value["per_user"], true);
    }

    #[test]
    fn reads_flat_desired_quota() {
        let quota: CreateQuota = serde_json::from_value(json!({
            "type": "block-storage",
            "gigabytes": 100,
            "project": "p1"
        }))
        .unwrap();
        assert_eq!(quota.attrs.limits.kind(), ServiceKind::BlockStorage);
        assert!(!quota.attrs.usage);
        assert_eq!(quota.project, "p1");
    }
}
