//! The reconciler and the helpers shared by every aggregate.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::Relation;
use fedreg_core::models::project::Project;
use fedreg_core::models::provider::{Provider, ProviderAttrs};
use fedreg_core::models::region::RegionAttrs;
use fedreg_core::repository::GraphStore;
use uuid::Uuid;

use crate::config::ReconcileConfig;

/// Aggregate reconciliation service.
///
/// Each call is one unit of work: a sequence of awaited store operations.
/// Nothing is rolled back when a later step fails.
pub struct Reconciler<G: GraphStore> {
    pub(crate) store: G,
    pub(crate) config: ReconcileConfig,
}

impl<G: GraphStore> Reconciler<G> {
    pub fn new(store: G, config: ReconcileConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &G {
        &self.store
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Projects owned by a provider, oldest first.
    pub async fn provider_projects(&self, provider_id: Uuid) -> FedRegResult<Vec<Project>> {
        self.store
            .targets(Relation::ProviderProject, provider_id)
            .await
    }

    /// Provider owning the region.
    pub(crate) async fn region_provider(&self, region_id: Uuid) -> FedRegResult<Provider> {
        self.store
            .single_source::<ProviderAttrs>(Relation::ProviderRegion, region_id)
            .await?
            .ok_or_else(|| FedRegError::Internal(format!("region {region_id} has no provider")))
    }

    /// Provider owning the service, through its region.
    pub(crate) async fn service_provider(&self, service_id: Uuid) -> FedRegResult<Provider> {
        let region = self
            .store
            .single_source::<RegionAttrs>(Relation::RegionService, service_id)
            .await?
            .ok_or_else(|| FedRegError::Internal(format!("service {service_id} has no region")))?;
        self.region_provider(region.id).await
    }
}

/// Fails with a Precondition error when no project is available to
/// resolve references against.
pub(crate) fn ensure_projects(provider_projects: &[Project]) -> FedRegResult<()> {
    if provider_projects.is_empty() {
        return Err(FedRegError::precondition(
            "The provider's projects list is empty",
        ));
    }
    Ok(())
}

/// Finds the project with the given provider-side uuid.
pub(crate) fn resolve_project<'p>(
    uuid: &str,
    provider_projects: &'p [Project],
) -> FedRegResult<&'p Project> {
    provider_projects
        .iter()
        .find(|p| p.attrs.uuid == uuid)
        .ok_or_else(|| {
            let valid: Vec<&str> = provider_projects
                .iter()
                .map(|p| p.attrs.uuid.as_str())
                .collect();
            FedRegError::validation(format!(
                "input project {uuid} not in the provider projects: [{}]",
                valid.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fedreg_core::models::node::Node;
    use fedreg_core::models::project::ProjectAttrs;

    fn project(uuid: &str) -> Project {
        Node {
            id: Uuid::new_v4(),
            attrs: ProjectAttrs {
                name: uuid.to_uppercase(),
                uuid: uuid.into(),
                ..Default::default()
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_project_list_is_a_precondition_failure() {
        let err = ensure_projects(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Precondition failed: The provider's projects list is empty"
        );
    }

    #[test]
    fn unknown_project_lists_valid_set() {
        let projects = vec![project("a"), project("b")];
        assert_eq!(resolve_project("b", &projects).unwrap().attrs.uuid, "b");

        let err = resolve_project("zz", &projects).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("zz"));
        assert!(message.contains("[a, b]"));
    }
}
