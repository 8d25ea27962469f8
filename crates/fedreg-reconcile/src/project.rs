//! Project reconciliation.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::Relation;
use fedreg_core::models::project::{Project, ProjectAttrs};
use fedreg_core::models::provider::Provider;
use fedreg_core::repository::GraphStore;
use tracing::debug;

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Creates a project owned by `provider`. The uuid must be new within
    /// the provider.
    pub async fn create_project(
        &self,
        desired: &ProjectAttrs,
        provider: &Provider,
    ) -> FedRegResult<Project> {
        let taken = self
            .provider_projects(provider.id)
            .await?
            .into_iter()
            .any(|p| p.attrs.uuid == desired.uuid);
        if taken {
            return Err(FedRegError::conflict(format!(
                "A project with uuid {} belonging to provider {} already exists",
                desired.uuid, provider.attrs.name
            )));
        }

        let project = self.create(desired).await?;
        self.store
            .connect(Relation::ProviderProject, provider.id, project.id, None)
            .await?;
        debug!(provider = %provider.attrs.name, uuid = %desired.uuid, "Project created");
        Ok(project)
    }

    pub async fn update_project(
        &self,
        project: &Project,
        desired: &ProjectAttrs,
    ) -> FedRegResult<Option<Project>> {
        self.update(project, desired, true).await
    }

    /// Matches the provider's projects with the desired ones by uuid.
    /// Returns whether any project was created, updated or removed.
    pub(crate) async fn reconcile_projects(
        &self,
        provider: &Provider,
        desired: &[ProjectAttrs],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let mut existing = self.provider_projects(provider.id).await?;

        for item in desired {
            match existing.iter().position(|p| p.attrs.uuid == item.uuid) {
                Some(pos) => {
                    let project = existing.swap_remove(pos);
                    changed |= self.update_project(&project, item).await?.is_some();
                }
                None => {
                    self.create_project(item, provider).await?;
                    changed = true;
                }
            }
        }
        for project in existing {
            self.remove_project(&project).await?;
            changed = true;
        }
        Ok(changed)
    }
}
