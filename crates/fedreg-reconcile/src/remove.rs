//! Removal cascades for the aggregates owned below a provider.

use fedreg_core::error::FedRegResult;
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::flavor::FlavorAttrs;
use fedreg_core::models::identity_provider::IdentityProvider;
use fedreg_core::models::image::ImageAttrs;
use fedreg_core::models::item::ServiceItem;
use fedreg_core::models::network::NetworkAttrs;
use fedreg_core::models::project::Project;
use fedreg_core::models::quota::QuotaAttrs;
use fedreg_core::models::sla::SlaAttrs;
use fedreg_core::models::user_group::UserGroup;
use fedreg_core::repository::GraphStore;
use tracing::debug;

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Deletes the project and its quotas. Private items only this project
    /// could use are deleted, and so is an SLA left without projects.
    pub async fn remove_project(&self, project: &Project) -> FedRegResult<()> {
        let quotas = self
            .store
            .targets::<QuotaAttrs>(Relation::ProjectQuota, project.id)
            .await?;
        for quota in quotas {
            self.store.delete_node(Label::Quota, quota.id).await?;
        }

        self.release_project_items::<FlavorAttrs>(project).await?;
        self.release_project_items::<ImageAttrs>(project).await?;
        self.release_project_items::<NetworkAttrs>(project).await?;

        let sla = self
            .store
            .single_source::<SlaAttrs>(Relation::SlaProject, project.id)
            .await?;
        if let Some(sla) = sla {
            self.release_sla_project(&sla, project).await?;
        }

        self.store.delete_node(Label::Project, project.id).await?;
        debug!(uuid = %project.attrs.uuid, "Project removed");
        Ok(())
    }

    /// Deletes the identity provider with its user groups and their SLAs.
    pub async fn remove_identity_provider(&self, idp: &IdentityProvider) -> FedRegResult<()> {
        for group in self.identity_provider_groups(idp).await? {
            self.remove_user_group(&group).await?;
        }
        self.store
            .delete_node(Label::IdentityProvider, idp.id)
            .await?;
        debug!(endpoint = %idp.attrs.endpoint, "Identity provider removed");
        Ok(())
    }

    /// Deletes the user group and its SLAs.
    pub async fn remove_user_group(&self, group: &UserGroup) -> FedRegResult<()> {
        let slas = self
            .store
            .targets::<SlaAttrs>(Relation::UserGroupSla, group.id)
            .await?;
        for sla in slas {
            self.store.delete_node(Label::Sla, sla.id).await?;
        }
        self.store.delete_node(Label::UserGroup, group.id).await?;
        Ok(())
    }

    async fn release_project_items<A: ServiceItem>(&self, project: &Project) -> FedRegResult<()> {
        let items = self
            .store
            .targets::<A>(A::PROJECT_RELATION, project.id)
            .await?;
        for item in items {
            let projects = self
                .store
                .count_sources(A::PROJECT_RELATION, item.id)
                .await?;
            if projects <= 1 {
                self.store.delete_node(A::LABEL, item.id).await?;
            } else {
                self.store
                    .disconnect(A::PROJECT_RELATION, project.id, item.id)
                    .await?;
            }
        }
        Ok(())
    }
}
