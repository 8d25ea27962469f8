//! SLA reconciliation.
//!
//! A project is referenced by at most one SLA. Giving a project to an SLA
//! takes it away from its previous SLA, which is deleted when that was its
//! last project.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::identity_provider::{IdentityProvider, IdentityProviderAttrs};
use fedreg_core::models::project::{Project, ProjectAttrs};
use fedreg_core::models::sla::{CreateSla, Sla, SlaAttrs};
use fedreg_core::models::user_group::{UserGroup, UserGroupAttrs};
use fedreg_core::repository::{Filter, GraphStore};
use tracing::{debug, info};

use crate::reconciler::{Reconciler, ensure_projects, resolve_project};

impl<G: GraphStore> Reconciler<G> {
    /// Creates an SLA owned by `user_group` and referring to `project`.
    pub async fn create_sla(
        &self,
        desired: &SlaAttrs,
        user_group: &UserGroup,
        project: &Project,
    ) -> FedRegResult<Sla> {
        desired.validate()?;
        if self.find_sla(&desired.doc_uuid).await?.is_some() {
            return Err(FedRegError::conflict(format!(
                "An SLA with document uuid {} already exists",
                desired.doc_uuid
            )));
        }

        let sla = self.create(desired).await?;
        self.store
            .connect(Relation::UserGroupSla, user_group.id, sla.id, None)
            .await?;
        self.attach_sla_project(&sla, project).await?;
        Ok(sla)
    }

    /// Updates the SLA attributes and moves it onto the desired project.
    ///
    /// Only the SLA's projects belonging to `provider_projects` are
    /// considered: an SLA may refer to projects of several providers.
    pub async fn update_sla(
        &self,
        sla: &Sla,
        desired: &CreateSla,
        provider_projects: &[Project],
    ) -> FedRegResult<Option<Sla>> {
        ensure_projects(provider_projects)?;
        desired.validate()?;
        let new_project = resolve_project(&desired.project, provider_projects)?;

        let current = self
            .store
            .targets::<ProjectAttrs>(Relation::SlaProject, sla.id)
            .await?;
        let old_project = current
            .iter()
            .find(|p| provider_projects.iter().any(|pp| pp.id == p.id));

        let moved = match old_project {
            Some(old) if old.id == new_project.id => false,
            Some(old) => {
                // Connect first, the SLA must keep at least one project.
                self.attach_sla_project(sla, new_project).await?;
                self.store
                    .disconnect(Relation::SlaProject, sla.id, old.id)
                    .await?;
                true
            }
            None => self.attach_sla_project(sla, new_project).await?,
        };

        match self.update(sla, &desired.attrs, true).await? {
            Some(updated) => Ok(Some(updated)),
            None if moved => self.store.get_node(sla.id).await,
            None => Ok(None),
        }
    }

    /// Makes `sla` refer to `project`, taking the project away from its
    /// previous SLA. Returns whether a new edge was created.
    pub async fn attach_sla_project(&self, sla: &Sla, project: &Project) -> FedRegResult<bool> {
        if self
            .store
            .is_connected(Relation::SlaProject, sla.id, project.id)
            .await?
        {
            return Ok(false);
        }

        let previous = self
            .store
            .single_source::<SlaAttrs>(Relation::SlaProject, project.id)
            .await?;
        if let Some(previous) = previous {
            self.release_sla_project(&previous, project).await?;
        }

        self.store
            .connect(Relation::SlaProject, sla.id, project.id, None)
            .await?;
        debug!(doc_uuid = %sla.attrs.doc_uuid, project = %project.attrs.uuid, "SLA attached");
        Ok(true)
    }

    /// Detaches `project` from `sla`, deleting the SLA when it was its last
    /// project.
    pub(crate) async fn release_sla_project(&self, sla: &Sla, project: &Project) -> FedRegResult<()> {
        let projects = self
            .store
            .count_targets(Relation::SlaProject, sla.id)
            .await?;
        if projects <= 1 {
            self.store.delete_node(Label::Sla, sla.id).await?;
            info!(doc_uuid = %sla.attrs.doc_uuid, "Removed SLA left without projects");
        } else {
            self.store
                .disconnect(Relation::SlaProject, sla.id, project.id)
                .await?;
        }
        Ok(())
    }

    /// Creates the desired SLA for `user_group`, or updates the existing
    /// one with the same document uuid. An existing SLA owned by another
    /// group is a conflict. Returns whether anything changed.
    pub(crate) async fn reconcile_group_sla(
        &self,
        desired: &CreateSla,
        user_group: &UserGroup,
        identity_provider: &IdentityProvider,
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        ensure_projects(provider_projects)?;
        let project = resolve_project(&desired.project, provider_projects)?;

        let Some(sla) = self.find_sla(&desired.attrs.doc_uuid).await? else {
            self.create_sla(&desired.attrs, user_group, project).await?;
            return Ok(true);
        };

        let owner = self
            .store
            .single_source::<UserGroupAttrs>(Relation::UserGroupSla, sla.id)
            .await?;
        if owner.as_ref().map(|o| o.id) != Some(user_group.id) {
            let owner_name = owner.as_ref().map(|o| o.attrs.name.as_str()).unwrap_or("-");
            let owner_idp = match &owner {
                Some(o) => self
                    .store
                    .single_source::<IdentityProviderAttrs>(
                        Relation::IdentityProviderUserGroup,
                        o.id,
                    )
                    .await?
                    .map(|idp| idp.attrs.endpoint)
                    .unwrap_or_default(),
                None => String::new(),
            };
            return Err(FedRegError::conflict(format!(
                "SLA with document uuid {} already exists, but it belongs to user group \
                 {owner_name} owned by identity provider {owner_idp} which differs from \
                 target user group {} owned by identity provider {}",
                sla.attrs.doc_uuid, user_group.attrs.name, identity_provider.attrs.endpoint
            )));
        }

        Ok(self
            .update_sla(&sla, desired, provider_projects)
            .await?
            .is_some())
    }

    async fn find_sla(&self, doc_uuid: &str) -> FedRegResult<Option<Sla>> {
        self.store
            .find_one::<SlaAttrs>(&Filter::eq("doc_uuid", doc_uuid))
            .await
    }
}
