//! Identity provider reconciliation.
//!
//! Identity providers are shared: every provider trusting the same
//! endpoint links the same node, each through its own edge carrying the
//! [`AuthMethod`]. User groups and SLAs hang below the identity provider,
//! so a provider only ever touches the SLAs referring to its own projects.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::identity_provider::{
    AuthMethod, CreateIdentityProvider, IdentityProvider, IdentityProviderAttrs,
};
use fedreg_core::models::project::{Project, ProjectAttrs};
use fedreg_core::models::provider::Provider;
use fedreg_core::models::sla::SlaAttrs;
use fedreg_core::models::user_group::{CreateUserGroup, UserGroup, UserGroupAttrs};
use fedreg_core::repository::{Filter, GraphStore};
use serde_json::Value;
use tracing::{debug, info};

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Links `provider` to the identity provider with the desired endpoint,
    /// creating it when no provider trusts it yet, then resolves its user
    /// groups and their SLAs.
    pub async fn link_identity_provider(
        &self,
        desired: &CreateIdentityProvider,
        provider: &Provider,
        provider_projects: &[Project],
    ) -> FedRegResult<IdentityProvider> {
        desired.validate()?;
        let idp = match self.find_identity_provider(&desired.attrs.endpoint).await? {
            Some(existing) => self
                .update(&existing, &desired.attrs, false)
                .await?
                .unwrap_or(existing),
            None => self.create(&desired.attrs).await?,
        };
        self.store
            .connect(
                Relation::ProviderIdentityProvider,
                provider.id,
                idp.id,
                Some(auth_method_props(&desired.relationship)?),
            )
            .await?;
        self.reconcile_user_groups(&idp, &desired.user_groups, provider_projects)
            .await?;
        debug!(provider = %provider.attrs.name, endpoint = %idp.attrs.endpoint, "Identity provider linked");
        Ok(idp)
    }

    /// Updates an identity provider already linked to `provider`: the
    /// authentication method on the link, the non-default attributes and
    /// the user groups.
    pub async fn update_identity_provider(
        &self,
        idp: &IdentityProvider,
        desired: &CreateIdentityProvider,
        provider: &Provider,
        provider_projects: &[Project],
    ) -> FedRegResult<Option<IdentityProvider>> {
        desired.validate()?;
        let mut changed = false;

        let current = self
            .store
            .edge_props(Relation::ProviderIdentityProvider, provider.id, idp.id)
            .await?
            .and_then(|props| serde_json::from_value::<AuthMethod>(props).ok());
        if current.as_ref() != Some(&desired.relationship) {
            self.store
                .set_edge_props(
                    Relation::ProviderIdentityProvider,
                    provider.id,
                    idp.id,
                    auth_method_props(&desired.relationship)?,
                )
                .await?;
            changed = true;
        }

        changed |= self
            .reconcile_user_groups(idp, &desired.user_groups, provider_projects)
            .await?;

        match self.update(idp, &desired.attrs, false).await? {
            Some(updated) => Ok(Some(updated)),
            None if changed => self.store.get_node(idp.id).await,
            None => Ok(None),
        }
    }

    /// Matches the identity providers trusted by `provider` with the
    /// desired ones by endpoint. Returns whether anything changed.
    pub(crate) async fn reconcile_identity_providers(
        &self,
        provider: &Provider,
        desired: &[CreateIdentityProvider],
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let mut existing = self
            .store
            .targets::<IdentityProviderAttrs>(Relation::ProviderIdentityProvider, provider.id)
            .await?;

        for item in desired {
            let current = existing
                .iter()
                .position(|i| i.attrs.endpoint == item.attrs.endpoint)
                .map(|pos| existing.swap_remove(pos));
            match current {
                Some(current) => {
                    changed |= self
                        .update_identity_provider(&current, item, provider, provider_projects)
                        .await?
                        .is_some();
                }
                None => {
                    self.link_identity_provider(item, provider, provider_projects)
                        .await?;
                    changed = true;
                }
            }
        }
        for idp in existing {
            self.detach_identity_provider(provider, &idp, provider_projects)
                .await?;
            changed = true;
        }
        Ok(changed)
    }

    /// Unlinks `provider` from the identity provider, releasing the SLAs
    /// on the provider's projects. The identity provider is removed when
    /// no other provider trusts it.
    pub async fn detach_identity_provider(
        &self,
        provider: &Provider,
        idp: &IdentityProvider,
        provider_projects: &[Project],
    ) -> FedRegResult<()> {
        let providers = self
            .store
            .count_sources(Relation::ProviderIdentityProvider, idp.id)
            .await?;
        if providers <= 1 {
            self.remove_identity_provider(idp).await?;
            return Ok(());
        }

        for group in self.identity_provider_groups(idp).await? {
            self.release_group_slas(&group, None, provider_projects)
                .await?;
        }
        self.store
            .disconnect(Relation::ProviderIdentityProvider, provider.id, idp.id)
            .await?;
        self.prune_user_groups(idp).await?;
        debug!(provider = %provider.attrs.name, endpoint = %idp.attrs.endpoint, "Identity provider detached");
        Ok(())
    }

    /// Resolves each desired group and its SLA. Groups of the identity
    /// provider that are not desired lose the SLAs referring to the
    /// provider's projects, and go away once left without SLAs.
    async fn reconcile_user_groups(
        &self,
        idp: &IdentityProvider,
        desired: &[CreateUserGroup],
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        for item in desired {
            let (group, written) = self.resolve_user_group(&item.attrs, idp).await?;
            changed |= written;
            changed |= self
                .reconcile_group_sla(&item.sla, &group, idp, provider_projects)
                .await?;
            changed |= self
                .release_group_slas(&group, Some(item.sla.attrs.doc_uuid.as_str()), provider_projects)
                .await?;
        }

        for group in self.identity_provider_groups(idp).await? {
            if desired.iter().any(|d| d.attrs.name == group.attrs.name) {
                continue;
            }
            changed |= self
                .release_group_slas(&group, None, provider_projects)
                .await?;
        }
        changed |= self.prune_user_groups(idp).await?;
        Ok(changed)
    }

    /// Detaches the provider's projects from the group's SLAs, except the
    /// SLA with document uuid `keep`.
    async fn release_group_slas(
        &self,
        group: &UserGroup,
        keep: Option<&str>,
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let slas = self
            .store
            .targets::<SlaAttrs>(Relation::UserGroupSla, group.id)
            .await?;
        for sla in slas {
            if Some(sla.attrs.doc_uuid.as_str()) == keep {
                continue;
            }
            let projects = self
                .store
                .targets::<ProjectAttrs>(Relation::SlaProject, sla.id)
                .await?;
            for project in projects {
                if provider_projects.iter().any(|p| p.id == project.id) {
                    self.release_sla_project(&sla, &project).await?;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Deletes the identity provider's groups left without SLAs, when
    /// configured to.
    async fn prune_user_groups(&self, idp: &IdentityProvider) -> FedRegResult<bool> {
        if !self.config.prune_orphan_user_groups {
            return Ok(false);
        }
        let mut pruned = false;
        for group in self.identity_provider_groups(idp).await? {
            let slas = self
                .store
                .count_targets(Relation::UserGroupSla, group.id)
                .await?;
            if slas == 0 {
                self.store.delete_node(Label::UserGroup, group.id).await?;
                info!(endpoint = %idp.attrs.endpoint, group = %group.attrs.name, "Removed user group without SLAs");
                pruned = true;
            }
        }
        Ok(pruned)
    }

    pub(crate) async fn identity_provider_groups(
        &self,
        idp: &IdentityProvider,
    ) -> FedRegResult<Vec<UserGroup>> {
        self.store
            .targets::<UserGroupAttrs>(Relation::IdentityProviderUserGroup, idp.id)
            .await
    }

    async fn find_identity_provider(
        &self,
        endpoint: &str,
    ) -> FedRegResult<Option<IdentityProvider>> {
        self.store
            .find_one::<IdentityProviderAttrs>(&Filter::eq("endpoint", endpoint))
            .await
    }
}

fn auth_method_props(method: &AuthMethod) -> FedRegResult<Value> {
    serde_json::to_value(method)
        .map_err(|e| FedRegError::Internal(format!("cannot encode auth method: {e}")))
}
