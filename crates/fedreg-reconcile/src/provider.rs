//! Provider reconciliation: the entry point for whole aggregates.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::identity_provider::IdentityProviderAttrs;
use fedreg_core::models::provider::{CreateProvider, Provider, ProviderAttrs, ProviderKind};
use fedreg_core::repository::{Filter, GraphStore};
use tracing::info;

use crate::reconciler::Reconciler;

/// What [`Reconciler::apply`] did to the provider.
#[derive(Debug)]
pub enum ApplyOutcome {
    Created(Provider),
    Updated(Provider),
    Unchanged(Provider),
}

impl ApplyOutcome {
    pub fn provider(&self) -> &Provider {
        match self {
            ApplyOutcome::Created(p) | ApplyOutcome::Updated(p) | ApplyOutcome::Unchanged(p) => p,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Created(_) => "created",
            ApplyOutcome::Updated(_) => "updated",
            ApplyOutcome::Unchanged(_) => "unchanged",
        }
    }
}

impl<G: GraphStore> Reconciler<G> {
    /// Creates a provider and its whole aggregate.
    pub async fn create_provider(&self, desired: &CreateProvider) -> FedRegResult<Provider> {
        desired.validate()?;
        if self
            .find_provider(&desired.attrs.name, desired.attrs.kind)
            .await?
            .is_some()
        {
            return Err(FedRegError::conflict(format!(
                "Provider with name {} and type {} already exists",
                desired.attrs.name, desired.attrs.kind
            )));
        }

        let provider = self.create(&desired.attrs).await?;
        for project in &desired.projects {
            self.create_project(project, &provider).await?;
        }
        let projects = self.provider_projects(provider.id).await?;
        for idp in &desired.identity_providers {
            self.link_identity_provider(idp, &provider, &projects)
                .await?;
        }
        for region in &desired.regions {
            self.create_region(region, &provider, &projects).await?;
        }

        info!(
            name = %provider.attrs.name,
            kind = %provider.attrs.kind,
            projects = desired.projects.len(),
            regions = desired.regions.len(),
            "Provider created"
        );
        Ok(provider)
    }

    /// Makes the stored aggregate of `provider` match `desired`. Returns
    /// `None` when nothing had to change.
    pub async fn update_provider(
        &self,
        provider: &Provider,
        desired: &CreateProvider,
    ) -> FedRegResult<Option<Provider>> {
        desired.validate()?;
        let mut changed = self
            .reconcile_projects(provider, &desired.projects)
            .await?;
        let projects = self.provider_projects(provider.id).await?;
        changed |= self
            .reconcile_identity_providers(provider, &desired.identity_providers, &projects)
            .await?;
        changed |= self
            .reconcile_regions(provider, &desired.regions, &projects)
            .await?;

        let updated = match self.update(provider, &desired.attrs, true).await? {
            Some(updated) => Some(updated),
            None if changed => self.store.get_node(provider.id).await?,
            None => None,
        };
        if updated.is_some() {
            info!(name = %provider.attrs.name, kind = %provider.attrs.kind, "Provider updated");
        }
        Ok(updated)
    }

    /// Deletes the provider with its projects and regions. Identity
    /// providers are unlinked, and deleted when no other provider trusts
    /// them.
    pub async fn remove_provider(&self, provider: &Provider) -> FedRegResult<()> {
        let projects = self.provider_projects(provider.id).await?;
        let idps = self
            .store
            .targets::<IdentityProviderAttrs>(Relation::ProviderIdentityProvider, provider.id)
            .await?;
        for idp in &idps {
            self.detach_identity_provider(provider, idp, &projects)
                .await?;
        }
        for region in self.provider_regions(provider).await? {
            self.remove_region(&region).await?;
        }
        for project in &projects {
            self.remove_project(project).await?;
        }
        self.store
            .delete_node(Label::Provider, provider.id)
            .await?;
        info!(name = %provider.attrs.name, kind = %provider.attrs.kind, "Provider removed");
        Ok(())
    }

    /// Creates the provider described by `desired`, or updates the one
    /// with the same name and type.
    pub async fn apply(&self, desired: &CreateProvider) -> FedRegResult<ApplyOutcome> {
        match self
            .find_provider(&desired.attrs.name, desired.attrs.kind)
            .await?
        {
            Some(existing) => match self.update_provider(&existing, desired).await? {
                Some(updated) => Ok(ApplyOutcome::Updated(updated)),
                None => Ok(ApplyOutcome::Unchanged(existing)),
            },
            None => Ok(ApplyOutcome::Created(self.create_provider(desired).await?)),
        }
    }

    pub async fn find_provider(
        &self,
        name: &str,
        kind: ProviderKind,
    ) -> FedRegResult<Option<Provider>> {
        self.store
            .find_one::<ProviderAttrs>(&Filter::eq("name", name).and("type", kind.as_str()))
            .await
    }
}
