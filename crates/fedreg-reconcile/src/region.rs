//! Region reconciliation.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::location::LocationAttrs;
use fedreg_core::models::project::Project;
use fedreg_core::models::provider::Provider;
use fedreg_core::models::region::{CreateRegion, Region, RegionAttrs};
use fedreg_core::repository::GraphStore;
use tracing::debug;

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Creates a region of `provider` with its location and services. The
    /// name must be new within the provider.
    pub async fn create_region(
        &self,
        desired: &CreateRegion,
        provider: &Provider,
        provider_projects: &[Project],
    ) -> FedRegResult<Region> {
        desired.validate()?;
        if self
            .find_region(provider, &desired.attrs.name)
            .await?
            .is_some()
        {
            return Err(FedRegError::conflict(format!(
                "Provider {} already has a region with name {}",
                provider.attrs.name, desired.attrs.name
            )));
        }

        let region = self.create(&desired.attrs).await?;
        self.store
            .connect(Relation::ProviderRegion, provider.id, region.id, None)
            .await?;
        if let Some(location) = &desired.location {
            let location = self.resolve_location(location).await?;
            self.attach_location(&region, &location).await?;
        }
        for service in desired.services() {
            self.create_service(service, &region, provider_projects)
                .await?;
        }
        debug!(provider = %provider.attrs.name, region = %region.attrs.name, "Region created");
        Ok(region)
    }

    /// Updates the region attributes, its location and its services. The
    /// region is returned whenever a child changed.
    pub async fn update_region(
        &self,
        region: &Region,
        desired: &CreateRegion,
        provider_projects: &[Project],
    ) -> FedRegResult<Option<Region>> {
        desired.validate()?;
        let mut changed = self
            .reconcile_region_location(region, desired.location.as_ref())
            .await?;
        let services: Vec<_> = desired.services().collect();
        changed |= self
            .reconcile_services(region, &services, provider_projects)
            .await?;

        match self.update(region, &desired.attrs, true).await? {
            Some(updated) => Ok(Some(updated)),
            None if changed => self.store.get_node(region.id).await,
            None => Ok(None),
        }
    }

    /// Matches the provider regions with the desired ones by name.
    pub(crate) async fn reconcile_regions(
        &self,
        provider: &Provider,
        desired: &[CreateRegion],
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let mut existing = self.provider_regions(provider).await?;

        let mut matched = Vec::new();
        for item in desired {
            let current = existing
                .iter()
                .position(|r| r.attrs.name == item.attrs.name)
                .map(|pos| existing.swap_remove(pos));
            matched.push((current, item));
        }
        for region in existing {
            self.remove_region(&region).await?;
            changed = true;
        }

        for (current, item) in matched {
            match current {
                Some(current) => {
                    changed |= self
                        .update_region(&current, item, provider_projects)
                        .await?
                        .is_some();
                }
                None => {
                    self.create_region(item, provider, provider_projects)
                        .await?;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Deletes the region and its services. Its location goes too once no
    /// other region points at it.
    pub async fn remove_region(&self, region: &Region) -> FedRegResult<()> {
        for service in self.region_services(region.id).await? {
            self.remove_service(&service).await?;
        }
        let location = self
            .store
            .single_target::<LocationAttrs>(Relation::RegionLocation, region.id)
            .await?;
        self.store.delete_node(Label::Region, region.id).await?;
        if let Some(location) = location {
            self.prune_location(&location).await?;
        }
        debug!(region = %region.attrs.name, "Region removed");
        Ok(())
    }

    pub(crate) async fn provider_regions(&self, provider: &Provider) -> FedRegResult<Vec<Region>> {
        self.store
            .targets::<RegionAttrs>(Relation::ProviderRegion, provider.id)
            .await
    }

    async fn find_region(&self, provider: &Provider, name: &str) -> FedRegResult<Option<Region>> {
        Ok(self
            .provider_regions(provider)
            .await?
            .into_iter()
            .find(|r| r.attrs.name == name))
    }
}
