//! Service reconciliation.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::flavor::FlavorAttrs;
use fedreg_core::models::image::ImageAttrs;
use fedreg_core::models::network::NetworkAttrs;
use fedreg_core::models::project::Project;
use fedreg_core::models::region::Region;
use fedreg_core::models::service::{CreateService, Service, ServiceAttrs};
use fedreg_core::repository::GraphStore;
use tracing::debug;
use uuid::Uuid;

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Creates a service in `region` together with its quotas and items.
    /// The endpoint must be new among all the services of the region's
    /// provider.
    pub async fn create_service(
        &self,
        desired: &CreateService,
        region: &Region,
        provider_projects: &[Project],
    ) -> FedRegResult<Service> {
        desired.validate()?;
        let provider = self.region_provider(region.id).await?;
        for r in self.provider_regions(&provider).await? {
            let taken = self
                .region_services(r.id)
                .await?
                .into_iter()
                .any(|s| s.attrs.endpoint == desired.attrs.endpoint);
            if taken {
                return Err(FedRegError::conflict(format!(
                    "A {} service with endpoint {} belonging to provider {} already exists",
                    desired.attrs.kind, desired.attrs.endpoint, provider.attrs.name
                )));
            }
        }

        let service = self.create(&desired.attrs).await?;
        self.store
            .connect(Relation::RegionService, region.id, service.id, None)
            .await?;

        for quota in &desired.quotas {
            self.create_quota(quota, &service, provider_projects).await?;
        }
        for flavor in &desired.flavors {
            self.create_item(flavor, &service, provider_projects).await?;
        }
        for image in &desired.images {
            self.create_item(image, &service, provider_projects).await?;
        }
        for network in &desired.networks {
            self.create_item(network, &service, provider_projects).await?;
        }
        debug!(
            region = %region.attrs.name,
            endpoint = %desired.attrs.endpoint,
            kind = %desired.attrs.kind,
            "Service created"
        );
        Ok(service)
    }

    /// Updates the service attributes and fully reconciles its quotas and
    /// items. The service is returned whenever a child changed.
    pub async fn update_service(
        &self,
        service: &Service,
        desired: &CreateService,
        provider_projects: &[Project],
    ) -> FedRegResult<Option<Service>> {
        desired.validate()?;
        if desired.attrs.kind != service.attrs.kind {
            return Err(FedRegError::validation(format!(
                "service {} is a {} service, cannot become {}",
                service.attrs.endpoint, service.attrs.kind, desired.attrs.kind
            )));
        }

        let mut changed = self
            .reconcile_quotas(service, &desired.quotas, provider_projects)
            .await?;
        changed |= self
            .reconcile_items(service, &desired.flavors, provider_projects)
            .await?;
        changed |= self
            .reconcile_items(service, &desired.images, provider_projects)
            .await?;
        changed |= self
            .reconcile_items(service, &desired.networks, provider_projects)
            .await?;

        match self.update(service, &desired.attrs, true).await? {
            Some(updated) => Ok(Some(updated)),
            None if changed => self.store.get_node(service.id).await,
            None => Ok(None),
        }
    }

    /// Matches the region services with the desired ones by endpoint. A
    /// kind switch replaces the service. Returns whether any service was
    /// created, updated or removed.
    pub(crate) async fn reconcile_services(
        &self,
        region: &Region,
        desired: &[&CreateService],
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let mut existing = self.region_services(region.id).await?;

        // Removals first so that endpoints and item uuids they free can be
        // taken by the services created below.
        let mut matched = Vec::new();
        for item in desired {
            match existing
                .iter()
                .position(|s| s.attrs.endpoint == item.attrs.endpoint)
            {
                Some(pos) => {
                    let current = existing.swap_remove(pos);
                    if current.attrs.kind == item.attrs.kind {
                        matched.push((Some(current), *item));
                    } else {
                        self.remove_service(&current).await?;
                        matched.push((None, *item));
                    }
                }
                None => matched.push((None, *item)),
            }
        }
        for service in existing {
            self.remove_service(&service).await?;
            changed = true;
        }

        for (current, item) in matched {
            match current {
                Some(current) => {
                    changed |= self
                        .update_service(&current, item, provider_projects)
                        .await?
                        .is_some();
                }
                None => {
                    self.create_service(item, region, provider_projects).await?;
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Deletes the service and its quotas. Items offered by other services
    /// too are only released.
    pub async fn remove_service(&self, service: &Service) -> FedRegResult<()> {
        for quota in self.service_quotas(service.id).await? {
            self.store.delete_node(Label::Quota, quota.id).await?;
        }
        for flavor in self
            .store
            .targets::<FlavorAttrs>(Relation::ServiceFlavor, service.id)
            .await?
        {
            self.release_item(service.id, &flavor).await?;
        }
        for image in self
            .store
            .targets::<ImageAttrs>(Relation::ServiceImage, service.id)
            .await?
        {
            self.release_item(service.id, &image).await?;
        }
        for network in self
            .store
            .targets::<NetworkAttrs>(Relation::ServiceNetwork, service.id)
            .await?
        {
            self.release_item(service.id, &network).await?;
        }
        self.store.delete_node(Label::Service, service.id).await?;
        debug!(endpoint = %service.attrs.endpoint, "Service removed");
        Ok(())
    }

    pub(crate) async fn region_services(&self, region_id: Uuid) -> FedRegResult<Vec<Service>> {
        self.store
            .targets::<ServiceAttrs>(Relation::RegionService, region_id)
            .await
    }
}
