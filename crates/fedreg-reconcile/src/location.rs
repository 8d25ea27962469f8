//! Location reconciliation.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::location::{Location, LocationAttrs};
use fedreg_core::models::region::Region;
use fedreg_core::repository::{Filter, GraphStore};
use tracing::{debug, info};

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Creates a location and, when given, makes it the region's location,
    /// replacing the previous one.
    pub async fn create_location(
        &self,
        desired: &LocationAttrs,
        region: Option<&Region>,
    ) -> FedRegResult<Location> {
        if self.find_location(&desired.site).await?.is_some() {
            return Err(FedRegError::conflict(format!(
                "A location with site name {} already exists",
                desired.site
            )));
        }
        let location = self.create(desired).await?;
        if let Some(region) = region {
            self.attach_location(region, &location).await?;
        }
        Ok(location)
    }

    pub async fn update_location(
        &self,
        location: &Location,
        desired: &LocationAttrs,
    ) -> FedRegResult<Option<Location>> {
        self.update(location, desired, true).await
    }

    /// Reconciles the optional location of a region. Returns whether the
    /// location edge or the location itself changed.
    pub(crate) async fn reconcile_region_location(
        &self,
        region: &Region,
        desired: Option<&LocationAttrs>,
    ) -> FedRegResult<bool> {
        let current = self
            .store
            .single_target::<LocationAttrs>(Relation::RegionLocation, region.id)
            .await?;

        match (current, desired) {
            (None, None) => Ok(false),
            (Some(current), Some(desired)) if current.attrs.site == desired.site => {
                Ok(self.update_location(&current, desired).await?.is_some())
            }
            (current, desired) => {
                if let Some(current) = current {
                    self.store
                        .disconnect(Relation::RegionLocation, region.id, current.id)
                        .await?;
                    self.prune_location(&current).await?;
                }
                if let Some(desired) = desired {
                    let location = self.resolve_location(desired).await?;
                    self.attach_location(region, &location).await?;
                }
                Ok(true)
            }
        }
    }

    /// Returns the location with the desired site, creating it when
    /// missing. An existing location only receives the non-default values.
    pub(crate) async fn resolve_location(&self, desired: &LocationAttrs) -> FedRegResult<Location> {
        match self.find_location(&desired.site).await? {
            Some(existing) => Ok(self
                .update(&existing, desired, false)
                .await?
                .unwrap_or(existing)),
            None => self.create_location(desired, None).await,
        }
    }

    /// Points the region at `location`, dropping its previous location
    /// edge.
    pub(crate) async fn attach_location(
        &self,
        region: &Region,
        location: &Location,
    ) -> FedRegResult<()> {
        let previous = self
            .store
            .single_target::<LocationAttrs>(Relation::RegionLocation, region.id)
            .await?;
        if let Some(previous) = previous {
            if previous.id == location.id {
                return Ok(());
            }
            self.store
                .disconnect(Relation::RegionLocation, region.id, previous.id)
                .await?;
            self.prune_location(&previous).await?;
        }
        self.store
            .connect(Relation::RegionLocation, region.id, location.id, None)
            .await?;
        debug!(region = %region.attrs.name, site = %location.attrs.site, "Location attached");
        Ok(())
    }

    /// Deletes a location no region points at, when configured to.
    pub(crate) async fn prune_location(&self, location: &Location) -> FedRegResult<()> {
        if !self.config.prune_orphan_locations {
            return Ok(());
        }
        let regions = self
            .store
            .count_sources(Relation::RegionLocation, location.id)
            .await?;
        if regions == 0 {
            self.store
                .delete_node(Label::Location, location.id)
                .await?;
            info!(site = %location.attrs.site, "Removed orphan location");
        }
        Ok(())
    }

    async fn find_location(&self, site: &str) -> FedRegResult<Option<Location>> {
        self.store
            .find_one::<LocationAttrs>(&Filter::eq("site", site))
            .await
    }
}
