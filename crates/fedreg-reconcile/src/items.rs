//! Flavor, image and network reconciliation.
//!
//! Items are identified by their uuid within a provider: the same uuid on
//! two providers yields two independent nodes. A private item is reused by
//! another service of the same provider only when it already serves one
//! of the desired projects; the reused node then takes the desired
//! attributes and project set, so every service of a provider must
//! describe a private uuid the same way.

use std::collections::HashSet;

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::models::item::{CreateItem, ServiceItem, Visibility};
use fedreg_core::models::node::Node;
use fedreg_core::models::project::{Project, ProjectAttrs};
use fedreg_core::models::provider::Provider;
use fedreg_core::models::service::{Service, ServiceAttrs};
use fedreg_core::repository::{Filter, GraphStore};
use tracing::debug;
use uuid::Uuid;

use crate::reconciler::{Reconciler, ensure_projects};

impl<G: GraphStore> Reconciler<G> {
    /// Creates the item, or reuses a matching private one of the same
    /// provider, and makes `service` offer it.
    pub async fn create_item<A: ServiceItem>(
        &self,
        desired: &CreateItem<A>,
        service: &Service,
        provider_projects: &[Project],
    ) -> FedRegResult<Node<A>> {
        desired.validate()?;
        let visibility = desired.visibility();
        let projects = match visibility {
            Visibility::Private => select_projects(desired, provider_projects)?,
            Visibility::Shared => Vec::new(),
        };

        let provider = self.service_provider(service.id).await?;
        let same_provider = self.provider_items::<A>(desired.attrs.uuid(), &provider).await?;

        let wanted: HashSet<Uuid> = projects.iter().map(|p| p.id).collect();
        let mut reused = None;
        let mut conflicting = false;
        for candidate in same_provider {
            let reusable = visibility == Visibility::Private
                && candidate.attrs.visibility() == Visibility::Private
                && self
                    .item_project_ids::<A>(candidate.id)
                    .await?
                    .iter()
                    .any(|id| wanted.contains(id));
            if reusable {
                reused = Some(candidate);
                break;
            }
            conflicting = true;
        }
        if reused.is_none() && conflicting {
            return Err(FedRegError::conflict(format!(
                "A {visibility} {} with uuid {} belonging to provider {} already exists",
                A::LABEL,
                desired.attrs.uuid(),
                provider.attrs.name
            )));
        }

        let item = match reused {
            Some(item) => {
                let item = self
                    .update_item(&item, desired, provider_projects)
                    .await?
                    .unwrap_or(item);
                self.store
                    .connect(A::SERVICE_RELATION, service.id, item.id, None)
                    .await?;
                item
            }
            None => {
                let item = self.create(&desired.attrs).await?;
                self.store
                    .connect(A::SERVICE_RELATION, service.id, item.id, None)
                    .await?;
                for project in projects {
                    self.store
                        .connect(A::PROJECT_RELATION, project.id, item.id, None)
                        .await?;
                }
                item
            }
        };
        debug!(label = %A::LABEL, uuid = %desired.attrs.uuid(), %visibility, "Item offered");
        Ok(item)
    }

    /// Updates the item attributes and, for a private item, reconciles its
    /// project set. The item is returned whenever the project set changed.
    pub async fn update_item<A: ServiceItem>(
        &self,
        item: &Node<A>,
        desired: &CreateItem<A>,
        provider_projects: &[Project],
    ) -> FedRegResult<Option<Node<A>>> {
        desired.validate()?;
        let wanted: Vec<&Project> = match desired.visibility() {
            Visibility::Private => select_projects(desired, provider_projects)?,
            Visibility::Shared => Vec::new(),
        };

        let wanted_ids: HashSet<Uuid> = wanted.iter().map(|p| p.id).collect();
        let current = self.item_project_ids::<A>(item.id).await?;
        let mut projects_changed = false;
        for project in &wanted {
            if !current.contains(&project.id) {
                self.store
                    .connect(A::PROJECT_RELATION, project.id, item.id, None)
                    .await?;
                projects_changed = true;
            }
        }
        for project_id in current {
            if !wanted_ids.contains(&project_id) {
                self.store
                    .disconnect(A::PROJECT_RELATION, project_id, item.id)
                    .await?;
                projects_changed = true;
            }
        }

        match self.update(item, &desired.attrs, true).await? {
            Some(updated) => Ok(Some(updated)),
            None if projects_changed => self.store.get_node(item.id).await,
            None => Ok(None),
        }
    }

    /// Matches the items offered by `service` with the desired ones by
    /// uuid. A visibility switch replaces the item. Returns whether any
    /// item was created, updated or removed.
    pub(crate) async fn reconcile_items<A: ServiceItem>(
        &self,
        service: &Service,
        desired: &[CreateItem<A>],
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let mut existing = self
            .store
            .targets::<A>(A::SERVICE_RELATION, service.id)
            .await?;

        for item in desired {
            let matched = existing
                .iter()
                .position(|e| e.attrs.uuid() == item.attrs.uuid())
                .map(|pos| existing.swap_remove(pos));
            match matched {
                Some(current) if current.attrs.visibility() == item.visibility() => {
                    changed |= self
                        .update_item(&current, item, provider_projects)
                        .await?
                        .is_some();
                }
                Some(current) => {
                    self.release_item(service.id, &current).await?;
                    self.create_item(item, service, provider_projects).await?;
                    changed = true;
                }
                None => {
                    self.create_item(item, service, provider_projects).await?;
                    changed = true;
                }
            }
        }
        for item in existing {
            self.release_item(service.id, &item).await?;
            changed = true;
        }
        Ok(changed)
    }

    /// Stops `service` offering the item, deleting the item when no other
    /// service offers it.
    pub(crate) async fn release_item<A: ServiceItem>(
        &self,
        service_id: Uuid,
        item: &Node<A>,
    ) -> FedRegResult<()> {
        let services = self
            .store
            .count_sources(A::SERVICE_RELATION, item.id)
            .await?;
        if services <= 1 {
            self.store.delete_node(A::LABEL, item.id).await?;
            debug!(label = %A::LABEL, uuid = %item.attrs.uuid(), "Item removed");
        } else {
            self.store
                .disconnect(A::SERVICE_RELATION, service_id, item.id)
                .await?;
        }
        Ok(())
    }

    /// Items with the given uuid offered by any service of `provider`.
    async fn provider_items<A: ServiceItem>(
        &self,
        uuid: &str,
        provider: &Provider,
    ) -> FedRegResult<Vec<Node<A>>> {
        let mut found = Vec::new();
        for candidate in self.store.find_nodes::<A>(&Filter::eq("uuid", uuid)).await? {
            let services = self
                .store
                .sources::<ServiceAttrs>(A::SERVICE_RELATION, candidate.id)
                .await?;
            // Every service of an item belongs to the same provider.
            let Some(service) = services.first() else {
                continue;
            };
            if self.service_provider(service.id).await?.id == provider.id {
                found.push(candidate);
            }
        }
        Ok(found)
    }

    async fn item_project_ids<A: ServiceItem>(&self, item_id: Uuid) -> FedRegResult<Vec<Uuid>> {
        Ok(self
            .store
            .sources::<ProjectAttrs>(A::PROJECT_RELATION, item_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }
}

/// Provider projects a private item asks for. Unknown uuids are dropped;
/// none matching is a Validation error.
fn select_projects<'p, A: ServiceItem>(
    desired: &CreateItem<A>,
    provider_projects: &'p [Project],
) -> FedRegResult<Vec<&'p Project>> {
    ensure_projects(provider_projects)?;
    let selected: Vec<&Project> = provider_projects
        .iter()
        .filter(|p| desired.projects.contains(&p.attrs.uuid))
        .collect();
    if selected.is_empty() {
        let valid: Vec<&str> = provider_projects
            .iter()
            .map(|p| p.attrs.uuid.as_str())
            .collect();
        return Err(FedRegError::validation(format!(
            "none of the projects [{}] of private {} {} is in the provider projects: [{}]",
            desired.projects.join(", "),
            A::LABEL,
            desired.attrs.uuid(),
            valid.join(", ")
        )));
    }
    Ok(selected)
}
