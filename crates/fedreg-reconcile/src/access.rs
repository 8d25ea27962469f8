//! What a project can use.

use std::collections::HashSet;

use fedreg_core::error::FedRegResult;
use fedreg_core::graph::Relation;
use fedreg_core::models::item::ServiceItem;
use fedreg_core::models::node::Node;
use fedreg_core::models::project::Project;
use fedreg_core::models::quota::QuotaAttrs;
use fedreg_core::models::service::ServiceAttrs;
use fedreg_core::repository::GraphStore;

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Items of kind `A` usable by `project`: the private ones granted to
    /// it, followed by the shared ones offered by every service on which
    /// it holds a quota.
    pub async fn project_items<A: ServiceItem>(&self, project: &Project) -> FedRegResult<Vec<Node<A>>> {
        let mut items = self
            .store
            .targets::<A>(A::PROJECT_RELATION, project.id)
            .await?;
        let mut seen: HashSet<_> = items.iter().map(|i| i.id).collect();

        let quotas = self
            .store
            .targets::<QuotaAttrs>(Relation::ProjectQuota, project.id)
            .await?;
        let mut services = HashSet::new();
        for quota in quotas {
            let service = self
                .store
                .single_target::<ServiceAttrs>(Relation::QuotaService, quota.id)
                .await?;
            let Some(service) = service else { continue };
            if !services.insert(service.id) {
                continue;
            }
            for item in self
                .store
                .targets::<A>(A::SERVICE_RELATION, service.id)
                .await?
            {
                if item.attrs.is_shared() && seen.insert(item.id) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }
}
