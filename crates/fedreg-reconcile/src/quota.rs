//! Quota reconciliation.
//!
//! On a given service a project holds at most one quota of each kind per
//! `(per_user, usage)` combination.

use std::collections::HashMap;

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::{Label, Relation};
use fedreg_core::models::project::{Project, ProjectAttrs};
use fedreg_core::models::quota::{CreateQuota, Quota, QuotaAttrs};
use fedreg_core::models::service::{Service, ServiceAttrs};
use fedreg_core::repository::GraphStore;
use uuid::Uuid;

use crate::reconciler::{Reconciler, ensure_projects, resolve_project};

/// Identity of a quota within its service.
type QuotaKey = (String, bool, bool);

impl<G: GraphStore> Reconciler<G> {
    /// Creates a quota of `project` on `service`, resolving the project
    /// among `provider_projects`.
    pub async fn create_quota(
        &self,
        desired: &CreateQuota,
        service: &Service,
        provider_projects: &[Project],
    ) -> FedRegResult<Quota> {
        ensure_projects(provider_projects)?;
        ensure_quota_kind(&desired.attrs, service)?;
        let project = resolve_project(&desired.project, provider_projects)?;
        self.ensure_quota_slot_free(&desired.attrs, project, service, None)
            .await?;

        let quota = self.create(&desired.attrs).await?;
        self.store
            .connect(Relation::ProjectQuota, project.id, quota.id, None)
            .await?;
        self.store
            .connect(Relation::QuotaService, quota.id, service.id, None)
            .await?;
        Ok(quota)
    }

    /// Updates the quota limits and moves it to the desired project.
    pub async fn update_quota(
        &self,
        quota: &Quota,
        desired: &CreateQuota,
        provider_projects: &[Project],
    ) -> FedRegResult<Option<Quota>> {
        ensure_projects(provider_projects)?;
        let new_project = resolve_project(&desired.project, provider_projects)?;
        let service = self
            .store
            .single_target::<ServiceAttrs>(Relation::QuotaService, quota.id)
            .await?
            .ok_or_else(|| FedRegError::Internal(format!("quota {} has no service", quota.id)))?;
        ensure_quota_kind(&desired.attrs, &service)?;

        let current = self
            .store
            .single_source::<ProjectAttrs>(Relation::ProjectQuota, quota.id)
            .await?;
        let moved = current.map(|p| p.id) != Some(new_project.id);
        self.ensure_quota_slot_free(&desired.attrs, new_project, &service, Some(quota.id))
            .await?;
        if moved {
            self.store
                .replace_source(Relation::ProjectQuota, quota.id, new_project.id)
                .await?;
        }

        match self.update(quota, &desired.attrs, true).await? {
            Some(updated) => Ok(Some(updated)),
            None if moved => self.store.get_node(quota.id).await,
            None => Ok(None),
        }
    }

    /// Matches the service quotas with the desired ones by project uuid,
    /// `per_user` and `usage`. Returns whether any quota was created,
    /// updated or removed.
    pub(crate) async fn reconcile_quotas(
        &self,
        service: &Service,
        desired: &[CreateQuota],
        provider_projects: &[Project],
    ) -> FedRegResult<bool> {
        let mut changed = false;
        let mut existing: HashMap<QuotaKey, Quota> = HashMap::new();
        for quota in self.service_quotas(service.id).await? {
            let project = self
                .store
                .single_source::<ProjectAttrs>(Relation::ProjectQuota, quota.id)
                .await?;
            let uuid = project.map(|p| p.attrs.uuid).unwrap_or_default();
            existing.insert((uuid, quota.attrs.per_user, quota.attrs.usage), quota);
        }

        for item in desired {
            let key = (item.project.clone(), item.attrs.per_user, item.attrs.usage);
            match existing.remove(&key) {
                Some(quota) => {
                    changed |= self
                        .update_quota(&quota, item, provider_projects)
                        .await?
                        .is_some();
                }
                None => {
                    self.create_quota(item, service, provider_projects).await?;
                    changed = true;
                }
            }
        }
        for quota in existing.into_values() {
            self.store.delete_node(Label::Quota, quota.id).await?;
            changed = true;
        }
        Ok(changed)
    }

    pub(crate) async fn service_quotas(&self, service_id: Uuid) -> FedRegResult<Vec<Quota>> {
        self.store
            .sources::<QuotaAttrs>(Relation::QuotaService, service_id)
            .await
    }

    async fn ensure_quota_slot_free(
        &self,
        attrs: &QuotaAttrs,
        project: &Project,
        service: &Service,
        except: Option<Uuid>,
    ) -> FedRegResult<()> {
        for other in self.service_quotas(service.id).await? {
            if Some(other.id) == except
                || other.attrs.limits.kind() != attrs.limits.kind()
                || other.attrs.per_user != attrs.per_user
                || other.attrs.usage != attrs.usage
            {
                continue;
            }
            if self
                .store
                .is_connected(Relation::ProjectQuota, project.id, other.id)
                .await?
            {
                return Err(FedRegError::conflict(format!(
                    "Project {} already has a {} quota with per_user={} and usage={} \
                     on service {}",
                    project.attrs.uuid,
                    attrs.limits.kind(),
                    attrs.per_user,
                    attrs.usage,
                    service.attrs.endpoint
                )));
            }
        }
        Ok(())
    }
}

fn ensure_quota_kind(attrs: &QuotaAttrs, service: &Service) -> FedRegResult<()> {
    let kind = attrs.limits.kind();
    if kind != service.attrs.kind {
        return Err(FedRegError::validation(format!(
            "a {kind} quota cannot apply to {} service {}",
            service.attrs.kind, service.attrs.endpoint
        )));
    }
    Ok(())
}
