//! User group reconciliation.

use fedreg_core::error::{FedRegError, FedRegResult};
use fedreg_core::graph::Relation;
use fedreg_core::models::identity_provider::IdentityProvider;
use fedreg_core::models::user_group::{UserGroup, UserGroupAttrs};
use fedreg_core::repository::GraphStore;

use crate::reconciler::Reconciler;

impl<G: GraphStore> Reconciler<G> {
    /// Creates a user group owned by `identity_provider`. The name must be
    /// new within the identity provider.
    pub async fn create_user_group(
        &self,
        desired: &UserGroupAttrs,
        identity_provider: &IdentityProvider,
    ) -> FedRegResult<UserGroup> {
        if self
            .find_user_group(identity_provider, &desired.name)
            .await?
            .is_some()
        {
            return Err(FedRegError::conflict(format!(
                "User group with name {} already exists on identity provider {}",
                desired.name, identity_provider.attrs.endpoint
            )));
        }
        let group = self.create(desired).await?;
        self.store
            .connect(
                Relation::IdentityProviderUserGroup,
                identity_provider.id,
                group.id,
                None,
            )
            .await?;
        Ok(group)
    }

    pub async fn update_user_group(
        &self,
        group: &UserGroup,
        desired: &UserGroupAttrs,
    ) -> FedRegResult<Option<UserGroup>> {
        self.update(group, desired, true).await
    }

    /// Returns the identity provider's group with the desired name, patched
    /// with the non-default desired values, or a new one. The flag tells
    /// whether anything was written.
    pub(crate) async fn resolve_user_group(
        &self,
        desired: &UserGroupAttrs,
        identity_provider: &IdentityProvider,
    ) -> FedRegResult<(UserGroup, bool)> {
        match self.find_user_group(identity_provider, &desired.name).await? {
            Some(existing) => match self.update(&existing, desired, false).await? {
                Some(updated) => Ok((updated, true)),
                None => Ok((existing, false)),
            },
            None => Ok((self.create_user_group(desired, identity_provider).await?, true)),
        }
    }

    pub(crate) async fn find_user_group(
        &self,
        identity_provider: &IdentityProvider,
        name: &str,
    ) -> FedRegResult<Option<UserGroup>> {
        let groups = self
            .store
            .targets::<UserGroupAttrs>(Relation::IdentityProviderUserGroup, identity_provider.id)
            .await?;
        Ok(groups.into_iter().find(|g| g.attrs.name == name))
    }
}
