//! Reconciliation settings.

/// Options that change how much the reconciler cleans up after itself.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Delete a location once no region points at it anymore.
    pub prune_orphan_locations: bool,
    /// Delete the user groups left without SLAs on the identity providers
    /// touched by a provider update or removal.
    pub prune_orphan_user_groups: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            prune_orphan_locations: true,
            prune_orphan_user_groups: true,
        }
    }
}
