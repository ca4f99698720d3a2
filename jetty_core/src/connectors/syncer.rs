use anyhow::Result;
use async_trait::async_trait;

use super::nodes::{Entitlement, Grant, Page, Resource, ResourceId, ResourceType};
use super::SyncError;

/// Syncs one resource type.
///
/// Every listing takes the token returned by the previous call (empty to
/// start) and returns a page whose `next_token` is empty once the listing is
/// complete. A failed call leaves the caller's token untouched, so retrying
/// with the same token is safe.
#[async_trait]
pub trait ResourceSyncer: Send + Sync {
    /// The type this syncer handles.
    fn resource_type(&self) -> &ResourceType;

    /// List resources of this type under `parent`.
    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>>;

    /// List the entitlements `resource` offers.
    async fn entitlements(&self, resource: &Resource, token: &str) -> Result<Page<Entitlement>>;

    /// List the grants in effect on `resource`.
    async fn grants(&self, resource: &Resource, token: &str) -> Result<Page<Grant>>;

    /// Give `principal` the entitlement.
    async fn grant(&self, _principal: &Resource, _entitlement: &Entitlement) -> Result<()> {
        Err(SyncError::NotProvisionable(self.resource_type().id.to_owned()).into())
    }

    /// Take the grant away.
    async fn revoke(&self, _grant: &Grant) -> Result<()> {
        Err(SyncError::NotProvisionable(self.resource_type().id.to_owned()).into())
    }
}
