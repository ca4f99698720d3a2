use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use jetty_core::connectors::nodes::{Entitlement, Grant, Page, Resource, ResourceId, ResourceType};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::connectors::SyncError;
use jetty_core::ResourceSyncer;

use super::{principal_grants, role_target_resource, Shared, TARGET_TYPE_KEY};
use crate::entitlements;
use crate::nodes::{PermissionResource, Role};
use crate::resource_types::ResourceKind;

/// Whatever roles are applied to, found by scanning user permissions.
///
/// Every role is offered on every target; the target keeps its upstream type
/// so grants can be written back as-is.
pub(crate) struct RoleTargetSyncer {
    resource_type: ResourceType,
    shared: Shared,
}

impl RoleTargetSyncer {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            resource_type: ResourceKind::Resource.resource_type(),
            shared,
        }
    }
}

fn upstream_type(resource: &Resource) -> Result<&str> {
    resource.profile_value(TARGET_TYPE_KEY).ok_or_else(|| {
        SyncError::MissingProfileField {
            resource: resource.id.to_string(),
            field: TARGET_TYPE_KEY.to_owned(),
        }
        .into()
    })
}

#[async_trait]
impl ResourceSyncer for RoleTargetSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::empty());
        };
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::User.id()))?;
        let (users, next) = self.shared.client.list_users(bag.cursor()).await?;

        let mut seen = HashSet::new();
        let resources = users
            .iter()
            .flat_map(|u| u.permissions.iter())
            .flat_map(|p| p.resources.iter())
            .filter(|r| seen.insert(r.id.to_owned()))
            .map(|r| role_target_resource(r, Some(parent.to_owned())))
            .collect();
        Ok(Page::new(resources, bag.advance(&next)?))
    }

    async fn entitlements(&self, resource: &Resource, token: &str) -> Result<Page<Entitlement>> {
        let tag = upstream_type(resource)?;
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::Role.id()))?;
        let (roles, next) = self.shared.client.list_roles(bag.cursor()).await?;
        let ents = roles
            .iter()
            .map(|r| entitlements::role_permission(resource, r, tag))
            .collect();
        Ok(Page::new(ents, bag.advance(&next)?))
    }

    async fn grants(&self, resource: &Resource, token: &str) -> Result<Page<Grant>> {
        let tag = upstream_type(resource)?;
        let target_id = resource.id.resource.as_str();
        principal_grants(&self.shared.client, resource, token, |permissions| {
            permissions
                .iter()
                .filter(|p| p.applies_to(target_id))
                .map(|p| {
                    let role = Role {
                        id: p.role_id.to_owned(),
                        name: p.role_name.to_owned(),
                        description: String::new(),
                    };
                    entitlements::role_permission(resource, &role, tag)
                })
                .collect()
        })
        .await
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<()> {
        let binding = entitlement
            .role_binding
            .as_ref()
            .ok_or_else(|| SyncError::MissingRoleBinding(entitlement.id.to_owned()))?;
        self.shared
            .reconciler
            .grant(
                principal,
                &binding.role_id,
                PermissionResource::new(&entitlement.resource.id.resource, &binding.resource_type),
            )
            .await?;
        Ok(())
    }

    async fn revoke(&self, grant: &Grant) -> Result<()> {
        let binding = grant
            .entitlement
            .role_binding
            .as_ref()
            .ok_or_else(|| SyncError::MissingRoleBinding(grant.entitlement.id.to_owned()))?;
        self.shared
            .reconciler
            .revoke(&grant.principal, &binding.role_id)
            .await?;
        Ok(())
    }
}
