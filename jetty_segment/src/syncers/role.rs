use anyhow::Result;
use async_trait::async_trait;
use jetty_core::connectors::nodes::{Entitlement, Grant, Page, Resource, ResourceId, ResourceType};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::connectors::SyncError;
use jetty_core::logging::warn;
use jetty_core::ResourceSyncer;

use super::{principal_grants, role_resource, Shared};
use crate::entitlements;
use crate::nodes::PermissionResource;
use crate::resource_types::{workspace_tag, ResourceKind};

/// Workspace roles. Holding a role means holding it on the workspace.
pub(crate) struct RoleSyncer {
    resource_type: ResourceType,
    shared: Shared,
}

impl RoleSyncer {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            resource_type: ResourceKind::Role.resource_type(),
            shared,
        }
    }

    fn membership(resource: &Resource) -> Entitlement {
        entitlements::membership(resource, "Role", &[ResourceKind::User, ResourceKind::Group])
    }
}

#[async_trait]
impl ResourceSyncer for RoleSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::empty());
        };
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::Role.id()))?;
        let (roles, next) = self.shared.client.list_roles(bag.cursor()).await?;

        for role in roles.iter().filter(|r| !self.shared.markers.recognizes(&r.name)) {
            warn!(
                "role {:?} ({}) matches no role marker; only offered on role targets",
                role.name, role.id
            );
        }

        let resources = roles
            .iter()
            .map(|r| role_resource(r, Some(parent.to_owned())))
            .collect();
        Ok(Page::new(resources, bag.advance(&next)?))
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> Result<Page<Entitlement>> {
        Ok(Page::single(vec![Self::membership(resource)]))
    }

    async fn grants(&self, resource: &Resource, token: &str) -> Result<Page<Grant>> {
        let membership = Self::membership(resource);
        let role_id = resource.id.resource.as_str();
        principal_grants(&self.shared.client, resource, token, |permissions| {
            let holds = permissions
                .iter()
                .any(|p| p.role_id == role_id && p.applies_to_type(workspace_tag()));
            if holds {
                vec![membership.clone()]
            } else {
                vec![]
            }
        })
        .await
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<()> {
        let role = &entitlement.resource;
        let workspace = role
            .parent_resource_id
            .as_ref()
            .ok_or_else(|| SyncError::MissingParent(role.id.to_string()))?;
        self.shared
            .reconciler
            .grant(
                principal,
                &role.id.resource,
                PermissionResource::new(&workspace.resource, workspace_tag()),
            )
            .await?;
        Ok(())
    }

    async fn revoke(&self, grant: &Grant) -> Result<()> {
        self.shared
            .reconciler
            .revoke(&grant.principal, &grant.entitlement.resource.id.resource)
            .await?;
        Ok(())
    }
}
