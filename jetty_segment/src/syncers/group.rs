use anyhow::{Context, Result};
use async_trait::async_trait;
use jetty_core::connectors::nodes::{Entitlement, Grant, Page, Resource, ResourceId, ResourceType};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::connectors::SyncError;
use jetty_core::logging::info;
use jetty_core::ResourceSyncer;

use super::{group_resource, user_resource, Shared};
use crate::entitlements;
use crate::resource_types::ResourceKind;

/// User groups and their membership.
pub(crate) struct GroupSyncer {
    resource_type: ResourceType,
    shared: Shared,
}

impl GroupSyncer {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            resource_type: ResourceKind::Group.resource_type(),
            shared,
        }
    }
}

/// The login email of a user principal.
fn member_email<'a>(principal: &'a Resource, action: &str) -> Result<&'a str> {
    if principal.id.resource_type != ResourceKind::User.id() {
        return Err(SyncError::UnsupportedPrincipal {
            action: action.to_owned(),
            allowed: "users".to_owned(),
            principal_type: principal.id.resource_type.to_owned(),
            principal_id: principal.id.resource.to_owned(),
        }
        .into());
    }
    principal
        .profile_value("login")
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            SyncError::MissingProfileField {
                resource: principal.id.to_string(),
                field: "login".to_owned(),
            }
            .into()
        })
}

#[async_trait]
impl ResourceSyncer for GroupSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::empty());
        };
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::Group.id()))?;
        let (groups, next) = self.shared.client.list_groups(bag.cursor()).await?;
        let resources = groups
            .iter()
            .map(|g| group_resource(g, Some(parent.to_owned())))
            .collect();
        Ok(Page::new(resources, bag.advance(&next)?))
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> Result<Page<Entitlement>> {
        Ok(Page::single(vec![entitlements::membership(
            resource,
            "group",
            &[ResourceKind::User],
        )]))
    }

    async fn grants(&self, resource: &Resource, token: &str) -> Result<Page<Grant>> {
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::User.id()))?;
        let (members, next) = self
            .shared
            .client
            .list_group_members(&resource.id.resource, bag.cursor())
            .await
            .context("failed to list group members")?;

        let membership = entitlements::membership(resource, "group", &[ResourceKind::User]);
        let grants = members
            .iter()
            .map(|u| {
                Grant::new(
                    membership.clone(),
                    user_resource(u, resource.parent_resource_id.clone()),
                )
            })
            .collect();
        Ok(Page::new(grants, bag.advance(&next)?))
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<()> {
        let email = member_email(principal, "granted group membership")?;
        let group_id = &entitlement.resource.id.resource;
        self.shared
            .client
            .add_group_member(group_id, email)
            .await
            .context("failed to add user to group")?;
        info!("added {} to group {group_id}", principal.id);
        Ok(())
    }

    async fn revoke(&self, grant: &Grant) -> Result<()> {
        let email = member_email(&grant.principal, "revoked group membership")?;
        let group_id = &grant.entitlement.resource.id.resource;
        self.shared
            .client
            .remove_group_member(group_id, email)
            .await
            .with_context(|| format!("failed to revoke group membership for {}", grant.principal.id))?;
        info!("removed {} from group {group_id}", grant.principal.id);
        Ok(())
    }
}
