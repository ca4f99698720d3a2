use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use jetty_core::connectors::nodes::{
    Entitlement, Grant, Page, Resource, ResourceId, ResourceType, RoleBinding,
};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::ResourceSyncer;

use super::{permission_target, role_resource, user_resource, Shared};
use crate::entitlements;
use crate::nodes::Role;
use crate::resource_types::{workspace_tag, ResourceKind};

/// Users, and the reverse mapping from a user's permissions to grants.
pub(crate) struct UserSyncer {
    resource_type: ResourceType,
    shared: Shared,
}

impl UserSyncer {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            resource_type: ResourceKind::User.resource_type(),
            shared,
        }
    }
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::empty());
        };
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::User.id()))?;
        let (users, next) = self.shared.client.list_users(bag.cursor()).await?;
        let resources = users
            .iter()
            .map(|u| user_resource(u, Some(parent.to_owned())))
            .collect();
        Ok(Page::new(resources, bag.advance(&next)?))
    }

    async fn entitlements(&self, _resource: &Resource, _token: &str) -> Result<Page<Entitlement>> {
        Ok(Page::empty())
    }

    /// Every permission the user holds, as grants on the role (for
    /// workspace-wide permissions) or on the resource the role is applied to.
    async fn grants(&self, resource: &Resource, _token: &str) -> Result<Page<Grant>> {
        let user = self
            .shared
            .client
            .get_user(&resource.id.resource)
            .await
            .with_context(|| format!("reading permissions of {}", resource.id))?;
        let parent = resource.parent_resource_id.clone();
        let principal = user_resource(&user, parent.clone());

        let mut seen = HashSet::new();
        let mut grants = vec![];
        for permission in &user.permissions {
            let role = Role {
                id: permission.role_id.to_owned(),
                name: permission.role_name.to_owned(),
                description: String::new(),
            };
            for target in &permission.resources {
                let entitlement = if target.resource_type == workspace_tag() {
                    let role = role_resource(&role, parent.clone());
                    entitlements::membership(
                        &role,
                        "Role",
                        &[ResourceKind::User, ResourceKind::Group],
                    )
                } else {
                    let on = permission_target(target, parent.clone());
                    Entitlement::permission(&on, &entitlements::role_slug(&role.name))
                        .with_display_name(format!("{} resource {}", on.display_name, role.name))
                        .with_role_binding(RoleBinding {
                            role_id: role.id.to_owned(),
                            role_name: role.name.to_owned(),
                            resource_type: target.resource_type.to_owned(),
                        })
                };

                let grant = Grant::new(entitlement, principal.clone());
                if seen.insert(grant.id.to_owned()) {
                    grants.push(grant);
                }
            }
        }
        Ok(Page::single(grants))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncers::test_support::{shared, workspace_id};

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn users_are_only_listed_under_a_workspace() -> Result<()> {
        let server = MockServer::start().await;
        let syncer = UserSyncer::new(shared(server.uri()));
        let page = syncer.list(None, "").await?;
        assert!(page.items.is_empty() && page.is_last());
        Ok(())
    }

    #[tokio::test]
    async fn permissions_map_back_to_grants() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"user": {
                    "id": "u1", "name": "Ada Lovelace", "email": "ada@example.com",
                    "permissions": [
                        {"roleId": "r0", "roleName": "Workspace Owner",
                         "resources": [{"id": "ws1", "type": "WORKSPACE"}]},
                        {"roleId": "r1", "roleName": "Source Admin",
                         "resources": [{"id": "res1", "type": "SOURCE"},
                                       {"id": "tp1", "type": "TRACKING_PLAN"}]}
                    ]
                }}
            })))
            .mount(&server)
            .await;

        let syncer = UserSyncer::new(shared(server.uri()));
        let user = Resource::new(&ResourceKind::User.resource_type(), "u1", "Ada", Some(workspace_id()));
        let page = syncer.grants(&user, "").await?;

        let ids: Vec<_> = page.items.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "role:r0:member:user:u1",
                "source:res1:source_admin:user:u1",
                "resource:tp1:source_admin:user:u1",
            ]
        );
        let binding = page.items[1].entitlement.role_binding.as_ref().unwrap();
        assert_eq!(binding.role_id, "r1");
        assert_eq!(binding.resource_type, "SOURCE");
        assert!(page.is_last());
        Ok(())
    }
}
