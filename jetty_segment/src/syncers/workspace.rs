use anyhow::Result;
use async_trait::async_trait;
use jetty_core::connectors::nodes::{Entitlement, Grant, Page, Resource, ResourceId, ResourceType};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::ResourceSyncer;

use super::{user_resource, Shared};
use crate::entitlements;
use crate::resource_types::ResourceKind;

/// The workspace the token belongs to: the root every other kind hangs off.
pub(crate) struct WorkspaceSyncer {
    resource_type: ResourceType,
    shared: Shared,
}

impl WorkspaceSyncer {
    pub(crate) fn new(shared: Shared) -> Self {
        Self {
            resource_type: ResourceKind::Workspace.resource_type(),
            shared,
        }
    }

    fn membership(resource: &Resource) -> Entitlement {
        entitlements::membership(resource, "workspace", &[ResourceKind::User])
    }
}

#[async_trait]
impl ResourceSyncer for WorkspaceSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    async fn list(&self, parent: Option<&ResourceId>, _token: &str) -> Result<Page<Resource>> {
        if parent.is_some() {
            return Ok(Page::empty());
        }
        let workspace = self.shared.client.get_workspace().await?;
        let children: Vec<_> = ResourceKind::workspace_children()
            .into_iter()
            .map(ResourceKind::resource_type)
            .collect();
        let resource = Resource::new(&self.resource_type, &workspace.id, &workspace.name, None)
            .with_child_resource_types(&children.iter().collect::<Vec<_>>());
        Ok(Page::single(vec![resource]))
    }

    async fn entitlements(&self, resource: &Resource, _token: &str) -> Result<Page<Entitlement>> {
        Ok(Page::single(vec![Self::membership(resource)]))
    }

    async fn grants(&self, resource: &Resource, token: &str) -> Result<Page<Grant>> {
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::User.id()))?;
        let (users, next) = self.shared.client.list_users(bag.cursor()).await?;
        let membership = Self::membership(resource);
        let grants = users
            .iter()
            .map(|u| Grant::new(membership.clone(), user_resource(u, Some(resource.id.to_owned()))))
            .collect();
        Ok(Page::new(grants, bag.advance(&next)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncers::test_support::shared;

    use jetty_core::connectors::SyncError;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn workspace_is_the_root_of_every_kind() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"workspace": {"id": "ws1", "name": "Acme", "slug": "acme"}}
            })))
            .mount(&server)
            .await;

        let syncer = WorkspaceSyncer::new(shared(server.uri()));
        let page = syncer.list(None, "").await?;
        let workspace = &page.items[0];
        assert_eq!(workspace.id.to_string(), "workspace:ws1");
        assert_eq!(workspace.child_resource_types.len(), 8);
        assert!(workspace.child_resource_types.contains(&"resource".to_owned()));
        Ok(())
    }

    #[tokio::test]
    async fn workspace_access_is_not_provisioned() {
        let server = MockServer::start().await;
        let syncer = WorkspaceSyncer::new(shared(server.uri()));
        let workspace = Resource::new(&syncer.resource_type, "ws1", "Acme", None);
        let user = Resource::new(&ResourceKind::User.resource_type(), "u1", "Ada", None);
        let err = syncer
            .grant(&user, &WorkspaceSyncer::membership(&workspace))
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<SyncError>(),
            Some(&SyncError::NotProvisionable("workspace".to_owned()))
        );
    }
}
