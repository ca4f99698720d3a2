use anyhow::{anyhow, Result};
use async_trait::async_trait;
use jetty_core::connectors::nodes::{
    Entitlement, Grant, Page, PartialFailure, Resource, ResourceId, ResourceType,
};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::connectors::SyncError;
use jetty_core::logging::warn;
use jetty_core::ResourceSyncer;

use super::Shared;
use crate::consts::FUNCTION_SUBTYPES;
use crate::entitlements;
use crate::nodes::PermissionResource;
use crate::resource_types::ResourceKind;

/// Sources, warehouses, functions, and spaces.
///
/// These carry permission entitlements for the roles whose name matches the
/// kind's marker. Their grants are reported through the user syncer, which
/// sees them from the principal side.
pub(crate) struct ScopedSyncer {
    kind: ResourceKind,
    resource_type: ResourceType,
    shared: Shared,
}

impl ScopedSyncer {
    pub(crate) fn new(kind: ResourceKind, shared: Shared) -> Self {
        Self {
            kind,
            resource_type: kind.resource_type(),
            shared,
        }
    }

    fn upstream_tag(&self) -> Result<&'static str> {
        self.kind
            .upstream_tag()
            .ok_or_else(|| anyhow!("{} has no upstream resource type", self.kind))
    }

    fn role_id<'a>(&self, entitlement: &'a Entitlement) -> Result<&'a str> {
        entitlement
            .role_binding
            .as_ref()
            .map(|b| b.role_id.as_str())
            .ok_or_else(|| SyncError::MissingRoleBinding(entitlement.id.to_owned()).into())
    }

    /// One page of one function sub-type. The first call queues a frame per
    /// sub-type; a sub-type that fails is dropped and reported.
    async fn list_functions(&self, parent: &ResourceId, token: &str) -> Result<Page<Resource>> {
        let mut bag = Bag::parse(token, PageState::new(self.kind.id()))?;
        if bag.resource_id().is_none() {
            bag.pop();
            for subtype in FUNCTION_SUBTYPES.iter().rev() {
                bag.push(PageState::scoped(self.kind.id(), *subtype));
            }
        }
        let subtype = bag.resource_id().unwrap_or_default().to_owned();

        let listed = self
            .shared
            .client
            .list_functions(&subtype, bag.cursor())
            .await;
        match listed {
            Ok((functions, next)) => {
                let resources = functions
                    .iter()
                    .map(|f| {
                        Resource::new(&self.resource_type, &f.id, &f.display_name, Some(parent.to_owned()))
                    })
                    .collect();
                Ok(Page::new(resources, bag.advance(&next)?))
            }
            Err(e) => {
                warn!("skipping {subtype} functions: {e}");
                bag.pop();
                Ok(Page::new(vec![], bag.marshal()?).with_partial_failures(vec![PartialFailure {
                    subkind: subtype,
                    message: e.to_string(),
                }]))
            }
        }
    }

    async fn list_collection(&self, parent: &ResourceId, token: &str) -> Result<Page<Resource>> {
        let mut bag = Bag::parse(token, PageState::new(self.kind.id()))?;
        let client = &self.shared.client;
        let cursor = bag.cursor().to_owned();
        let (named, next): (Vec<(String, String)>, String) = match self.kind {
            ResourceKind::Source => {
                let (items, next) = client.list_sources(&cursor).await?;
                (items.into_iter().map(|s| (s.id, s.name)).collect(), next)
            }
            ResourceKind::Warehouse => {
                let (items, next) = client.list_warehouses(&cursor).await?;
                (items.into_iter().map(|w| (w.id, w.metadata.name)).collect(), next)
            }
            ResourceKind::Space => {
                let (items, next) = client.list_spaces(&cursor).await?;
                (items.into_iter().map(|s| (s.id, s.name)).collect(), next)
            }
            other => {
                return Err(SyncError::UnexpectedPageState {
                    resource_type: other.id().to_owned(),
                    listing: "scoped resources".to_owned(),
                }
                .into())
            }
        };

        let resources = named
            .into_iter()
            .map(|(id, name)| Resource::new(&self.resource_type, id, name, Some(parent.to_owned())))
            .collect();
        Ok(Page::new(resources, bag.advance(&next)?))
    }
}

#[async_trait]
impl ResourceSyncer for ScopedSyncer {
    fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>> {
        let Some(parent) = parent else {
            return Ok(Page::empty());
        };
        match self.kind {
            ResourceKind::Function => self.list_functions(parent, token).await,
            _ => self.list_collection(parent, token).await,
        }
    }

    async fn entitlements(&self, resource: &Resource, token: &str) -> Result<Page<Entitlement>> {
        let tag = self.upstream_tag()?;
        let mut bag = Bag::parse(token, PageState::new(ResourceKind::Role.id()))?;
        let (roles, next) = self.shared.client.list_roles(bag.cursor()).await?;
        let ents = roles
            .iter()
            .filter(|r| self.shared.markers.applies(self.kind, &r.name))
            .map(|r| entitlements::role_permission(resource, r, tag))
            .collect();
        Ok(Page::new(ents, bag.advance(&next)?))
    }

    async fn grants(&self, _resource: &Resource, _token: &str) -> Result<Page<Grant>> {
        Ok(Page::empty())
    }

    async fn grant(&self, principal: &Resource, entitlement: &Entitlement) -> Result<()> {
        let role_id = self.role_id(entitlement)?;
        let target = PermissionResource::new(&entitlement.resource.id.resource, self.upstream_tag()?);
        self.shared
            .reconciler
            .grant(principal, role_id, target)
            .await?;
        Ok(())
    }

    async fn revoke(&self, grant: &Grant) -> Result<()> {
        let role_id = self.role_id(&grant.entitlement)?;
        self.shared
            .reconciler
            .revoke(&grant.principal, role_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syncers::test_support::{shared, workspace_id};

    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_functions(server: &MockServer, subtype: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/functions"))
            .and(query_param("resourceType", subtype))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn failing_function_subtypes_are_reported_not_fatal() -> Result<()> {
        let server = MockServer::start().await;
        mount_functions(
            &server,
            "DESTINATION",
            200,
            json!({"data": {"functions": [{"id": "f1", "displayName": "Enrich"}], "pagination": {}}}),
        )
        .await;
        mount_functions(
            &server,
            "INSERT_DESTINATION",
            403,
            json!({"errors": [{"type": "forbidden", "message": "no access"}]}),
        )
        .await;
        mount_functions(
            &server,
            "SOURCE",
            200,
            json!({"data": {"functions": [{"id": "f3", "displayName": "Ingest"}], "pagination": {}}}),
        )
        .await;

        let syncer = ScopedSyncer::new(ResourceKind::Function, shared(server.uri()));
        let mut token = String::new();
        let mut names = vec![];
        let mut failures = vec![];
        loop {
            let page = syncer.list(Some(&workspace_id()), &token).await?;
            names.extend(page.items.into_iter().map(|r| r.display_name));
            failures.extend(page.partial_failures);
            if page.next_token.is_empty() {
                break;
            }
            token = page.next_token;
        }

        assert_eq!(names, vec!["Enrich", "Ingest"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subkind, "INSERT_DESTINATION");
        assert!(failures[0].message.contains("no access"));
        Ok(())
    }

    #[tokio::test]
    async fn warehouses_use_their_own_collection_and_metadata_name() -> Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/warehouses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"warehouses": [{"id": "w1", "metadata": {"name": "Snowflake"}}],
                         "pagination": {}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let syncer = ScopedSyncer::new(ResourceKind::Warehouse, shared(server.uri()));
        let page = syncer.list(Some(&workspace_id()), "").await?;
        assert_eq!(page.items[0].id.to_string(), "warehouse:w1");
        assert_eq!(page.items[0].display_name, "Snowflake");
        Ok(())
    }
}
