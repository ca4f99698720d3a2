//! A driver that walks every syncer of a connector to completion.
//!
//! This is what a host does on a schedule: list the root resources, list
//! child types under every resource that asks for them, then page through
//! the entitlements and grants of every resource found.

use std::collections::{HashMap, HashSet, VecDeque};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::nodes::{Entitlement, Grant, PartialFailure, Resource, ResourceId};
use super::ResourceSyncer;
use crate::log_runtime;
use crate::logging::{debug, warn};

/// Everything a full sync produced.
#[derive(Debug, Default, Serialize)]
pub struct SyncedGraph {
    /// Resources, unique by id
    pub resources: Vec<Resource>,
    /// Entitlements, unique by id
    pub entitlements: Vec<Entitlement>,
    /// Grants, unique by id
    pub grants: Vec<Grant>,
    /// Listing legs that failed along the way
    pub partial_failures: Vec<PartialFailure>,
}

impl SyncedGraph {
    /// Whether any listing came back degraded.
    pub fn is_degraded(&self) -> bool {
        !self.partial_failures.is_empty()
    }

    /// Grants held by the given principal.
    pub fn grants_for_principal<'a>(
        &'a self,
        principal: &'a ResourceId,
    ) -> impl Iterator<Item = &'a Grant> + 'a {
        self.grants.iter().filter(move |g| &g.principal.id == principal)
    }
}

/// Drives a set of syncers through a full sync.
pub struct SyncRunner {
    syncers: Vec<Box<dyn ResourceSyncer>>,
    by_type: HashMap<String, usize>,
}

impl SyncRunner {
    /// Basic constructor
    pub fn new(syncers: Vec<Box<dyn ResourceSyncer>>) -> Self {
        let by_type = syncers
            .iter()
            .enumerate()
            .map(|(i, s)| (s.resource_type().id.to_owned(), i))
            .collect();
        Self { syncers, by_type }
    }

    fn syncer_for(&self, resource_type: &str) -> Option<&dyn ResourceSyncer> {
        self.by_type
            .get(resource_type)
            .map(|&i| self.syncers[i].as_ref())
    }

    /// Sync everything.
    pub async fn run(&self) -> Result<SyncedGraph> {
        let mut graph = SyncedGraph::default();

        log_runtime!("listing resources", {
            self.list_resources(&mut graph).await?
        });

        let mut seen_entitlements = HashSet::new();
        let mut seen_grants = HashSet::new();
        let resources = graph.resources.clone();
        log_runtime!("listing entitlements and grants", {
            for resource in &resources {
                let Some(syncer) = self.syncer_for(&resource.id.resource_type) else {
                    continue;
                };
                self.list_entitlements(syncer, resource, &mut seen_entitlements, &mut graph)
                    .await?;
                self.list_grants(syncer, resource, &mut seen_grants, &mut graph)
                    .await?;
            }
        });

        debug!(
            "synced {} resources, {} entitlements, {} grants",
            graph.resources.len(),
            graph.entitlements.len(),
            graph.grants.len()
        );
        Ok(graph)
    }

    async fn list_resources(&self, graph: &mut SyncedGraph) -> Result<()> {
        let mut queue: VecDeque<(usize, Option<ResourceId>)> =
            (0..self.syncers.len()).map(|i| (i, None)).collect();
        let mut seen = HashSet::new();

        while let Some((index, parent)) = queue.pop_front() {
            let syncer = self.syncers[index].as_ref();
            let mut token = String::new();
            loop {
                let page = syncer
                    .list(parent.as_ref(), &token)
                    .await
                    .with_context(|| format!("listing {}", syncer.resource_type().id))?;
                graph.partial_failures.extend(page.partial_failures);

                for resource in page.items {
                    if !seen.insert(resource.id.to_owned()) {
                        continue;
                    }
                    for child in &resource.child_resource_types {
                        match self.by_type.get(child) {
                            Some(&i) => queue.push_back((i, Some(resource.id.to_owned()))),
                            None => warn!("no syncer for child resource type {child}"),
                        }
                    }
                    graph.resources.push(resource);
                }

                token = next_or_bail(token, page.next_token)?;
                if token.is_empty() {
                    break;
                }
            }
        }
        Ok(())
    }

    async fn list_entitlements(
        &self,
        syncer: &dyn ResourceSyncer,
        resource: &Resource,
        seen: &mut HashSet<String>,
        graph: &mut SyncedGraph,
    ) -> Result<()> {
        let mut token = String::new();
        loop {
            let page = syncer
                .entitlements(resource, &token)
                .await
                .with_context(|| format!("listing entitlements of {}", resource.id))?;
            graph.partial_failures.extend(page.partial_failures);
            graph
                .entitlements
                .extend(page.items.into_iter().filter(|e| seen.insert(e.id.to_owned())));

            token = next_or_bail(token, page.next_token)?;
            if token.is_empty() {
                return Ok(());
            }
        }
    }

    async fn list_grants(
        &self,
        syncer: &dyn ResourceSyncer,
        resource: &Resource,
        seen: &mut HashSet<String>,
        graph: &mut SyncedGraph,
    ) -> Result<()> {
        let mut token = String::new();
        loop {
            let page = syncer
                .grants(resource, &token)
                .await
                .with_context(|| format!("listing grants of {}", resource.id))?;
            graph.partial_failures.extend(page.partial_failures);
            graph
                .grants
                .extend(page.items.into_iter().filter(|g| seen.insert(g.id.to_owned())));

            token = next_or_bail(token, page.next_token)?;
            if token.is_empty() {
                return Ok(());
            }
        }
    }
}

/// A syncer that hands back the token it was given would loop forever.
fn next_or_bail(previous: String, next: String) -> Result<String> {
    if !next.is_empty() && next == previous {
        bail!("syncer returned the same page token twice");
    }
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::nodes::{Page, ResourceType, ResourceTypeTrait, MEMBERSHIP_SLUG};
    use crate::connectors::pagination::{Bag, PageState};
    use async_trait::async_trait;

    /// A workspace with two pages of members.
    struct Workspaces(ResourceType);
    struct Members(ResourceType);

    fn member_type() -> ResourceType {
        ResourceType::new("member", "Member", vec![ResourceTypeTrait::User])
    }

    #[async_trait]
    impl ResourceSyncer for Workspaces {
        fn resource_type(&self) -> &ResourceType {
            &self.0
        }

        async fn list(&self, _parent: Option<&ResourceId>, _token: &str) -> Result<Page<Resource>> {
            Ok(Page::single(vec![Resource::new(&self.0, "w1", "Workspace", None)
                .with_child_resource_types(&[&member_type()])]))
        }

        async fn entitlements(&self, resource: &Resource, _token: &str) -> Result<Page<Entitlement>> {
            Ok(Page::single(vec![Entitlement::assignment(resource, MEMBERSHIP_SLUG)]))
        }

        async fn grants(&self, _resource: &Resource, _token: &str) -> Result<Page<Grant>> {
            Ok(Page::empty())
        }
    }

    #[async_trait]
    impl ResourceSyncer for Members {
        fn resource_type(&self) -> &ResourceType {
            &self.0
        }

        async fn list(&self, parent: Option<&ResourceId>, token: &str) -> Result<Page<Resource>> {
            let Some(parent) = parent else {
                return Ok(Page::empty());
            };
            let mut bag = Bag::parse(token, PageState::new("member"))?;
            let (id, next) = match bag.cursor() {
                "" => ("m1", "p2"),
                _ => ("m2", ""),
            };
            let resource = Resource::new(&self.0, id, id, Some(parent.to_owned()));
            Ok(Page::new(vec![resource], bag.advance(next)?))
        }

        async fn entitlements(&self, _resource: &Resource, _token: &str) -> Result<Page<Entitlement>> {
            Ok(Page::empty())
        }

        async fn grants(&self, _resource: &Resource, _token: &str) -> Result<Page<Grant>> {
            Ok(Page::empty())
        }
    }

    #[tokio::test]
    async fn children_are_listed_under_annotated_parents() -> Result<()> {
        let runner = SyncRunner::new(vec![
            Box::new(Members(member_type())),
            Box::new(Workspaces(ResourceType::new("workspace", "Workspace", vec![]))),
        ]);
        let graph = runner.run().await?;

        let ids: Vec<_> = graph.resources.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["workspace:w1", "member:m1", "member:m2"]);
        assert_eq!(graph.entitlements.len(), 1);
        assert!(!graph.is_degraded());
        Ok(())
    }

    #[test]
    fn repeated_tokens_are_rejected() {
        assert!(next_or_bail("t".to_owned(), "t".to_owned()).is_err());
        assert!(next_or_bail("t".to_owned(), "".to_owned()).is_ok());
    }
}
