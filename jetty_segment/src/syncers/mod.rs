//! One syncer per resource kind.
//!
//! Segment models access principal-first: users and groups carry their
//! permissions, resources don't list who can touch them. Grants on roles and
//! role targets are therefore found by scanning every user, then every group.

mod group;
mod role;
mod role_target;
mod scoped;
mod user;
mod workspace;

pub(crate) use group::GroupSyncer;
pub(crate) use role::RoleSyncer;
pub(crate) use role_target::RoleTargetSyncer;
pub(crate) use scoped::ScopedSyncer;
pub(crate) use user::UserSyncer;
pub(crate) use workspace::WorkspaceSyncer;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use jetty_core::connectors::nodes::{
    Entitlement, Grant, Page, Resource, ResourceId, ResourceTrait, UserEmail, UserStatus,
    MEMBERSHIP_SLUG,
};
use jetty_core::connectors::pagination::{Bag, PageState};
use jetty_core::connectors::{ResourceSyncer, SyncError};

use crate::nodes::{Group, Permission, PermissionResource, Role, User};
use crate::resource_types::{ResourceKind, RoleMarkers};
use crate::rest::SegmentRestClient;
use crate::write::PermissionReconciler;

/// Handles every syncer shares.
#[derive(Clone)]
pub(crate) struct Shared {
    pub(crate) client: Arc<SegmentRestClient>,
    pub(crate) reconciler: Arc<PermissionReconciler>,
    pub(crate) markers: Arc<RoleMarkers>,
}

/// All syncers, in [`ResourceKind::ALL`] order.
pub(crate) fn all(shared: &Shared) -> Vec<Box<dyn ResourceSyncer>> {
    ResourceKind::ALL
        .into_iter()
        .map(|kind| -> Box<dyn ResourceSyncer> {
            match kind {
                ResourceKind::Workspace => Box::new(WorkspaceSyncer::new(shared.clone())),
                ResourceKind::User => Box::new(UserSyncer::new(shared.clone())),
                ResourceKind::Group => Box::new(GroupSyncer::new(shared.clone())),
                ResourceKind::Role => Box::new(RoleSyncer::new(shared.clone())),
                ResourceKind::Resource => Box::new(RoleTargetSyncer::new(shared.clone())),
                ResourceKind::Source
                | ResourceKind::Warehouse
                | ResourceKind::Function
                | ResourceKind::Space => Box::new(ScopedSyncer::new(kind, shared.clone())),
            }
        })
        .collect()
}

pub(crate) fn user_resource(user: &User, parent: Option<ResourceId>) -> Resource {
    let (first_name, last_name) = user.split_name();
    let profile = HashMap::from([
        ("first_name".to_owned(), first_name.to_owned()),
        ("last_name".to_owned(), last_name.to_owned()),
        ("login".to_owned(), user.email.to_owned()),
        ("user_id".to_owned(), user.id.to_owned()),
    ]);
    let emails = if user.email.is_empty() {
        vec![]
    } else {
        vec![UserEmail {
            address: user.email.to_owned(),
            is_primary: true,
        }]
    };

    Resource::new(
        &ResourceKind::User.resource_type(),
        &user.id,
        &user.name,
        parent,
    )
    .with_traits(ResourceTrait::User {
        emails,
        status: UserStatus::Enabled,
        profile,
    })
}

pub(crate) fn group_resource(group: &Group, parent: Option<ResourceId>) -> Resource {
    let profile = HashMap::from([
        ("group_name".to_owned(), group.name.to_owned()),
        ("group_id".to_owned(), group.id.to_owned()),
        ("member_count".to_owned(), group.member_count.to_string()),
    ]);
    Resource::new(
        &ResourceKind::Group.resource_type(),
        &group.id,
        &group.name,
        parent,
    )
    .with_traits(ResourceTrait::Group { profile })
}

pub(crate) fn role_resource(role: &Role, parent: Option<ResourceId>) -> Resource {
    let profile = HashMap::from([
        ("role_name".to_owned(), role.name.to_owned()),
        ("role_id".to_owned(), role.id.to_owned()),
        ("role_description".to_owned(), role.description.to_owned()),
    ]);
    Resource::new(
        &ResourceKind::Role.resource_type(),
        &role.id,
        &role.name,
        parent,
    )
    .with_traits(ResourceTrait::Role { profile })
}

/// Profile key holding the upstream type of a wrapped role target.
pub(crate) const TARGET_TYPE_KEY: &str = "resource_type";

pub(crate) fn role_target_resource(target: &PermissionResource, parent: Option<ResourceId>) -> Resource {
    let profile = HashMap::from([
        (TARGET_TYPE_KEY.to_owned(), target.resource_type.to_owned()),
        ("resource_id".to_owned(), target.id.to_owned()),
    ]);
    Resource::new(
        &ResourceKind::Resource.resource_type(),
        &target.id,
        format!("{} {}", target.resource_type, target.id),
        parent,
    )
    .with_traits(ResourceTrait::Role { profile })
}

/// The resource a permission points at, as the kind that models it.
pub(crate) fn permission_target(target: &PermissionResource, parent: Option<ResourceId>) -> Resource {
    match ResourceKind::from_upstream_tag(&target.resource_type) {
        ResourceKind::Resource => role_target_resource(target, parent),
        kind => Resource::new(&kind.resource_type(), &target.id, &target.id, parent),
    }
}

/// Page through users, then groups, emitting a grant for every entitlement
/// `held` finds in a principal's permissions.
///
/// The first call replaces the default frame with a group frame and a user
/// frame on top of it, so every user page comes before the first group page.
pub(crate) async fn principal_grants<F>(
    client: &SegmentRestClient,
    resource: &Resource,
    token: &str,
    held: F,
) -> Result<Page<Grant>>
where
    F: Fn(&[Permission]) -> Vec<Entitlement> + Send + Sync,
{
    let own = resource.id.resource_type.as_str();
    let user_kind = ResourceKind::User.id();
    let group_kind = ResourceKind::Group.id();

    let mut bag = Bag::parse(token, PageState::new(own))?;
    if bag.resource_type_id() == Some(own) {
        bag.pop();
        bag.push(PageState::new(group_kind));
        bag.push(PageState::new(user_kind));
    }

    let parent = resource.parent_resource_id.clone();
    let mut grants = vec![];
    let next = match bag.resource_type_id() {
        Some(kind) if kind == user_kind => {
            let (users, next) = client.list_users(bag.cursor()).await?;
            for user in &users {
                let entitlements = distinct(held(&user.permissions));
                if entitlements.is_empty() {
                    continue;
                }
                let principal = user_resource(user, parent.clone());
                grants.extend(
                    entitlements
                        .into_iter()
                        .map(|e| Grant::new(e, principal.clone())),
                );
            }
            next
        }
        Some(kind) if kind == group_kind => {
            let (groups, next) = client.list_groups(bag.cursor()).await?;
            for group in &groups {
                let entitlements = distinct(held(&group.permissions));
                if entitlements.is_empty() {
                    continue;
                }
                let principal = group_resource(group, parent.clone());
                let expand = vec![Entitlement::format_id(&principal.id, MEMBERSHIP_SLUG)];
                grants.extend(entitlements.into_iter().map(|e| {
                    Grant::new(e, principal.clone()).with_expandable(expand.clone(), true)
                }));
            }
            next
        }
        other => {
            return Err(SyncError::UnexpectedPageState {
                resource_type: other.unwrap_or_default().to_owned(),
                listing: format!("grants of {}", resource.id),
            }
            .into())
        }
    };

    Ok(Page::new(grants, bag.advance(&next)?))
}

fn distinct(entitlements: Vec<Entitlement>) -> Vec<Entitlement> {
    let mut seen = HashSet::new();
    entitlements
        .into_iter()
        .filter(|e| seen.insert(e.id.to_owned()))
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_carry_profile_and_email() {
        let user = User {
            id: "u1".to_owned(),
            name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            permissions: vec![],
        };
        let resource = user_resource(&user, None);
        assert_eq!(resource.id.to_string(), "user:u1");
        assert_eq!(resource.profile_value("first_name"), Some("Ada"));
        assert_eq!(resource.profile_value("last_name"), Some("Lovelace"));
        assert_eq!(resource.profile_value("login"), Some("ada@example.com"));
        match resource.traits {
            ResourceTrait::User { emails, status, .. } => {
                assert_eq!(status, UserStatus::Enabled);
                assert!(emails[0].is_primary);
            }
            other => panic!("unexpected traits {other:?}"),
        }
    }

    #[test]
    fn permission_targets_map_to_their_kind() {
        let source = permission_target(&PermissionResource::new("res1", "SOURCE"), None);
        assert_eq!(source.id.to_string(), "source:res1");
        let other = permission_target(&PermissionResource::new("tp1", "TRACKING_PLAN"), None);
        assert_eq!(other.id.to_string(), "resource:tp1");
        assert_eq!(other.profile_value(TARGET_TYPE_KEY), Some("TRACKING_PLAN"));
    }
}
