use heck::ToSnakeCase;
use jetty_core::connectors::nodes::{Entitlement, Resource, RoleBinding, MEMBERSHIP_SLUG};

use crate::nodes::Role;
use crate::resource_types::ResourceKind;

/// Slug of the permission entitlement a role grants: `Source Admin` becomes
/// `source_admin`.
pub(crate) fn role_slug(role_name: &str) -> String {
    role_name.to_snake_case()
}

/// The `member` entitlement of a workspace, group, or role.
pub(crate) fn membership(resource: &Resource, noun: &str, grantable_to: &[ResourceKind]) -> Entitlement {
    let types: Vec<_> = grantable_to.iter().map(|k| k.resource_type()).collect();
    Entitlement::assignment(resource, MEMBERSHIP_SLUG)
        .with_display_name(format!("{} {noun} {MEMBERSHIP_SLUG}", resource.display_name))
        .with_description(format!("Member of {} Segment {noun}", resource.display_name))
        .with_grantable_to(&types.iter().collect::<Vec<_>>())
}

/// The permission entitlement `role` offers on `resource`.
///
/// `upstream_type` is the tag written back when the role is granted.
pub(crate) fn role_permission(resource: &Resource, role: &Role, upstream_type: &str) -> Entitlement {
    let grantable = [
        ResourceKind::User.resource_type(),
        ResourceKind::Group.resource_type(),
    ];
    Entitlement::permission(resource, &role_slug(&role.name))
        .with_display_name(format!("{} resource {}", resource.display_name, role.name))
        .with_description(format!(
            "{} on {} {}",
            role.name, resource.display_name, resource.id.resource
        ))
        .with_grantable_to(&grantable.iter().collect::<Vec<_>>())
        .with_role_binding(RoleBinding {
            role_id: role.id.to_owned(),
            role_name: role.name.to_owned(),
            resource_type: upstream_type.to_owned(),
        })
}
