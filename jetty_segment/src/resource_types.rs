//! The resource kinds Segment exposes and how upstream tags map onto them.

use std::collections::HashMap;
use std::fmt::Display;

use jetty_core::connectors::nodes::{ResourceType, ResourceTypeTrait};
use jetty_core::jetty::ConnectorConfig;

use crate::consts;

/// Every kind of resource the connector syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Workspace users
    User,
    /// User groups
    Group,
    /// Workspace roles
    Role,
    /// The workspace itself
    Workspace,
    /// Any resource a role is applied to, wrapped with its upstream type
    Resource,
    /// Event sources
    Source,
    /// Warehouse destinations
    Warehouse,
    /// Functions of every sub-type
    Function,
    /// Engage spaces
    Space,
}

impl ResourceKind {
    /// All kinds, in syncing order.
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::Workspace,
        ResourceKind::User,
        ResourceKind::Group,
        ResourceKind::Role,
        ResourceKind::Resource,
        ResourceKind::Source,
        ResourceKind::Warehouse,
        ResourceKind::Function,
        ResourceKind::Space,
    ];

    /// Stable resource type id.
    pub fn id(self) -> &'static str {
        match self {
            ResourceKind::User => "user",
            ResourceKind::Group => "group",
            ResourceKind::Role => "role",
            ResourceKind::Workspace => "workspace",
            ResourceKind::Resource => "resource",
            ResourceKind::Source => "source",
            ResourceKind::Warehouse => "warehouse",
            ResourceKind::Function => "function",
            ResourceKind::Space => "space",
        }
    }

    /// Look a kind up by resource type id.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// The static descriptor for this kind.
    pub fn resource_type(self) -> ResourceType {
        let (display_name, traits) = match self {
            ResourceKind::User => ("User", vec![ResourceTypeTrait::User]),
            ResourceKind::Group => ("Group", vec![ResourceTypeTrait::Group]),
            ResourceKind::Role => ("Role", vec![ResourceTypeTrait::Role]),
            ResourceKind::Workspace => ("Workspace", vec![]),
            ResourceKind::Resource => ("Resource", vec![ResourceTypeTrait::Role]),
            ResourceKind::Source => ("Source", vec![]),
            ResourceKind::Warehouse => ("Warehouse", vec![]),
            ResourceKind::Function => ("Function", vec![]),
            ResourceKind::Space => ("Space", vec![]),
        };
        ResourceType::new(self.id(), display_name, traits)
    }

    /// The tag the upstream uses for this kind inside permissions.
    pub fn upstream_tag(self) -> Option<&'static str> {
        match self {
            ResourceKind::Workspace => Some("WORKSPACE"),
            ResourceKind::Source => Some("SOURCE"),
            ResourceKind::Warehouse => Some("WAREHOUSE"),
            ResourceKind::Function => Some("FUNCTION"),
            ResourceKind::Space => Some("SPACE"),
            _ => None,
        }
    }

    /// Map an upstream permission tag to a kind. Tags we don't model are
    /// wrapped as [`ResourceKind::Resource`].
    pub fn from_upstream_tag(tag: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|k| k.upstream_tag() == Some(tag))
            .unwrap_or(ResourceKind::Resource)
    }

    /// Kinds listed under the workspace.
    pub fn workspace_children() -> Vec<ResourceKind> {
        Self::ALL
            .into_iter()
            .filter(|k| *k != ResourceKind::Workspace)
            .collect()
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Upstream tag of workspace-wide permissions.
pub(crate) fn workspace_tag() -> &'static str {
    ResourceKind::Workspace.upstream_tag().unwrap_or("WORKSPACE")
}

/// Which roles apply to which permission-bearing kind.
///
/// Segment doesn't say which resource types a role can be applied to, so
/// roles are matched by a marker in their name. The [`ResourceKind::Resource`]
/// kind takes every role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMarkers {
    markers: HashMap<ResourceKind, String>,
}

impl Default for RoleMarkers {
    fn default() -> Self {
        Self {
            markers: HashMap::from([
                (ResourceKind::Function, "Function".to_owned()),
                (ResourceKind::Source, "Source".to_owned()),
                (ResourceKind::Warehouse, "Warehouse".to_owned()),
                (ResourceKind::Space, "Engage".to_owned()),
            ]),
        }
    }
}

impl RoleMarkers {
    /// Defaults, overridden by `<kind>_role_marker` connector config keys.
    pub fn from_config(config: &ConnectorConfig) -> Self {
        let mut markers = Self::default();
        for kind in markers.markers.keys().copied().collect::<Vec<_>>() {
            if let Some(marker) = config.config.get(&format!("{}_role_marker", kind.id())) {
                markers.markers.insert(kind, marker.to_owned());
            }
        }
        markers
    }

    /// Whether a role with this name can be applied to resources of `kind`.
    pub fn applies(&self, kind: ResourceKind, role_name: &str) -> bool {
        match self.markers.get(&kind) {
            Some(marker) => role_name.contains(marker.as_str()),
            None => kind == ResourceKind::Resource,
        }
    }

    /// Whether the role is recognized at all: workspace-wide or matched by a
    /// marker.
    pub fn recognizes(&self, role_name: &str) -> bool {
        role_name.contains(consts::WORKSPACE_ROLE_MARKER)
            || self.markers.values().any(|m| role_name.contains(m.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_tags_map_to_kinds() {
        assert_eq!(ResourceKind::from_upstream_tag("SOURCE"), ResourceKind::Source);
        assert_eq!(ResourceKind::from_upstream_tag("SPACE"), ResourceKind::Space);
        assert_eq!(
            ResourceKind::from_upstream_tag("PROTOCOLS_TRACKING_PLAN"),
            ResourceKind::Resource
        );
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_id(kind.id()), Some(kind));
        }
    }

    #[test]
    fn markers_filter_roles_per_kind() {
        let markers = RoleMarkers::default();
        assert!(markers.applies(ResourceKind::Source, "Source Admin"));
        assert!(!markers.applies(ResourceKind::Warehouse, "Source Admin"));
        assert!(markers.applies(ResourceKind::Space, "Engage Editor"));
        assert!(!markers.applies(ResourceKind::Source, "Engage Editor"));
        assert!(markers.applies(ResourceKind::Resource, "Anything"));
        assert!(!markers.applies(ResourceKind::Role, "Source Admin"));
    }

    #[test]
    fn unmatched_roles_are_not_recognized() {
        let markers = RoleMarkers::default();
        assert!(markers.recognizes("Workspace Owner"));
        assert!(markers.recognizes("Function Admin"));
        assert!(!markers.recognizes("Tracking Plan Admin"));
    }

    #[test]
    fn markers_can_be_overridden() {
        let config = ConnectorConfig::new(
            "segment".to_owned(),
            HashMap::from([("space_role_marker".to_owned(), "Unify".to_owned())]),
        );
        let markers = RoleMarkers::from_config(&config);
        assert!(markers.applies(ResourceKind::Space, "Unify Read-only"));
        assert!(!markers.applies(ResourceKind::Space, "Engage Editor"));
        assert!(markers.applies(ResourceKind::Source, "Source Admin"));
    }

    #[test]
    fn unmatched_roles_only_apply_to_role_targets() {
        let markers = RoleMarkers::default();
        let name = "Tracking Plan Editor";
        assert!(!markers.recognizes(name));
        assert!(markers.applies(ResourceKind::Resource, name));
        for kind in [
            ResourceKind::Source,
            ResourceKind::Warehouse,
            ResourceKind::Function,
            ResourceKind::Space,
        ] {
            assert!(!markers.applies(kind, name), "{kind}");
        }
    }
}
