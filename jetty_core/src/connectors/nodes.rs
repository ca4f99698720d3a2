//! Nodes to be received from connectors
//!
//! A connector describes its system as a graph of [`Resource`]s. Each
//! resource offers [`Entitlement`]s, and a [`Grant`] records that a
//! principal holds an entitlement. None of these are cached: they are
//! rebuilt from upstream reads on every sync call and handed to the
//! consumer.
use std::collections::HashMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Slug used by every membership-style entitlement.
pub const MEMBERSHIP_SLUG: &str = "member";

/// The shape a resource type takes in the access graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceTypeTrait {
    /// A principal that logs in.
    User,
    /// A principal that contains users.
    Group,
    /// A bundle of permissions that can be assigned.
    Role,
}

/// Static description of a kind of resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceType {
    /// Stable identifier, e.g. `user`.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Traits resources of this type carry.
    pub traits: Vec<ResourceTypeTrait>,
}

impl ResourceType {
    /// Basic constructor
    pub fn new(id: &str, display_name: &str, traits: Vec<ResourceTypeTrait>) -> Self {
        Self {
            id: id.to_owned(),
            display_name: display_name.to_owned(),
            traits,
        }
    }
}

/// Identity of a resource. Two resources are the same node iff their
/// `ResourceId`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
    /// The resource type id.
    pub resource_type: String,
    /// The upstream id of the resource.
    pub resource: String,
}

impl ResourceId {
    /// Basic constructor
    pub fn new(resource_type: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource: resource.into(),
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.resource)
    }
}

/// Status of a user account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    /// The account can be used.
    Enabled,
    /// The account is disabled upstream.
    Disabled,
    /// The upstream doesn't say.
    #[default]
    Unspecified,
}

/// An email address attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEmail {
    /// The address.
    pub address: String,
    /// Whether this is the user's primary address.
    pub is_primary: bool,
}

/// Kind-specific attributes of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceTrait {
    /// User attributes
    User {
        /// Known email addresses
        emails: Vec<UserEmail>,
        /// Account status
        status: UserStatus,
        /// Free-form profile values
        profile: HashMap<String, String>,
    },
    /// Group attributes
    Group {
        /// Free-form profile values
        profile: HashMap<String, String>,
    },
    /// Role attributes
    Role {
        /// Free-form profile values
        profile: HashMap<String, String>,
    },
    /// Plain resource without a trait
    #[default]
    None,
}

impl ResourceTrait {
    /// The profile map of this trait, if it has one.
    pub fn profile(&self) -> Option<&HashMap<String, String>> {
        match self {
            ResourceTrait::User { profile, .. }
            | ResourceTrait::Group { profile }
            | ResourceTrait::Role { profile } => Some(profile),
            ResourceTrait::None => None,
        }
    }
}

/// A node in the access graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Identity
    pub id: ResourceId,
    /// Human-readable name
    pub display_name: String,
    /// The resource this one lives under, if any
    pub parent_resource_id: Option<ResourceId>,
    /// Kind-specific attributes
    pub traits: ResourceTrait,
    /// Resource type ids that should be listed with this resource as parent
    pub child_resource_types: Vec<String>,
}

impl Resource {
    /// Create a resource without traits.
    pub fn new(
        resource_type: &ResourceType,
        id: impl Into<String>,
        display_name: impl Into<String>,
        parent_resource_id: Option<ResourceId>,
    ) -> Self {
        Self {
            id: ResourceId::new(resource_type.id.to_owned(), id),
            display_name: display_name.into(),
            parent_resource_id,
            traits: ResourceTrait::None,
            child_resource_types: vec![],
        }
    }

    /// Attach kind-specific attributes.
    pub fn with_traits(mut self, traits: ResourceTrait) -> Self {
        self.traits = traits;
        self
    }

    /// Annotate the resource with children to list under it.
    pub fn with_child_resource_types(mut self, types: &[&ResourceType]) -> Self {
        self.child_resource_types = types.iter().map(|t| t.id.to_owned()).collect();
        self
    }

    /// Look up a profile value.
    pub fn profile_value(&self, key: &str) -> Option<&str> {
        self.traits
            .profile()
            .and_then(|p| p.get(key))
            .map(String::as_str)
    }
}

/// Whether an entitlement is membership in something or a capability on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementPurpose {
    /// Membership, e.g. group member.
    Assignment,
    /// A permission scoped to the resource.
    Permission,
}

/// The upstream role behind an entitlement.
///
/// Upstreams that express access as "role R on resource X" need the role id
/// back at grant time, so it travels with the entitlement instead of being
/// encoded in display text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleBinding {
    /// Upstream role id
    pub role_id: String,
    /// Upstream role name
    pub role_name: String,
    /// Upstream resource-type tag the role is applied to
    pub resource_type: String,
}

/// A capability offered by a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// `<resource type>:<resource id>:<slug>`
    pub id: String,
    /// The resource offering the entitlement
    pub resource: Resource,
    /// Short name, unique per resource
    pub slug: String,
    /// Human-readable name
    pub display_name: String,
    /// Human-readable description
    pub description: String,
    /// Membership or permission
    pub purpose: EntitlementPurpose,
    /// Resource type ids of principals that may hold it
    pub grantable_to: Vec<String>,
    /// The upstream role, for role-scoped permissions
    pub role_binding: Option<RoleBinding>,
}

impl Entitlement {
    /// The canonical id of an entitlement.
    pub fn format_id(resource_id: &ResourceId, slug: &str) -> String {
        format!("{}:{}:{}", resource_id.resource_type, resource_id.resource, slug)
    }

    fn new(resource: &Resource, slug: &str, purpose: EntitlementPurpose) -> Self {
        Self {
            id: Self::format_id(&resource.id, slug),
            resource: resource.to_owned(),
            slug: slug.to_owned(),
            display_name: slug.to_owned(),
            description: String::new(),
            purpose,
            grantable_to: vec![],
            role_binding: None,
        }
    }

    /// A membership entitlement on the resource.
    pub fn assignment(resource: &Resource, slug: &str) -> Self {
        Self::new(resource, slug, EntitlementPurpose::Assignment)
    }

    /// A permission entitlement on the resource.
    pub fn permission(resource: &Resource, slug: &str) -> Self {
        Self::new(resource, slug, EntitlementPurpose::Permission)
    }

    /// Set the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the principal types that can hold this entitlement.
    pub fn with_grantable_to(mut self, types: &[&ResourceType]) -> Self {
        self.grantable_to = types.iter().map(|t| t.id.to_owned()).collect();
        self
    }

    /// Attach the upstream role.
    pub fn with_role_binding(mut self, binding: RoleBinding) -> Self {
        self.role_binding = Some(binding);
        self
    }
}

/// Tells the consumer to expand a grant to the members of other entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantExpandable {
    /// Entitlements whose holders also receive the grant
    pub entitlement_ids: Vec<String>,
    /// Expand one level only
    pub shallow: bool,
}

/// A principal holding an entitlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    /// `<entitlement id>:<principal type>:<principal id>`
    pub id: String,
    /// What is held
    pub entitlement: Entitlement,
    /// Who holds it
    pub principal: Resource,
    /// Expansion hint for group-held grants
    pub expandable: Option<GrantExpandable>,
}

impl Grant {
    /// Basic constructor
    pub fn new(entitlement: Entitlement, principal: Resource) -> Self {
        Self {
            id: format!("{}:{}", entitlement.id, principal.id),
            entitlement,
            principal,
            expandable: None,
        }
    }

    /// Mark the grant as expandable to the holders of other entitlements.
    pub fn with_expandable(mut self, entitlement_ids: Vec<String>, shallow: bool) -> Self {
        self.expandable = Some(GrantExpandable {
            entitlement_ids,
            shallow,
        });
        self
    }
}

/// A fan-out leg that failed while building a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialFailure {
    /// The sub-kind that could not be read
    pub subkind: String,
    /// Why
    pub message: String,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// The items on this page
    pub items: Vec<T>,
    /// Token for the next call; empty when the listing is complete
    pub next_token: String,
    /// Legs of the listing that failed. A page with failures is degraded,
    /// not complete.
    pub partial_failures: Vec<PartialFailure>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: vec![],
            next_token: String::new(),
            partial_failures: vec![],
        }
    }
}

impl<T> Page<T> {
    /// A page with more to come (or not, if `next_token` is empty).
    pub fn new(items: Vec<T>, next_token: String) -> Self {
        Self {
            items,
            next_token,
            partial_failures: vec![],
        }
    }

    /// A complete, single-page listing.
    pub fn single(items: Vec<T>) -> Self {
        Self::new(items, String::new())
    }

    /// An empty, complete listing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this was the last page.
    pub fn is_last(&self) -> bool {
        self.next_token.is_empty()
    }

    /// Record failed legs.
    pub fn with_partial_failures(mut self, failures: Vec<PartialFailure>) -> Self {
        self.partial_failures = failures;
        self
    }
}
