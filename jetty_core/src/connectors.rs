//! Everything a connector needs to plug into Jetty.

pub mod nodes;
pub mod pagination;
pub mod sync;
mod syncer;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::jetty::{ConnectorConfig, CredentialsMap};
use crate::logging::warn;
pub use syncer::ResourceSyncer;

/// Metadata describing a connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorMetadata {
    /// Human-readable name
    pub display_name: String,
    /// What the connector syncs
    pub description: String,
}

/// The trait all connectors are expected to implement.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Instantiate a Connector from configuration.
    fn new(config: &ConnectorConfig, credentials: &CredentialsMap) -> Result<Box<Self>>
    where
        Self: Sized;

    /// Describe the connector.
    fn metadata(&self) -> ConnectorMetadata;

    /// Exercise the configured credentials. An error here means the
    /// connector cannot talk to its upstream.
    async fn validate(&self) -> Result<()>;

    /// Check if the Connector is properly set up and return the connection
    /// status (true for connected, false for not).
    async fn check(&self) -> bool {
        match self.validate().await {
            Ok(()) => true,
            Err(e) => {
                warn!("connector check failed: {e:#}");
                false
            }
        }
    }

    /// One syncer per resource type the connector exposes.
    fn resource_syncers(&self) -> Vec<Box<dyn ResourceSyncer>>;
}

/// Errors raised by the sync machinery itself rather than by an upstream.
///
/// These indicate a caller bug or corrupted state and are never worth
/// retrying.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SyncError {
    /// A page token could not be decoded.
    #[error("invalid page token: {0}")]
    InvalidPageToken(String),

    /// The principal's type cannot hold the entitlement.
    #[error("only {allowed} can be {action}; got {principal_type} {principal_id}")]
    UnsupportedPrincipal {
        /// What was attempted, e.g. "granted permissions"
        action: String,
        /// Principal kinds that are allowed
        allowed: String,
        /// The principal's resource type
        principal_type: String,
        /// The principal's id
        principal_id: String,
    },

    /// A permission entitlement arrived without its upstream role.
    #[error("entitlement {0} carries no role binding")]
    MissingRoleBinding(String),

    /// A resource is missing a profile value that is required.
    #[error("resource {resource} has no {field} in its profile")]
    MissingProfileField {
        /// The resource
        resource: String,
        /// The missing key
        field: String,
    },

    /// A resource is missing the parent it needs.
    #[error("resource {0} has no parent resource")]
    MissingParent(String),

    /// The resource type does not support grant/revoke.
    #[error("resource type {0} does not support provisioning")]
    NotProvisionable(String),

    /// The page token's current frame makes no sense for this listing.
    #[error("unexpected page state {resource_type} while listing {listing}")]
    UnexpectedPageState {
        /// The frame's resource type
        resource_type: String,
        /// The listing being performed
        listing: String,
    },
}
