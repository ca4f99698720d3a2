//! Segment Connector
//!
//! Syncs the users, groups, roles, and workspace of a Segment workspace,
//! along with the sources, warehouses, functions, and spaces roles are
//! applied to, and writes role grants back through the Public API.
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use jetty_core::connectors::sync::SyncRunner;
//! use jetty_core::jetty::ConnectorConfig;
//! use jetty_core::Connector;
//! use jetty_segment::SegmentConnector;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ConnectorConfig::new("segment".to_owned(), HashMap::new());
//! let credentials = HashMap::from([("token".to_owned(), "sgp_...".to_owned())]);
//! let segment = SegmentConnector::new(&config, &credentials)?;
//! segment.validate().await?;
//! let graph = SyncRunner::new(segment.resource_syncers()).run().await?;
//! # Ok(())
//! # }
//! ```

mod consts;
mod creds;
mod entitlements;
mod nodes;
mod resource_types;
mod rest;
mod syncers;
mod write;

pub use resource_types::{ResourceKind, RoleMarkers};
pub use rest::SegmentError;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use jetty_core::connectors::{ConnectorMetadata, ResourceSyncer};
use jetty_core::jetty::{ConnectorConfig, CredentialsMap};
use jetty_core::logging::debug;
use jetty_core::Connector;

use rest::{SegmentRestClient, SegmentRestConfig};
use syncers::Shared;
use write::PermissionReconciler;

/// The connector type name used in `jetty_config.yaml`.
pub const CONNECTOR_TYPE: &str = "segment";

/// The main Segment Connector struct.
pub struct SegmentConnector {
    shared: Shared,
}

impl SegmentConnector {
    fn rest_config(config: &ConnectorConfig) -> Result<SegmentRestConfig> {
        Ok(SegmentRestConfig {
            page_size: config.parse_or("page_size", consts::DEFAULT_PAGE_SIZE)?,
            retries: config.parse_or("retries", consts::DEFAULT_RETRIES)?,
            timeout: Duration::from_secs(
                config.parse_or("timeout_secs", consts::DEFAULT_TIMEOUT_SECS)?,
            ),
        })
    }
}

#[async_trait]
impl Connector for SegmentConnector {
    /// Validates the config and credentials and builds the HTTP client.
    fn new(config: &ConnectorConfig, credentials: &CredentialsMap) -> Result<Box<Self>> {
        let creds = creds::SegmentCredentials::from_map(credentials)?;
        let rest_config = Self::rest_config(config).context("reading Segment connector config")?;
        debug!(
            "segment connector: page size {}, {} retries, {:?} timeout",
            rest_config.page_size, rest_config.retries, rest_config.timeout
        );

        let client = Arc::new(SegmentRestClient::new(creds, rest_config)?);
        Ok(Box::new(SegmentConnector {
            shared: Shared {
                reconciler: Arc::new(PermissionReconciler::new(client.clone())),
                client,
                markers: Arc::new(RoleMarkers::from_config(config)),
            },
        }))
    }

    fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata {
            display_name: "Segment".to_owned(),
            description: "Connector syncing Segment users, groups, roles, and workspaces."
                .to_owned(),
        }
    }

    async fn validate(&self) -> Result<()> {
        self.shared
            .client
            .get_workspace()
            .await
            .context("error validating Segment connector")?;
        Ok(())
    }

    fn resource_syncers(&self) -> Vec<Box<dyn ResourceSyncer>> {
        syncers::all(&self.shared)
    }
}
