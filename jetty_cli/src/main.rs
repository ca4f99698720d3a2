//! Jetty CLI
//!

#![deny(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};

use jetty_core::{
    connectors::sync::SyncRunner,
    fetch_credentials,
    jetty::{ConnectorNamespace, JettyConfig},
    logging::{self, info, warn, LevelFilter},
    project, Connector,
};
use jetty_segment::{SegmentConnector, CONNECTOR_TYPE};

/// Jetty CLI: sync Segment access into a resource graph
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: JettyCommand,
    #[clap(short, long)]
    log_level: Option<LevelFilter>,
    /// Project directory holding jetty_config.yaml.
    #[clap(short, long, default_value = ".")]
    project: PathBuf,
}

#[derive(Subcommand, Debug)]
enum JettyCommand {
    /// Check that the configured credentials work.
    Validate,
    /// Sync every Segment connector in the project.
    Sync {
        /// Print the synced graph as JSON.
        #[clap(long, value_parser, default_value = "false")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup(args.log_level);

    let connectors = connectors(&args.project)?;
    match &args.command {
        JettyCommand::Validate => {
            for (namespace, connector) in &connectors {
                connector
                    .validate()
                    .await
                    .with_context(|| format!("validating {namespace}"))?;
                info!("{namespace}: credentials are valid");
            }
        }
        JettyCommand::Sync { json } => {
            for (namespace, connector) in &connectors {
                sync(namespace, connector, *json).await?;
            }
        }
    }

    Ok(())
}

/// Build every Segment connector configured in the project.
fn connectors(project_path: &Path) -> Result<Vec<(ConnectorNamespace, Box<SegmentConnector>)>> {
    let config = JettyConfig::read_from_file(project::jetty_cfg_path(project_path))
        .context("reading jetty_config.yaml")?;
    let creds = fetch_credentials(project::connector_cfg_path())
        .context("reading connector credentials")?;

    let mut built = vec![];
    for (namespace, connector_config) in config.connectors_of_type(CONNECTOR_TYPE) {
        let connector_creds = creds
            .get(&namespace.0)
            .ok_or_else(|| anyhow!("no credentials found for {namespace}"))?;
        built.push((
            namespace.to_owned(),
            SegmentConnector::new(connector_config, connector_creds)?,
        ));
    }

    if built.is_empty() {
        bail!("no {CONNECTOR_TYPE} connectors configured");
    }
    Ok(built)
}

async fn sync(namespace: &ConnectorNamespace, connector: &SegmentConnector, json: bool) -> Result<()> {
    info!("syncing {namespace}");
    let now = Instant::now();
    let graph = SyncRunner::new(connector.resource_syncers())
        .run()
        .await
        .with_context(|| format!("syncing {namespace}"))?;
    info!(
        "{namespace} took {} seconds: {} resources, {} entitlements, {} grants",
        now.elapsed().as_secs_f32(),
        graph.resources.len(),
        graph.entitlements.len(),
        graph.grants.len()
    );

    for failure in &graph.partial_failures {
        warn!("{namespace}: {} skipped: {}", failure.subkind, failure.message);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    }
    Ok(())
}
