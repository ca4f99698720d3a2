//! Jetty Module
//!
use std::fs;
use std::path::Path;
use std::{collections::HashMap, fmt::Display};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use yaml_peg::serde as yaml;

use crate::logging::debug;

/// The user-defined namespace corresponding to the connector.
#[derive(Clone, Deserialize, Debug, Hash, PartialEq, Eq, Default, PartialOrd, Ord, Serialize)]
pub struct ConnectorNamespace(pub String);

impl Display for ConnectorNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Struct representing the jetty_config.yaml file.
#[derive(Deserialize, Serialize, Debug, Default, Clone)]
pub struct JettyConfig {
    #[serde(default = "default_version")]
    version: String,
    name: String,
    /// All connector configs defined.
    #[serde(default)]
    pub connectors: HashMap<ConnectorNamespace, ConnectorConfig>,
}

fn default_version() -> String {
    "0.0.1".to_owned()
}

impl JettyConfig {
    /// New === default for this simple constructor.
    pub fn new() -> Self {
        Self {
            version: default_version(),
            ..Default::default()
        }
    }

    /// Ingest the Jetty config from the given path.
    pub fn read_from_file<P: AsRef<Path>>(path: P) -> Result<JettyConfig> {
        let config_raw = fs::read_to_string(&path).context("Reading file")?;
        Self::from_yaml(&config_raw)
    }

    /// Parse a config from a yaml string.
    pub fn from_yaml(config_raw: &str) -> Result<JettyConfig> {
        let mut config =
            yaml::from_str::<JettyConfig>(config_raw).context("Deserializing config")?;
        config.pop().ok_or_else(|| anyhow!["empty config"])
    }

    /// Set the project name.
    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Get the name
    pub fn get_name(&self) -> String {
        self.name.to_owned()
    }

    /// All connectors of the given type, keyed by namespace.
    pub fn connectors_of_type<'a>(
        &'a self,
        connector_type: &'a str,
    ) -> impl Iterator<Item = (&'a ConnectorNamespace, &'a ConnectorConfig)> + 'a {
        self.connectors
            .iter()
            .filter(move |(_, c)| c.connector_type == connector_type)
    }

    /// Convert this config to a yaml string.
    pub fn to_yaml(&self) -> Result<String> {
        yaml::to_string(self).map_err(anyhow::Error::from)
    }
}

/// Config for all connectors in this project.
#[derive(Clone, Deserialize, Serialize, Default, Debug)]
pub struct ConnectorConfig {
    /// The connector type
    #[serde(rename = "type")]
    pub connector_type: String,
    /// Additional configuration, specific to the connector
    #[serde(flatten)]
    pub config: HashMap<String, String>,
}

impl ConnectorConfig {
    /// Basic constructor
    pub fn new(connector_type: String, config: HashMap<String, String>) -> Self {
        Self {
            connector_type,
            config,
        }
    }

    /// Parse an optional config value, falling back to `default` when unset.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.config.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("invalid value {raw:?} for connector config {key}: {e}")),
            None => Ok(default),
        }
    }
}

/// Alias for HashMap to hold credentials information.
pub type CredentialsMap = HashMap<String, String>;

/// Fetch the credentials from the Jetty connectors config.
pub fn fetch_credentials<P: AsRef<Path>>(path: P) -> Result<HashMap<String, CredentialsMap>> {
    debug!("Trying to read credentials from {:?}", path.as_ref());
    let credentials_raw = fs::read_to_string(path)?;
    let mut config = yaml::from_str::<HashMap<String, CredentialsMap>>(&credentials_raw)?;

    config
        .pop()
        .ok_or_else(|| anyhow!["failed to generate credentials"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_connectors() -> Result<()> {
        let config = JettyConfig::from_yaml(
            r#"
name: access
connectors:
  segment:
    type: segment
    page_size: "50"
"#,
        )?;
        assert_eq!(config.get_name(), "access");
        let (namespace, segment) = config
            .connectors_of_type("segment")
            .next()
            .expect("segment connector");
        assert_eq!(namespace.to_string(), "segment");
        assert_eq!(segment.parse_or("page_size", 200usize)?, 50);
        assert_eq!(segment.parse_or("retries", 3u32)?, 3);
        Ok(())
    }

    #[test]
    fn bad_config_value_is_an_error() {
        let config = ConnectorConfig::new(
            "segment".to_owned(),
            HashMap::from([("page_size".to_owned(), "lots".to_owned())]),
        );
        assert!(config.parse_or("page_size", 200usize).is_err());
    }
}
