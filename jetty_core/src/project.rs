//! Path utilities for project organization.
//!
//! The project structure currently looks like this:
//!
//! ```text
//! ~
//!  └── .jetty
//!       └── connectors.yaml
//! pwd
//!  └── {project_name}
//!       └── jetty_config.yaml
//! ```

use std::path::{Path, PathBuf};

use dirs::home_dir;
use lazy_static::lazy_static;

lazy_static! {
    static ref JETTY_CFG: PathBuf = PathBuf::from("jetty_config.yaml");
    static ref CONNECTOR_CFG: PathBuf = PathBuf::from("connectors.yaml");
    static ref PROFILE_CFG_DIR: PathBuf = PathBuf::from(".jetty");
}

/// The path to the jetty config file inside a project.
pub fn jetty_cfg_path<P: AsRef<Path>>(project_path: P) -> PathBuf {
    project_path.as_ref().join(jetty_cfg_path_local())
}

/// Local path for the jetty config.
pub fn jetty_cfg_path_local() -> PathBuf {
    JETTY_CFG.to_owned()
}

/// The user's profile directory (`~/.jetty`). Falls back to a relative
/// `.jetty` when no home directory can be found.
pub fn profile_cfg_dir() -> PathBuf {
    home_dir()
        .map(|home| home.join(PROFILE_CFG_DIR.as_path()))
        .unwrap_or_else(|| PROFILE_CFG_DIR.to_owned())
}

/// The path to the connector credentials file.
pub fn connector_cfg_path() -> PathBuf {
    profile_cfg_dir().join(CONNECTOR_CFG.as_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_end_with_expected_files() {
        assert!(jetty_cfg_path("proj").ends_with("proj/jetty_config.yaml"));
        assert!(connector_cfg_path().ends_with(".jetty/connectors.yaml"));
    }
}
