use anyhow::{bail, Result};
use jetty_core::jetty::CredentialsMap;

/// Credentials for authenticating to the Segment Public API.
///
/// The token is a workspace access token created in the Segment UI.
#[derive(Debug, Default, Clone)]
pub(crate) struct SegmentCredentials {
    pub(crate) token: String,
    /// Overrides the public API base URL.
    pub(crate) url: Option<String>,
}

impl SegmentCredentials {
    pub(crate) fn from_map(credentials: &CredentialsMap) -> Result<Self> {
        let mut creds = Self::default();
        for (k, v) in credentials {
            match k.as_str() {
                "token" => creds.token = v.to_owned(),
                "url" => creds.url = Some(v.to_owned()),
                _ => (),
            }
        }
        creds.validate()?;
        Ok(creds)
    }

    /// Perform simple field validation to catch bad input.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            bail!(
                "Segment credentials are missing a token. Please make sure your connectors.yaml file is correct."
            );
        }
        Ok(())
    }
}
