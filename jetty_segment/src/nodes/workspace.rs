use serde::Deserialize;

use crate::rest::{SegmentError, SegmentRestClient};

/// The workspace the access token belongs to.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Workspace {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl SegmentRestClient {
    pub(crate) async fn get_workspace(&self) -> Result<Workspace, SegmentError> {
        self.fetch_one(&[], &["workspace"], "getting workspace").await
    }
}
