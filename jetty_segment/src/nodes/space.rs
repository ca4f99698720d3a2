use serde::Deserialize;

use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

/// An Engage space.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Space {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl SegmentRestClient {
    pub(crate) async fn list_spaces(&self, cursor: &str) -> Result<Listing<Space>, SegmentError> {
        self.list_page(&[consts::SPACES], "spaces", cursor, &[], "listing spaces")
            .await
    }
}
