use serde::Deserialize;

use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Source {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl SegmentRestClient {
    pub(crate) async fn list_sources(&self, cursor: &str) -> Result<Listing<Source>, SegmentError> {
        self.list_page(&[consts::SOURCES], "sources", cursor, &[], "listing sources")
            .await
    }
}
