use serde::Deserialize;

use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Role {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl SegmentRestClient {
    pub(crate) async fn list_roles(&self, cursor: &str) -> Result<Listing<Role>, SegmentError> {
        self.list_page(&[consts::ROLES], "roles", cursor, &[], "listing roles")
            .await
    }
}
