use serde::Deserialize;

use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct Warehouse {
    pub id: String,
    #[serde(default)]
    pub metadata: WarehouseMetadata,
}

/// Warehouses carry their name in the metadata of their integration.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct WarehouseMetadata {
    #[serde(default)]
    pub name: String,
}

impl SegmentRestClient {
    pub(crate) async fn list_warehouses(
        &self,
        cursor: &str,
    ) -> Result<Listing<Warehouse>, SegmentError> {
        self.list_page(
            &[consts::WAREHOUSES],
            "warehouses",
            cursor,
            &[],
            "listing warehouses",
        )
        .await
    }
}
