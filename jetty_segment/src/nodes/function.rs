use serde::Deserialize;

use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Function {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
}

impl SegmentRestClient {
    /// List functions of one sub-type, e.g. `DESTINATION`.
    pub(crate) async fn list_functions(
        &self,
        function_type: &str,
        cursor: &str,
    ) -> Result<Listing<Function>, SegmentError> {
        self.list_page(
            &[consts::FUNCTIONS],
            "functions",
            cursor,
            &[("resourceType", function_type.to_owned())],
            &format!("listing {function_type} functions"),
        )
        .await
    }
}
