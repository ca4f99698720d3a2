use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts;
use crate::rest::{take_field, SegmentError, SegmentRestClient};

/// A role held by a user or group, applied to a set of resources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Permission {
    pub role_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_name: String,
    #[serde(default)]
    pub resources: Vec<PermissionResource>,
}

impl Permission {
    pub(crate) fn applies_to(&self, resource_id: &str) -> bool {
        self.resources.iter().any(|r| r.id == resource_id)
    }

    pub(crate) fn applies_to_type(&self, resource_type: &str) -> bool {
        self.resources.iter().any(|r| r.resource_type == resource_type)
    }
}

/// The target of a permission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub(crate) struct PermissionResource {
    pub id: String,
    /// Upstream resource-type tag, e.g. `SOURCE`
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl PermissionResource {
    pub(crate) fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
        }
    }
}

impl SegmentRestClient {
    /// Replace the full permission set of a user or group. Returns the set
    /// the upstream echoes back.
    ///
    /// `principal_collection` is the collection path, `users` or `groups`.
    pub(crate) async fn update_permissions(
        &self,
        principal_collection: &str,
        principal_id: &str,
        permissions: &[Permission],
    ) -> Result<Vec<Permission>, SegmentError> {
        let context = format!("updating permissions of {principal_collection}/{principal_id}");
        let body = serde_json::json!({ "permissions": permissions });
        let data: Map<String, Value> = self
            .send(
                Method::PUT,
                self.endpoint(&[principal_collection, principal_id, consts::PERMISSIONS]),
                &[],
                Some(body),
                &context,
            )
            .await?;
        if !data.contains_key("permissions") {
            return Ok(vec![]);
        }
        take_field(&context, data, &["permissions"])
    }
}
