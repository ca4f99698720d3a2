use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{Permission, User};
use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

/// A user group.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub member_count: i64,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Deserialize)]
struct RemoveMemberData {
    #[serde(default)]
    status: String,
}

impl SegmentRestClient {
    pub(crate) async fn list_groups(&self, cursor: &str) -> Result<Listing<Group>, SegmentError> {
        self.list_page(&[consts::GROUPS], "userGroups", cursor, &[], "listing groups")
            .await
    }

    pub(crate) async fn get_group(&self, group_id: &str) -> Result<Group, SegmentError> {
        self.fetch_one(
            &[consts::GROUPS, group_id],
            &["group", "userGroup"],
            &format!("getting group {group_id}"),
        )
        .await
    }

    pub(crate) async fn list_group_members(
        &self,
        group_id: &str,
        cursor: &str,
    ) -> Result<Listing<User>, SegmentError> {
        self.list_page(
            &[consts::GROUPS, group_id, consts::USERS],
            "users",
            cursor,
            &[],
            &format!("listing members of group {group_id}"),
        )
        .await
    }

    pub(crate) async fn add_group_member(
        &self,
        group_id: &str,
        email: &str,
    ) -> Result<(), SegmentError> {
        let _: Map<String, Value> = self
            .send(
                Method::POST,
                self.endpoint(&[consts::GROUPS, group_id, consts::USERS]),
                &[],
                Some(json!({ "emails": [email] })),
                &format!("adding {email} to group {group_id}"),
            )
            .await?;
        Ok(())
    }

    pub(crate) async fn remove_group_member(
        &self,
        group_id: &str,
        email: &str,
    ) -> Result<(), SegmentError> {
        let context = format!("removing {email} from group {group_id}");
        let data: RemoveMemberData = self
            .send(
                Method::DELETE,
                self.endpoint(&[consts::GROUPS, group_id, consts::USERS]),
                &[("emails", json!([email]).to_string())],
                None,
                &context,
            )
            .await?;
        if data.status != consts::REMOVE_MEMBER_SUCCESS {
            return Err(SegmentError::Upstream {
                context,
                kind: "unexpected_status".to_owned(),
                message: format!("upstream reported status {:?}", data.status),
            });
        }
        Ok(())
    }
}
