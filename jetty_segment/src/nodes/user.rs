use serde::Deserialize;

use super::Permission;
use crate::consts;
use crate::rest::{Listing, SegmentError, SegmentRestClient};

#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct User {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl User {
    /// First and last name, split on the first space.
    pub(crate) fn split_name(&self) -> (&str, &str) {
        let name = self.name.trim();
        name.split_once(' ')
            .map(|(first, last)| (first, last.trim()))
            .unwrap_or((name, ""))
    }
}

impl SegmentRestClient {
    pub(crate) async fn list_users(&self, cursor: &str) -> Result<Listing<User>, SegmentError> {
        self.list_page(&[consts::USERS], "users", cursor, &[], "listing users")
            .await
    }

    pub(crate) async fn get_user(&self, user_id: &str) -> Result<User, SegmentError> {
        self.fetch_one(
            &[consts::USERS, user_id],
            &["user"],
            &format!("getting user {user_id}"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> User {
        User {
            name: name.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn names_split_on_first_space() {
        assert_eq!(named("Ada Lovelace").split_name(), ("Ada", "Lovelace"));
        assert_eq!(named("Mary Ann Evans").split_name(), ("Mary", "Ann Evans"));
        assert_eq!(named("Plato").split_name(), ("Plato", ""));
    }
}
