//! Permission changes for users and groups.
//!
//! Segment only offers "replace every permission of this principal", so each
//! change is a read-modify-write of the principal's whole set. Changes to
//! the same principal are serialized within one reconciler.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use jetty_core::connectors::nodes::{Resource, ResourceId};
use jetty_core::connectors::SyncError;
use jetty_core::logging::{debug, info};
use tokio::sync::Mutex;

use crate::consts;
use crate::nodes::{Permission, PermissionResource};
use crate::resource_types::ResourceKind;
use crate::rest::SegmentRestClient;

/// Principals that can hold permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrincipalKind {
    User,
    Group,
}

impl PrincipalKind {
    fn of(principal: &Resource, action: &str) -> Result<Self> {
        match ResourceKind::from_id(&principal.id.resource_type) {
            Some(ResourceKind::User) => Ok(PrincipalKind::User),
            Some(ResourceKind::Group) => Ok(PrincipalKind::Group),
            _ => Err(SyncError::UnsupportedPrincipal {
                action: action.to_owned(),
                allowed: "users and groups".to_owned(),
                principal_type: principal.id.resource_type.to_owned(),
                principal_id: principal.id.resource.to_owned(),
            }
            .into()),
        }
    }

    fn collection(self) -> &'static str {
        match self {
            PrincipalKind::User => consts::USERS,
            PrincipalKind::Group => consts::GROUPS,
        }
    }
}

/// Applies grant and revoke as full-set replacements.
pub(crate) struct PermissionReconciler {
    client: Arc<SegmentRestClient>,
    locks: Mutex<HashMap<ResourceId, Arc<Mutex<()>>>>,
}

impl PermissionReconciler {
    pub(crate) fn new(client: Arc<SegmentRestClient>) -> Self {
        Self {
            client,
            locks: Default::default(),
        }
    }

    async fn lock_for(&self, principal: &ResourceId) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(principal.to_owned())
            .or_default()
            .clone()
    }

    /// Drop the principal's lock once nobody else is waiting on it.
    async fn release(&self, principal: &ResourceId, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        // One reference in the map, one held here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(principal);
        }
    }

    async fn current_permissions(
        &self,
        kind: PrincipalKind,
        principal_id: &str,
    ) -> Result<Vec<Permission>> {
        Ok(match kind {
            PrincipalKind::User => self.client.get_user(principal_id).await?.permissions,
            PrincipalKind::Group => self.client.get_group(principal_id).await?.permissions,
        })
    }

    /// Give `principal` `role_id` on `target`. Returns whether a write was
    /// issued; a principal that already holds the pair is left alone.
    pub(crate) async fn grant(
        &self,
        principal: &Resource,
        role_id: &str,
        target: PermissionResource,
    ) -> Result<bool> {
        let kind = PrincipalKind::of(principal, "granted permissions")?;
        let lock = self.lock_for(&principal.id).await;
        let written = {
            let _guard = lock.lock().await;
            self.apply_grant(kind, principal, role_id, &target).await
        };
        self.release(&principal.id, lock).await;
        written
    }

    /// Take `role_id` away from `principal`. This removes the role from every
    /// resource it is applied to: the upstream has no finer-grained removal.
    pub(crate) async fn revoke(&self, principal: &Resource, role_id: &str) -> Result<bool> {
        let kind = PrincipalKind::of(principal, "revoked permissions")?;
        let lock = self.lock_for(&principal.id).await;
        let written = {
            let _guard = lock.lock().await;
            self.apply_revoke(kind, principal, role_id).await
        };
        self.release(&principal.id, lock).await;
        written
    }

    async fn apply_grant(
        &self,
        kind: PrincipalKind,
        principal: &Resource,
        role_id: &str,
        target: &PermissionResource,
    ) -> Result<bool> {
        let current = self
            .current_permissions(kind, &principal.id.resource)
            .await
            .with_context(|| format!("reading permissions of {} before granting", principal.id))?;
        let Some(updated) = with_granted(current, role_id, target) else {
            debug!(
                "{} already holds role {role_id} on {}; nothing to grant",
                principal.id, target.id
            );
            return Ok(false);
        };

        self.client
            .update_permissions(kind.collection(), &principal.id.resource, &updated)
            .await
            .with_context(|| {
                format!(
                    "granting role {role_id} on {} {} to {}",
                    target.resource_type, target.id, principal.display_name
                )
            })?;
        info!(
            "granted role {role_id} on {} {} to {}",
            target.resource_type, target.id, principal.id
        );
        Ok(true)
    }

    async fn apply_revoke(
        &self,
        kind: PrincipalKind,
        principal: &Resource,
        role_id: &str,
    ) -> Result<bool> {
        let current = self
            .current_permissions(kind, &principal.id.resource)
            .await
            .with_context(|| format!("reading permissions of {} before revoking", principal.id))?;
        let Some(updated) = without_role(current, role_id) else {
            debug!("{} does not hold role {role_id}; nothing to revoke", principal.id);
            return Ok(false);
        };

        self.client
            .update_permissions(kind.collection(), &principal.id.resource, &updated)
            .await
            .with_context(|| {
                format!("revoking role {role_id} from {}", principal.display_name)
            })?;
        info!("revoked role {role_id} from {}", principal.id);
        Ok(true)
    }
}

/// The set after granting, or `None` if the pair is already held.
fn with_granted(
    mut permissions: Vec<Permission>,
    role_id: &str,
    target: &PermissionResource,
) -> Option<Vec<Permission>> {
    if permissions
        .iter()
        .any(|p| p.role_id == role_id && p.applies_to(&target.id))
    {
        return None;
    }
    permissions.push(Permission {
        role_id: role_id.to_owned(),
        role_name: String::new(),
        resources: vec![target.to_owned()],
    });
    Some(permissions)
}

/// The set without any entry for `role_id`, or `None` if there was none.
fn without_role(permissions: Vec<Permission>, role_id: &str) -> Option<Vec<Permission>> {
    let before = permissions.len();
    let kept: Vec<_> = permissions
        .into_iter()
        .filter(|p| p.role_id != role_id)
        .collect();
    (kept.len() != before).then_some(kept)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::syncers::test_support::shared;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn held(role_id: &str, resources: &[(&str, &str)]) -> Permission {
        Permission {
            role_id: role_id.to_owned(),
            role_name: String::new(),
            resources: resources
                .iter()
                .map(|(id, t)| PermissionResource::new(*id, *t))
                .collect(),
        }
    }

    #[test]
    fn granting_appends_one_entry() {
        let current = vec![held("r0", &[("ws", "WORKSPACE")])];
        let updated = with_granted(current.clone(), "r1", &PermissionResource::new("res1", "SOURCE"))
            .unwrap();
        assert_eq!(updated.len(), 2);
        assert_eq!(updated[0], current[0]);
        assert_eq!(updated[1], held("r1", &[("res1", "SOURCE")]));
    }

    #[test]
    fn granting_a_held_pair_is_a_no_op() {
        let current = vec![held("r1", &[("res0", "SOURCE"), ("res1", "SOURCE")])];
        assert!(with_granted(current, "r1", &PermissionResource::new("res1", "SOURCE")).is_none());
    }

    #[test]
    fn same_role_on_another_resource_is_still_granted() {
        let current = vec![held("r1", &[("res0", "SOURCE")])];
        let updated =
            with_granted(current, "r1", &PermissionResource::new("res1", "SOURCE")).unwrap();
        assert_eq!(updated.len(), 2);
    }

    #[test]
    fn revoking_drops_every_entry_of_the_role() {
        let current = vec![
            held("r1", &[("res1", "SOURCE")]),
            held("r2", &[("res1", "SOURCE")]),
            held("r1", &[("res2", "SOURCE")]),
        ];
        let updated = without_role(current, "r1").unwrap();
        assert_eq!(updated, vec![held("r2", &[("res1", "SOURCE")])]);
    }

    #[test]
    fn revoking_an_unheld_role_is_a_no_op() {
        assert!(without_role(vec![held("r2", &[])], "r1").is_none());
    }

    fn ada() -> Resource {
        Resource::new(&ResourceKind::User.resource_type(), "u1", "Ada", None)
    }

    async fn mount_user(server: &MockServer, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/users/u1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"user": {"id": "u1", "permissions": []}}}))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/users/u1/permissions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": {"permissions": []}}))
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn changes_to_one_principal_do_not_interleave() -> Result<()> {
        let server = MockServer::start().await;
        mount_user(&server, Duration::from_millis(200)).await;
        let reconciler = shared(server.uri()).reconciler;
        let principal = ada();

        let (first, second) = tokio::join!(
            reconciler.grant(&principal, "r1", PermissionResource::new("res1", "SOURCE")),
            reconciler.grant(&principal, "r2", PermissionResource::new("res2", "SOURCE")),
        );
        assert!(first? && second?);

        let methods: Vec<_> = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .map(|r| r.method.to_string())
            .collect();
        assert_eq!(methods, vec!["GET", "PUT", "GET", "PUT"]);
        Ok(())
    }

    #[tokio::test]
    async fn locks_are_released_after_each_change() -> Result<()> {
        let server = MockServer::start().await;
        mount_user(&server, Duration::ZERO).await;
        let reconciler = shared(server.uri()).reconciler;

        reconciler
            .grant(&ada(), "r1", PermissionResource::new("res1", "SOURCE"))
            .await?;
        assert!(reconciler.locks.lock().await.is_empty());

        // Nothing to revoke still releases the lock.
        assert!(!reconciler.revoke(&ada(), "r1").await?);
        assert!(reconciler.locks.lock().await.is_empty());
        Ok(())
    }

    #[test]
    fn only_users_and_groups_hold_permissions() {
        let role = Resource::new(&ResourceKind::Role.resource_type(), "r1", "Admin", None);
        let err = PrincipalKind::of(&role, "granted permissions").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::UnsupportedPrincipal { .. })
        ));
        let group = Resource::new(&ResourceKind::Group.resource_type(), "g1", "Eng", None);
        assert_eq!(
            PrincipalKind::of(&group, "granted permissions").unwrap(),
            PrincipalKind::Group
        );
    }
}
