// SPDX-License-Identifier: GPL-3.0-only
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{BridgeError, Result};
use crate::store::models::{AUTHOR_ROLE_NAME, MEDUSA_ROLE_NAME, SERVICE_USERNAME};
use crate::store::{
    ContentStore, NewRole, NewUser, Permissions, RoleId, ServiceAccountUser, ServiceUserParams, UserId,
};

/// Result of making sure the Medusa role exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLookup {
    Existing(RoleId),
    Created(RoleId),
    /// Creation was attempted and failed
    Failed,
}

impl RoleLookup {
    pub fn id(&self) -> Option<RoleId> {
        match self {
            RoleLookup::Existing(id) | RoleLookup::Created(id) => Some(*id),
            RoleLookup::Failed => None,
        }
    }
}

/// Ensures the Medusa role and service account exist in the content store.
///
/// Lookups never propagate errors: a failed lookup is logged and treated as
/// "not found", and hard creation failures come back as `Failed` / `None`.
pub struct IdentityProvisioner {
    store: Arc<dyn ContentStore>,
}

impl IdentityProvisioner {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn find_role(&self) -> Option<RoleId> {
        debug!(role = MEDUSA_ROLE_NAME, "Checking if role exists");
        match self.store.find_role_by_name(MEDUSA_ROLE_NAME).await {
            Ok(Some(role)) => {
                info!(role = MEDUSA_ROLE_NAME, role_id = role.id, "Found role");
                Some(role.id)
            }
            Ok(None) => None,
            Err(e) => {
                error!(role = MEDUSA_ROLE_NAME, error = %e, "Role lookup failed");
                None
            }
        }
    }

    /// Enable every action of every controller in place
    pub fn enable_full_access(permissions: &mut Permissions) {
        for (resource, controllers) in permissions.iter_mut() {
            info!(resource = %resource, role = MEDUSA_ROLE_NAME, "Enabling CRUD permission on model");
            for actions in controllers.controllers.values_mut() {
                for permission in actions.values_mut() {
                    permission.enabled = true;
                }
            }
        }
    }

    pub async fn ensure_role(&self, permissions: Permissions) -> RoleLookup {
        if let Some(id) = self.find_role().await {
            return RoleLookup::Existing(id);
        }

        debug!(role = MEDUSA_ROLE_NAME, "Creating role");
        let role = NewRole {
            name: MEDUSA_ROLE_NAME.to_string(),
            description: "reusing medusa role".to_string(),
            permissions,
        };
        match self.store.create_role(role).await {
            Ok(id) => {
                info!(role = MEDUSA_ROLE_NAME, role_id = id, "Role created successfully");
                RoleLookup::Created(id)
            }
            Err(e) => {
                warn!(role = MEDUSA_ROLE_NAME, error = %e, "Unable to create role");
                RoleLookup::Failed
            }
        }
    }

    pub async fn find_service_user(&self) -> Option<UserId> {
        debug!(username = SERVICE_USERNAME, "Checking if service user exists");
        match self.store.find_user_by_username(SERVICE_USERNAME).await {
            Ok(Some(user)) => {
                info!(username = SERVICE_USERNAME, user_id = user.id, "Found service user");
                Some(user.id)
            }
            Ok(None) => {
                warn!(username = SERVICE_USERNAME, "Service user not found");
                None
            }
            Err(e) => {
                error!(username = SERVICE_USERNAME, error = %e, "Service user lookup failed");
                None
            }
        }
    }

    /// Return the user owning `params.email`, creating it when absent
    pub async fn ensure_service_user(&self, params: &ServiceUserParams) -> Option<ServiceAccountUser> {
        match self.store.find_users_by_email(&params.email).await {
            Ok(users) => match users.into_iter().next() {
                Some(user) => Some(user),
                None => self.create_service_user(params).await,
            },
            Err(e) => {
                error!(email = %params.email, error = %e, "Unable to look up service user");
                None
            }
        }
    }

    async fn create_service_user(&self, params: &ServiceUserParams) -> Option<ServiceAccountUser> {
        info!(username = %params.username, "Creating service user");

        let role = self.find_role().await;
        if role.is_none() {
            warn!(role = MEDUSA_ROLE_NAME, "Role doesn't exist, creating user without it");
        }

        let password_hash = match params.password.as_deref().map(hash_password).transpose() {
            Ok(hash) => hash,
            Err(e) => {
                error!(username = %params.username, error = %e, "Unable to hash password");
                return None;
            }
        };

        let new_user = NewUser {
            username: params.username.clone(),
            email: params.email.clone(),
            password_hash,
            provider: params.provider.clone(),
            confirmed: params.confirmed,
            blocked: params.blocked,
            role,
        };

        let user = match self.store.create_user(new_user.clone()).await {
            Ok(user) => user,
            Err(e) => {
                error!(username = %params.username, email = %params.email, error = %e, "Failed to create user");
                return None;
            }
        };
        info!(
            username = %user.username,
            email = %user.email,
            user_id = user.id,
            "User created successfully"
        );

        self.attach_author_role(&new_user).await;
        Some(user)
    }

    // Best effort: the user stays created even if this fails.
    async fn attach_author_role(&self, user: &NewUser) {
        let author = match self.store.find_admin_role(AUTHOR_ROLE_NAME).await {
            Ok(Some(role)) => role,
            Ok(None) => {
                debug!(role = AUTHOR_ROLE_NAME, "No admin role to attach");
                return;
            }
            Err(e) => {
                warn!(role = AUTHOR_ROLE_NAME, error = %e, "Admin role lookup failed");
                return;
            }
        };

        info!(username = %user.username, email = %user.email, "Attaching admin author role");
        match self.store.create_admin_user(user, &author).await {
            Ok(_) => info!(username = %user.username, "Attached admin author role"),
            Err(e) => warn!(
                username = %user.username,
                email = %user.email,
                error = %e,
                "Unable to attach admin author role"
            ),
        }
    }

    /// Grant the role access to every registered resource, then make sure
    /// the role and the service user exist.
    pub async fn provision(&self, params: &ServiceUserParams) -> Option<ServiceAccountUser> {
        let mut permissions = match self.store.list_resource_actions().await {
            Ok(permissions) => permissions,
            Err(e) => {
                error!(error = %e, "Unable to list resource actions");
                Permissions::new()
            }
        };
        Self::enable_full_access(&mut permissions);

        match self.ensure_role(permissions).await.id() {
            Some(id) => debug!(role = MEDUSA_ROLE_NAME, role_id = id, "Role ready"),
            None => warn!(role = MEDUSA_ROLE_NAME, "Continuing without role"),
        }

        self.ensure_service_user(params).await
    }
}

fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::SaltString;
    use argon2::password_hash::rand_core::OsRng;
    use argon2::{Argon2, PasswordHasher};
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| BridgeError::Password(e.to_string()))?;
    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{ActionPermission, DEFAULT_ACTIONS};
    use crate::test_helpers::setup_test_store;

    fn params(email: &str) -> ServiceUserParams {
        ServiceUserParams {
            email: email.to_string(),
            password: Some("medusa-password".to_string()),
            ..ServiceUserParams::default()
        }
    }

    #[test]
    fn test_enable_full_access_flips_every_action() {
        let mut permissions = Permissions::new();
        for (namespace, controller) in [("api::product", "product"), ("api::region", "region")] {
            let actions = permissions
                .entry(namespace.to_string())
                .or_default()
                .controllers
                .entry(controller.to_string())
                .or_default();
            for action in DEFAULT_ACTIONS {
                actions.insert(action.to_string(), ActionPermission { enabled: false });
            }
        }

        IdentityProvisioner::enable_full_access(&mut permissions);

        assert!(permissions
            .values()
            .flat_map(|r| r.controllers.values())
            .flat_map(|a| a.values())
            .all(|p| p.enabled));
    }

    #[test]
    fn test_hash_password_verifies() {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};
        let hash = hash_password("medusa-password").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"medusa-password", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
    }

    #[tokio::test]
    async fn test_find_role_absent() {
        let (store, _dir) = setup_test_store().await;
        let provisioner = IdentityProvisioner::new(Arc::new(store));
        assert_eq!(provisioner.find_role().await, None);
    }

    #[tokio::test]
    async fn test_ensure_role_is_idempotent() {
        let (store, _dir) = setup_test_store().await;
        let provisioner = IdentityProvisioner::new(Arc::new(store));

        let created = provisioner.ensure_role(Permissions::new()).await;
        let id = match created {
            RoleLookup::Created(id) => id,
            other => panic!("expected a new role, got {other:?}"),
        };
        assert_eq!(provisioner.ensure_role(Permissions::new()).await, RoleLookup::Existing(id));
        assert_eq!(provisioner.find_role().await, Some(id));
    }

    #[tokio::test]
    async fn test_ensure_service_user_twice_returns_same_user() {
        let (store, _dir) = setup_test_store().await;
        let store = Arc::new(store);
        let provisioner = IdentityProvisioner::new(store.clone());
        let role = provisioner.ensure_role(Permissions::new()).await.id();

        let first = provisioner.ensure_service_user(&params("ops@example.com")).await.unwrap();
        let second = provisioner.ensure_service_user(&params("ops@example.com")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, role);
        assert_eq!(store.find_users_by_email("ops@example.com").await.unwrap().len(), 1);
        assert_eq!(provisioner.find_service_user().await, Some(first.id));
    }

    #[tokio::test]
    async fn test_user_created_without_role_when_role_missing() {
        let (store, _dir) = setup_test_store().await;
        let provisioner = IdentityProvisioner::new(Arc::new(store));

        let user = provisioner.ensure_service_user(&params("ops@example.com")).await.unwrap();
        assert_eq!(user.role, None);
    }

    #[tokio::test]
    async fn test_admin_role_failure_does_not_fail_user_creation() {
        let (store, _dir) = setup_test_store().await;
        let author = store.find_admin_role(AUTHOR_ROLE_NAME).await.unwrap().unwrap();
        // Occupy the admin email so the mirror insert fails
        let squatter = NewUser {
            username: "someone".to_string(),
            email: "ops@example.com".to_string(),
            password_hash: None,
            provider: "local".to_string(),
            confirmed: true,
            blocked: false,
            role: None,
        };
        store.create_admin_user(&squatter, &author).await.unwrap();

        let provisioner = IdentityProvisioner::new(Arc::new(store));
        let user = provisioner.ensure_service_user(&params("ops@example.com")).await;
        assert!(user.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_a_hard_failure() {
        let (store, _dir) = setup_test_store().await;
        let provisioner = IdentityProvisioner::new(Arc::new(store));

        assert!(provisioner.ensure_service_user(&params("a@example.com")).await.is_some());
        // Same username, different email: the store rejects it
        assert!(provisioner.ensure_service_user(&params("b@example.com")).await.is_none());
    }

    #[tokio::test]
    async fn test_provision_grants_registered_resources() {
        let (store, _dir) = setup_test_store().await;
        store.register_resource("api::region.region", DEFAULT_ACTIONS).await.unwrap();
        let store = Arc::new(store);
        let provisioner = IdentityProvisioner::new(store.clone());

        let user = provisioner.provision(&params("ops@example.com")).await.unwrap();

        let role = store.find_role_by_name(MEDUSA_ROLE_NAME).await.unwrap().unwrap();
        assert_eq!(user.role, Some(role.id));
        let region = &role.permissions["api::region"].controllers["region"];
        assert_eq!(region.len(), DEFAULT_ACTIONS.len());
        assert!(region.values().all(|p| p.enabled));
    }

    #[test]
    fn test_role_lookup_id() {
        assert_eq!(RoleLookup::Existing(3).id(), Some(3));
        assert_eq!(RoleLookup::Created(4).id(), Some(4));
        assert_eq!(RoleLookup::Failed.id(), None);
    }
}
