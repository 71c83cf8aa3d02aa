// SPDX-License-Identifier: GPL-3.0-only
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role every account created on behalf of Medusa belongs to
pub const MEDUSA_ROLE_NAME: &str = "Medusa";

pub const SERVICE_USERNAME: &str = "medusa_user";

/// Administrative role granted to the service account when present
pub const AUTHOR_ROLE_NAME: &str = "Author";

/// Namespace prefix of application-defined content types
pub const API_NAMESPACE: &str = "api::";

/// Actions every content type exposes
pub const DEFAULT_ACTIONS: &[&str] = &["find", "findOne", "create", "update", "delete"];

pub type RoleId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPermission {
    pub enabled: bool,
}

/// Actions grouped by controller for one resource namespace (e.g. `api::product`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePermissions {
    pub controllers: BTreeMap<String, BTreeMap<String, ActionPermission>>,
}

/// Resource namespace -> controllers -> action -> permission
pub type Permissions = BTreeMap<String, ResourcePermissions>;

/// Split `api::product.product` into (`api::product`, `product`).
pub fn split_resource_key(key: &str) -> Option<(&str, &str)> {
    let (namespace, controller) = key.rsplit_once('.')?;
    if namespace.is_empty() || controller.is_empty() || !namespace.contains("::") {
        return None;
    }
    Some((namespace, controller))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    pub permissions: Permissions,
}

/// Account parameters for the Medusa service user, usually from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceUserParams {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub confirmed: bool,
    pub blocked: bool,
    pub provider: String,
}

impl Default for ServiceUserParams {
    fn default() -> Self {
        Self {
            username: SERVICE_USERNAME.to_string(),
            email: "support@medusa-commerce.com".to_string(),
            password: None,
            confirmed: true,
            blocked: false,
            provider: "local".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub provider: String,
    pub confirmed: bool,
    pub blocked: bool,
    pub role: Option<RoleId>,
    pub created_at: DateTime<Utc>,
}

/// User row ready for insertion; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub provider: String,
    pub confirmed: bool,
    pub blocked: bool,
    pub role: Option<RoleId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRole {
    pub id: i64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_resource_key() {
        assert_eq!(
            split_resource_key("api::shipping-option.shipping-option"),
            Some(("api::shipping-option", "shipping-option"))
        );
        assert_eq!(
            split_resource_key("plugin::users-permissions.user"),
            Some(("plugin::users-permissions", "user"))
        );
        assert_eq!(split_resource_key("product"), None);
        assert_eq!(split_resource_key("product.product"), None);
        assert_eq!(split_resource_key("api::product."), None);
    }

    #[test]
    fn test_permissions_serialize_shape() {
        let mut permissions = Permissions::new();
        permissions
            .entry("api::region".to_string())
            .or_default()
            .controllers
            .entry("region".to_string())
            .or_default()
            .insert("find".to_string(), ActionPermission { enabled: true });

        let json = serde_json::to_value(&permissions).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "api::region": { "controllers": { "region": { "find": { "enabled": true } } } }
            })
        );
    }

    #[test]
    fn test_service_user_defaults() {
        let params = ServiceUserParams::default();
        assert_eq!(params.username, SERVICE_USERNAME);
        assert!(params.confirmed);
        assert!(!params.blocked);
        assert_eq!(params.provider, "local");
        assert_eq!(params.password, None);
    }
}
