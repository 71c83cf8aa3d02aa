// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::store::models::{AdminRole, NewRole, NewUser, Permissions, Role, RoleId, ServiceAccountUser};

/// Operations the bridge performs on the content-management side
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Create a role and return its id. Names are unique.
    async fn create_role(&self, role: NewRole) -> Result<RoleId>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<ServiceAccountUser>>;

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<ServiceAccountUser>>;

    async fn create_user(&self, user: NewUser) -> Result<ServiceAccountUser>;

    async fn find_admin_role(&self, name: &str) -> Result<Option<AdminRole>>;

    /// Mirror a user into the admin panel with the given admin role
    async fn create_admin_user(&self, user: &NewUser, role: &AdminRole) -> Result<i64>;

    /// Every registered resource with its actions, all disabled
    async fn list_resource_actions(&self) -> Result<Permissions>;

    /// Register a resource key (`api::x.x`) with the given actions
    async fn register_resource(&self, key: &str, actions: &[&str]) -> Result<()>;

    async fn count(&self, key: &str) -> Result<u64>;

    /// Delete up to `limit` records of `key`, oldest first. Returns rows removed.
    async fn delete(&self, key: &str, limit: u64) -> Result<u64>;
}

/// Per-resource ingestion of a seed payload
#[async_trait]
pub trait ResourceBootstrapper: Send + Sync {
    async fn bootstrap(&self, key: &str, payload: &Value) -> Result<usize>;
}
