// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{BridgeError, Result};
use crate::store::models::{
    split_resource_key, AdminRole, NewRole, NewUser, Permissions, Role, RoleId,
    ServiceAccountUser, AUTHOR_ROLE_NAME, DEFAULT_ACTIONS,
};
use crate::store::traits::{ContentStore, ResourceBootstrapper};

const PLUGIN_RESOURCES: &[&str] = &["plugin::users-permissions.user", "plugin::users-permissions.role"];

const ADMIN_ROLES: &[&str] = &["Super Admin", "Editor", AUTHOR_ROLE_NAME];

pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                permissions TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT,
                provider TEXT NOT NULL,
                confirmed INTEGER NOT NULL,
                blocked INTEGER NOT NULL,
                role_id INTEGER REFERENCES roles(id),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_roles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS admin_users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT,
                admin_role_id INTEGER NOT NULL REFERENCES admin_roles(id),
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resource_actions (
                resource_key TEXT NOT NULL,
                action TEXT NOT NULL,
                PRIMARY KEY (resource_key, action)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_key TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS records_by_resource ON records (resource_key)")
            .execute(&self.pool)
            .await?;

        for name in ADMIN_ROLES {
            sqlx::query("INSERT OR IGNORE INTO admin_roles (name) VALUES (?1)")
                .bind(*name)
                .execute(&self.pool)
                .await?;
        }

        for key in PLUGIN_RESOURCES {
            self.register_resource(key, DEFAULT_ACTIONS).await?;
        }

        info!("Initialized SQLite content store schema");
        Ok(())
    }

    async fn is_registered(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM resource_actions WHERE resource_key = ?1 LIMIT 1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn ensure_registered(&self, key: &str) -> Result<()> {
        if self.is_registered(key).await? {
            Ok(())
        } else {
            Err(BridgeError::UnknownResource(key.to_string()))
        }
    }

    fn role_from_row(row: &SqliteRow) -> Result<Role> {
        let permissions: Permissions = serde_json::from_str(&row.get::<String, _>("permissions"))?;
        Ok(Role {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            permissions,
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }

    fn user_from_row(row: &SqliteRow) -> Result<ServiceAccountUser> {
        Ok(ServiceAccountUser {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            provider: row.get("provider"),
            confirmed: row.get("confirmed"),
            blocked: row.get("blocked"),
            role: row.get::<Option<i64>, _>("role_id"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
        })
    }

    async fn fetch_user(&self, id: i64) -> Result<ServiceAccountUser> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Self::user_from_row(&row)
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BridgeError::Store(sqlx::Error::Decode(Box::new(e))))
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>> {
        let row = sqlx::query("SELECT * FROM roles WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::role_from_row).transpose()
    }

    async fn create_role(&self, role: NewRole) -> Result<RoleId> {
        let permissions = serde_json::to_string(&role.permissions)?;
        let result = sqlx::query(
            r#"
            INSERT INTO roles (name, description, permissions, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&role.name)
        .bind(&role.description)
        .bind(permissions)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(role = %role.name, role_id = id, "Created role");
        Ok(id)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<ServiceAccountUser>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn find_users_by_email(&self, email: &str) -> Result<Vec<ServiceAccountUser>> {
        let rows = sqlx::query("SELECT * FROM users WHERE email = ?1 ORDER BY id")
            .bind(email)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::user_from_row).collect()
    }

    async fn create_user(&self, user: NewUser) -> Result<ServiceAccountUser> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, provider, confirmed, blocked, role_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.provider)
        .bind(user.confirmed)
        .bind(user.blocked)
        .bind(user.role)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.fetch_user(result.last_insert_rowid()).await
    }

    async fn find_admin_role(&self, name: &str) -> Result<Option<AdminRole>> {
        let row = sqlx::query("SELECT id, name FROM admin_roles WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| AdminRole {
            id: row.get("id"),
            name: row.get("name"),
        }))
    }

    async fn create_admin_user(&self, user: &NewUser, role: &AdminRole) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO admin_users (username, email, password_hash, admin_role_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(role.id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_resource_actions(&self) -> Result<Permissions> {
        let rows = sqlx::query("SELECT resource_key, action FROM resource_actions ORDER BY resource_key, action")
            .fetch_all(&self.pool)
            .await?;

        let mut permissions = Permissions::new();
        for row in rows {
            let key: String = row.get("resource_key");
            let action: String = row.get("action");
            let Some((namespace, controller)) = split_resource_key(&key) else {
                debug!(resource = %key, "Skipping malformed resource key");
                continue;
            };
            permissions
                .entry(namespace.to_string())
                .or_default()
                .controllers
                .entry(controller.to_string())
                .or_default()
                .insert(action, Default::default());
        }

        Ok(permissions)
    }

    async fn register_resource(&self, key: &str, actions: &[&str]) -> Result<()> {
        if split_resource_key(key).is_none() {
            return Err(BridgeError::UnknownResource(key.to_string()));
        }

        for action in actions {
            sqlx::query("INSERT OR IGNORE INTO resource_actions (resource_key, action) VALUES (?1, ?2)")
                .bind(key)
                .bind(*action)
                .execute(&self.pool)
                .await?;
        }

        debug!(resource = %key, "Registered resource");
        Ok(())
    }

    async fn count(&self, key: &str) -> Result<u64> {
        self.ensure_registered(key).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE resource_key = ?1")
            .bind(key)
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn delete(&self, key: &str, limit: u64) -> Result<u64> {
        self.ensure_registered(key).await?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let result = sqlx::query(
            r#"
            DELETE FROM records WHERE id IN (
                SELECT id FROM records WHERE resource_key = ?1 ORDER BY id LIMIT ?2
            )
            "#,
        )
        .bind(key)
        .bind(limit)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ResourceBootstrapper for SqliteContentStore {
    async fn bootstrap(&self, key: &str, payload: &Value) -> Result<usize> {
        self.ensure_registered(key).await?;

        let items: Vec<&Value> = match payload {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![payload],
            Value::Null => Vec::new(),
            other => {
                return Err(BridgeError::InvalidSeed(format!(
                    "payload for {key} must be an array or object, got {other}"
                )));
            }
        };

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM records WHERE resource_key = ?1")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        for item in &items {
            sqlx::query("INSERT INTO records (resource_key, payload, created_at) VALUES (?1, ?2, ?3)")
                .bind(key)
                .bind(serde_json::to_string(item)?)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(resource = %key, count = items.len(), "Bootstrapped resource");
        Ok(items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::setup_test_store;
    use serde_json::json;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: None,
            provider: "local".to_string(),
            confirmed: true,
            blocked: false,
            role: None,
        }
    }

    #[tokio::test]
    async fn test_schema_initialization() {
        let (store, _dir) = setup_test_store().await;

        let permissions = store.list_resource_actions().await.unwrap();
        assert!(permissions.contains_key("plugin::users-permissions"));
        assert!(store.find_admin_role(AUTHOR_ROLE_NAME).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("content.db");

        let store = SqliteContentStore::new(&path).await.unwrap();
        store.register_resource("api::region.region", DEFAULT_ACTIONS).await.unwrap();
        drop(store);

        let store = SqliteContentStore::new(&path).await.unwrap();
        let permissions = store.list_resource_actions().await.unwrap();
        assert_eq!(permissions["api::region"].controllers["region"].len(), DEFAULT_ACTIONS.len());
    }

    #[tokio::test]
    async fn test_role_roundtrip_through_store() {
        let (store, _dir) = setup_test_store().await;
        assert!(store.find_role_by_name("Medusa").await.unwrap().is_none());

        let mut permissions = Permissions::new();
        permissions.entry("api::product".to_string()).or_default();
        let id = store
            .create_role(NewRole {
                name: "Medusa".to_string(),
                description: "reusing medusa role".to_string(),
                permissions: permissions.clone(),
            })
            .await
            .unwrap();

        let role = store.find_role_by_name("Medusa").await.unwrap().unwrap();
        assert_eq!(role.id, id);
        assert_eq!(role.permissions, permissions);
    }

    #[tokio::test]
    async fn test_duplicate_role_name_error() {
        let (store, _dir) = setup_test_store().await;
        let role = NewRole {
            name: "Medusa".to_string(),
            description: String::new(),
            permissions: Permissions::new(),
        };
        store.create_role(role.clone()).await.unwrap();
        assert!(store.create_role(role).await.is_err());
    }

    #[tokio::test]
    async fn test_user_email_is_unique() {
        let (store, _dir) = setup_test_store().await;
        let created = store.create_user(new_user("medusa_user", "a@example.com")).await.unwrap();
        assert_eq!(created.username, "medusa_user");
        assert!(created.confirmed);

        let result = store.create_user(new_user("someone_else", "a@example.com")).await;
        assert!(matches!(result, Err(BridgeError::Store(_))));

        let found = store.find_users_by_email("a@example.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created.id);
        assert_eq!(store.find_user_by_username("medusa_user").await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_bootstrap_replaces_records() {
        let (store, _dir) = setup_test_store().await;
        store.register_resource("api::region.region", DEFAULT_ACTIONS).await.unwrap();

        let n = store
            .bootstrap("api::region.region", &json!([{ "id": "reg_1" }, { "id": "reg_2" }]))
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(store.count("api::region.region").await.unwrap(), 2);

        let n = store
            .bootstrap("api::region.region", &json!({ "id": "reg_3" }))
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(store.count("api::region.region").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bootstrap_unknown_resource() {
        let (store, _dir) = setup_test_store().await;
        let result = store.bootstrap("api::ghost.ghost", &json!([])).await;
        assert!(matches!(result, Err(BridgeError::UnknownResource(_))));
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_scalar_payload() {
        let (store, _dir) = setup_test_store().await;
        store.register_resource("api::store.store", DEFAULT_ACTIONS).await.unwrap();
        let result = store.bootstrap("api::store.store", &json!("nope")).await;
        assert!(matches!(result, Err(BridgeError::InvalidSeed(_))));
    }

    #[tokio::test]
    async fn test_delete_respects_limit() {
        let (store, _dir) = setup_test_store().await;
        store.register_resource("api::product.product", DEFAULT_ACTIONS).await.unwrap();
        store
            .bootstrap("api::product.product", &json!([{}, {}, {}]))
            .await
            .unwrap();

        assert_eq!(store.delete("api::product.product", 2).await.unwrap(), 2);
        assert_eq!(store.count("api::product.product").await.unwrap(), 1);
        assert_eq!(store.delete("api::product.product", 10).await.unwrap(), 1);
        assert_eq!(store.count("api::product.product").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_key() {
        let (store, _dir) = setup_test_store().await;
        assert!(store.register_resource("product", DEFAULT_ACTIONS).await.is_err());
    }
}
