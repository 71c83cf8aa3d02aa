// SPDX-License-Identifier: GPL-3.0-only
pub mod models;
pub mod traits;
pub mod sqlite;

pub use models::{
    NewRole, NewUser, Permissions, RoleId, ServiceAccountUser, ServiceUserParams, UserId,
};
pub use traits::{ContentStore, ResourceBootstrapper};
pub use sqlite::SqliteContentStore;
