// Store traits - isolate all database side effects from routes and auth
pub mod sqlite;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::db::models::{Post, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

/// User records and their uniqueness rules.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup; absence is not an error.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    /// Lookup by the hash bound to a third-party identity.
    async fn find_by_identity_hash(&self, hash: &str) -> Result<Option<User>, StoreError>;

    /// Insert a new user. The id and member_since are assigned with the
    /// insert itself. Duplicate username or identity hash yields Conflict.
    async fn create(
        &self,
        username: &str,
        external_identity_hash: Option<&str>,
    ) -> Result<User, StoreError>;
}

/// Posts: creation, listing, likes, owner-only deletion.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts, newest first; ties broken by highest id.
    async fn list_recent(&self) -> Result<Vec<Post>, StoreError>;

    /// Same ordering, restricted to one author.
    async fn list_by_author(&self, username: &str) -> Result<Vec<Post>, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, StoreError>;

    /// Insert a new post with zero likes. Id and timestamp are assigned
    /// with the insert itself.
    async fn create(
        &self,
        title: &str,
        content: &str,
        author_username: &str,
    ) -> Result<Post, StoreError>;

    /// Atomic in-place increment; NotFound if no such post.
    async fn increment_likes(&self, post_id: i64) -> Result<(), StoreError>;

    /// Delete only when the post exists and belongs to owner_username.
    /// Returns whether a row was deleted; a foreign owner is not an error.
    async fn delete_owned(&self, post_id: i64, owner_username: &str) -> Result<bool, StoreError>;
}

/// Type aliases for Arc-wrapped stores (for AppState)
pub type DynUserStore = Arc<dyn UserStore>;
pub type DynPostStore = Arc<dyn PostStore>;
