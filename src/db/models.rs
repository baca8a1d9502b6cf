use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Opaque binding to a third-party identity; None for local accounts.
    pub external_identity_hash: Option<String>,
    /// Stored avatar file; None means "generate from the first letter".
    pub avatar_ref: Option<String>,
    pub member_since: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// Snapshot of the author's name at creation time, not a foreign key.
    pub author_username: String,
    pub timestamp: String,
    pub likes: i64,
}
