use async_trait::async_trait;
use rusqlite::params;

use crate::db::models::{Post, User};
use crate::state::DbPool;
use crate::store::{PostStore, StoreError, UserStore};

/// SQLite implementation backed by the shared r2d2 pool.
pub struct SqliteUserStore {
    pool: DbPool,
}

impl SqliteUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub struct SqlitePostStore {
    pool: DbPool,
}

impl SqlitePostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-constraint failure on insert to Conflict; everything else
/// stays a database error.
fn map_constraint(e: rusqlite::Error, what: &str) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Sql(e),
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        external_identity_hash: row.get(2)?,
        avatar_ref: row.get(3)?,
        member_since: row.get(4)?,
    })
}

fn post_from_row(row: &rusqlite::Row<'_>) -> Result<Post, rusqlite::Error> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_username: row.get(3)?,
        timestamp: row.get(4)?,
        likes: row.get(5)?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, username, external_identity_hash, avatar_ref, member_since
             FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, username, external_identity_hash, avatar_ref, member_since
             FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_identity_hash(&self, hash: &str) -> Result<Option<User>, StoreError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, username, external_identity_hash, avatar_ref, member_since
             FROM users WHERE external_identity_hash = ?1",
            params![hash],
            user_from_row,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(
        &self,
        username: &str,
        external_identity_hash: Option<&str>,
    ) -> Result<User, StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (username, external_identity_hash) VALUES (?1, ?2)",
            params![username, external_identity_hash],
        )
        .map_err(|e| map_constraint(e, "username or identity already registered"))?;

        let id = conn.last_insert_rowid();
        let user = conn.query_row(
            "SELECT id, username, external_identity_hash, avatar_ref, member_since
             FROM users WHERE id = ?1",
            params![id],
            user_from_row,
        )?;

        Ok(user)
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn list_recent(&self) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, content, author_username, timestamp, likes
             FROM posts ORDER BY timestamp DESC, id DESC",
        )?;
        let posts = stmt
            .query_map([], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    async fn list_by_author(&self, username: &str) -> Result<Vec<Post>, StoreError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, title, content, author_username, timestamp, likes
             FROM posts WHERE author_username = ?1 ORDER BY timestamp DESC, id DESC",
        )?;
        let posts = stmt
            .query_map(params![username], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, title, content, author_username, timestamp, likes
             FROM posts WHERE id = ?1",
            params![id],
            post_from_row,
        );

        match result {
            Ok(post) => Ok(Some(post)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(
        &self,
        title: &str,
        content: &str,
        author_username: &str,
    ) -> Result<Post, StoreError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO posts (title, content, author_username) VALUES (?1, ?2, ?3)",
            params![title, content, author_username],
        )?;

        let id = conn.last_insert_rowid();
        let post = conn.query_row(
            "SELECT id, title, content, author_username, timestamp, likes
             FROM posts WHERE id = ?1",
            params![id],
            post_from_row,
        )?;

        Ok(post)
    }

    async fn increment_likes(&self, post_id: i64) -> Result<(), StoreError> {
        let conn = self.pool.get()?;

        // Single in-place UPDATE so concurrent likes never lose an update.
        let rows = conn.execute(
            "UPDATE posts SET likes = likes + 1 WHERE id = ?1",
            params![post_id],
        )?;

        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_owned(&self, post_id: i64, owner_username: &str) -> Result<bool, StoreError> {
        let conn = self.pool.get()?;

        // Ownership check lives in the predicate: a foreign post is
        // indistinguishable from a missing one.
        let rows = conn.execute(
            "DELETE FROM posts WHERE id = ?1 AND author_username = ?2",
            params![post_id, owner_username],
        )?;

        Ok(rows > 0)
    }
}
