use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Post, User};

mod cache;
use cache::Cache;

/// Document store for the two collections. Each document is a JSON blob
/// keyed by id; identity fields that need uniqueness or lookup (username,
/// email, post author) are mirrored into indexed columns.
pub struct EntityStore {
    pool: SqlitePool,
    user_cache: Arc<Mutex<Cache<Uuid, User>>>,
    post_cache: Arc<Mutex<Cache<Uuid, Post>>>,
}

impl EntityStore {
    pub async fn connect(database_url: &str, cache_capacity: usize) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url: {}", database_url))?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        Ok(EntityStore {
            pool,
            user_cache: Arc::new(Mutex::new(Cache::new(cache_capacity))),
            post_cache: Arc::new(Mutex::new(Cache::new(cache_capacity))),
        })
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                data BLOB NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                author_id TEXT NOT NULL,
                data BLOB NOT NULL,
                created INTEGER NOT NULL,
                updated INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ---- users ----

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let data = serde_json::to_vec(user)?;
        let now = user.created_at.timestamp();

        sqlx::query(
            "INSERT INTO users (id, username, email, data, created, updated) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.email)
        .bind(data)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.user_cache.lock().await.insert(user.id, user.clone());
        Ok(())
    }

    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        {
            let mut cache = self.user_cache.lock().await;
            if let Some(user) = cache.get(&id).cloned() {
                return Ok(Some(user));
            }
        }

        let row = sqlx::query("SELECT data FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let user = decode_user(&row)?;
                self.user_cache.lock().await.insert(id, user.clone());
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT data FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_user).transpose()
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query("SELECT data FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_user).transpose()
    }

    /// Write back a mutated user document and refresh the cache.
    pub async fn put_user(&self, user: &User) -> Result<()> {
        let data = serde_json::to_vec(user)?;
        let result = sqlx::query(
            "UPDATE users SET username = ?, email = ?, data = ?, updated = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(data)
        .bind(Utc::now().timestamp())
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("user {} does not exist", user.id);
        }

        self.user_cache.lock().await.insert(user.id, user.clone());
        Ok(())
    }

    // ---- posts ----

    pub async fn create_post(&self, post: &Post) -> Result<()> {
        let data = serde_json::to_vec(post)?;
        let now = post.created_at.timestamp();

        sqlx::query(
            "INSERT INTO posts (id, author_id, data, created, updated) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(post.id.to_string())
        .bind(post.author.to_string())
        .bind(data)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.post_cache.lock().await.insert(post.id, post.clone());
        Ok(())
    }

    pub async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        {
            let mut cache = self.post_cache.lock().await;
            if let Some(post) = cache.get(&id).cloned() {
                return Ok(Some(post));
            }
        }

        let row = sqlx::query("SELECT data FROM posts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let post = decode_post(&row)?;
                self.post_cache.lock().await.insert(id, post.clone());
                Ok(Some(post))
            }
            None => Ok(None),
        }
    }

    pub async fn put_post(&self, post: &Post) -> Result<()> {
        let data = serde_json::to_vec(post)?;
        let result = sqlx::query("UPDATE posts SET data = ?, updated = ? WHERE id = ?")
            .bind(data)
            .bind(Utc::now().timestamp())
            .bind(post.id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("post {} does not exist", post.id);
        }

        self.post_cache.lock().await.insert(post.id, post.clone());
        Ok(())
    }

    /// All posts, newest first. The feed service filters and re-sorts on
    /// top of this.
    pub async fn all_posts(&self) -> Result<Vec<Post>> {
        let rows = sqlx::query("SELECT data FROM posts ORDER BY created DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_post).collect()
    }

    pub async fn posts_by_author(&self, author: Uuid) -> Result<Vec<Post>> {
        let rows = sqlx::query("SELECT data FROM posts WHERE author_id = ? ORDER BY created DESC")
            .bind(author.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_post).collect()
    }

    /// Resolve a reference list in its stored order. Dangling references
    /// (a saved id that never existed) are skipped, not errors.
    pub async fn posts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Post>> {
        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = self.get_post(*id).await? {
                posts.push(post);
            }
        }
        Ok(posts)
    }
}

fn decode_user(row: &SqliteRow) -> Result<User> {
    let data: Vec<u8> = row.get("data");
    serde_json::from_slice(&data).context("corrupt user document")
}

fn decode_post(row: &SqliteRow) -> Result<Post> {
    let data: Vec<u8> = row.get("data");
    serde_json::from_slice(&data).context("corrupt post document")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::PostMeta;

    async fn open_store() -> (tempfile::TempDir, EntityStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("store.db").display());
        let store = EntityStore::connect(&url, 16).await.unwrap();
        store.init().await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn user_round_trip() {
        let (_dir, store) = open_store().await;
        let user = User::new("ada", "ada@example.com", "hash");
        store.create_user(&user).await.unwrap();

        let loaded = store.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.username, "ada");

        let by_email = store.find_user_by_email("ada@example.com").await.unwrap();
        assert_eq!(by_email.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let (_dir, store) = open_store().await;
        store
            .create_user(&User::new("ada", "ada@example.com", "h"))
            .await
            .unwrap();
        let clash = User::new("ada", "other@example.com", "h");
        assert!(store.create_user(&clash).await.is_err());
    }

    #[tokio::test]
    async fn dangling_post_refs_are_skipped() {
        let (_dir, store) = open_store().await;
        let author = User::new("ada", "ada@example.com", "h");
        store.create_user(&author).await.unwrap();
        let post = Post::new(
            author.id,
            "/uploads/a.jpg",
            PostMeta {
                caption: "fit".into(),
                hashtags: vec![],
                categories: vec![],
                brand_tags: vec![],
                colors: vec![],
            },
        );
        store.create_post(&post).await.unwrap();

        let resolved = store
            .posts_by_ids(&[post.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, post.id);
    }
}
