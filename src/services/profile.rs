//! Profile aggregation: user records with authored posts attached,
//! saved/liked resolution, notification views, and profile updates.

use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::services::{encode, post_view, user_summaries};
use crate::store::EntityStore;

#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub interests: Option<Vec<String>>,
    pub profile_pic: Option<String>,
}

#[derive(Clone)]
pub struct ProfileService {
    store: Arc<EntityStore>,
}

impl ProfileService {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    async fn load_user(&self, id: Uuid) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// User record (credential hash excluded) with authored posts
    /// attached, newest first.
    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<Value> {
        let user = self.load_user(user_id).await?;
        let posts = self.store.posts_by_author(user_id).await?;

        let mut view = encode(&user.public_view())?;
        view["posts"] = encode(&posts)?;
        Ok(view)
    }

    pub async fn saved_posts(&self, user_id: Uuid) -> AppResult<Vec<Value>> {
        let user = self.load_user(user_id).await?;
        self.resolve_refs(&user.saved_posts).await
    }

    pub async fn liked_posts(&self, user_id: Uuid) -> AppResult<Vec<Value>> {
        let user = self.load_user(user_id).await?;
        self.resolve_refs(&user.liked_posts).await
    }

    /// Notification feed with the originating user summarized, newest
    /// last (stored order).
    pub async fn notifications(&self, user_id: Uuid) -> AppResult<Vec<Value>> {
        let user = self.load_user(user_id).await?;
        let summaries =
            user_summaries(&self.store, user.notifications.iter().map(|n| n.from_user)).await?;

        let mut views = Vec::with_capacity(user.notifications.len());
        for notification in &user.notifications {
            let mut view = encode(notification)?;
            view["fromUser"] = match summaries.get(&notification.from_user) {
                Some(summary) => encode(summary)?,
                None => Value::Null,
            };
            views.push(view);
        }
        Ok(views)
    }

    /// Apply the allowed profile mutations. Username changes keep the
    /// uniqueness guarantee.
    pub async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> AppResult<Value> {
        let mut user = self.load_user(user_id).await?;

        if let Some(username) = update.username.filter(|u| !u.trim().is_empty()) {
            if username != user.username {
                if let Some(existing) = self.store.find_user_by_username(&username).await? {
                    if existing.id != user_id {
                        return Err(AppError::Conflict("Username already taken".to_string()));
                    }
                }
                user.username = username;
            }
        }
        if let Some(bio) = update.bio {
            user.bio = bio;
        }
        if let Some(interests) = update.interests {
            user.interests = interests;
        }
        if let Some(profile_pic) = update.profile_pic {
            user.profile_pic = profile_pic;
        }

        self.store.put_user(&user).await?;
        encode(&user.public_view())
    }

    async fn resolve_refs(&self, ids: &[Uuid]) -> AppResult<Vec<Value>> {
        let posts = self.store.posts_by_ids(ids).await?;
        let authors = user_summaries(&self.store, posts.iter().map(|p| p.author)).await?;
        posts
            .iter()
            .map(|post| post_view(post, authors.get(&post.author)))
            .collect()
    }
}
