//! Social graph engine: every operation that mutates relationships or
//! derived aggregates across the user and post collections.
//!
//! Follow and like relationships are denormalized onto both documents, so
//! each operation here writes both sides itself. Writes to distinct
//! entities are still two independent store calls (no cross-document
//! transaction); a per-process gate serializes mutations so that two
//! racing toggles on the same pair cannot interleave.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Comment, NotificationKind, User};
use crate::store::EntityStore;

#[derive(Debug, Clone, Copy)]
pub struct FollowOutcome {
    pub following: bool,
    pub follower_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SaveOutcome {
    pub saved: bool,
    pub saved_count: usize,
}

#[derive(Clone)]
pub struct SocialGraph {
    store: Arc<EntityStore>,
    write_gate: Arc<Mutex<()>>,
}

impl SocialGraph {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self {
            store,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    async fn load_user(&self, id: Uuid) -> AppResult<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Toggle the follow edge between actor and target, keeping
    /// `actor.following` and `target.followers` in step. Following appends
    /// a notification to the target; unfollowing does not.
    pub async fn toggle_follow(&self, actor_id: Uuid, target_id: Uuid) -> AppResult<FollowOutcome> {
        if actor_id == target_id {
            return Err(AppError::InvalidOperation(
                "Can't follow yourself".to_string(),
            ));
        }

        let _gate = self.write_gate.lock().await;

        let mut actor = self.load_user(actor_id).await?;
        let mut target = self.load_user(target_id).await?;

        let already = actor.following.contains(&target_id);
        if already {
            actor.following.retain(|id| *id != target_id);
            target.followers.retain(|id| *id != actor_id);
        } else {
            actor.following.push(target_id);
            if !target.followers.contains(&actor_id) {
                target.followers.push(actor_id);
            }
            target.push_notification(NotificationKind::Follow, actor_id, None);
        }

        // Two independent writes, actor side first. If the second fails
        // the graph is left asymmetric; there is no compensating write.
        self.store.put_user(&actor).await?;
        self.store.put_user(&target).await?;

        info!(
            actor = %actor_id,
            target = %target_id,
            following = !already,
            "toggled follow"
        );

        Ok(FollowOutcome {
            following: !already,
            follower_count: target.followers.len(),
        })
    }

    /// Toggle actor's like on a post, keeping `post.likes` and
    /// `actor.liked_posts` in step. Liking notifies the post author, even
    /// when the author is the actor.
    pub async fn toggle_like(&self, actor_id: Uuid, post_id: Uuid) -> AppResult<LikeOutcome> {
        let _gate = self.write_gate.lock().await;

        let mut post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        let mut actor = self.load_user(actor_id).await?;

        let already = post.has_liked(actor_id);
        if already {
            post.likes.retain(|id| *id != actor_id);
            actor.liked_posts.retain(|id| *id != post_id);
        } else {
            post.likes.push(actor_id);
            if !actor.liked_posts.contains(&post_id) {
                actor.liked_posts.push(post_id);
            }
            if post.author == actor_id {
                // Author and actor are the same document; notify in place
                // rather than clobbering it with a second stale copy.
                actor.push_notification(NotificationKind::Like, actor_id, Some(post_id));
            } else if let Some(mut author) = self.store.get_user(post.author).await? {
                author.push_notification(NotificationKind::Like, actor_id, Some(post_id));
                self.store.put_user(&author).await?;
            }
        }

        self.store.put_post(&post).await?;
        self.store.put_user(&actor).await?;

        info!(actor = %actor_id, post = %post_id, liked = !already, "toggled like");

        Ok(LikeOutcome {
            liked: !already,
            like_count: post.likes.len(),
        })
    }

    /// Toggle membership of the post in the actor's saved list. The post
    /// id is not checked for existence: saving an unknown id is accepted
    /// and simply resolves to nothing at read time.
    pub async fn toggle_save(&self, actor_id: Uuid, post_id: Uuid) -> AppResult<SaveOutcome> {
        let _gate = self.write_gate.lock().await;

        let mut actor = self.load_user(actor_id).await?;

        let already = actor.saved_posts.contains(&post_id);
        if already {
            actor.saved_posts.retain(|id| *id != post_id);
        } else {
            actor.saved_posts.push(post_id);
        }

        self.store.put_user(&actor).await?;

        Ok(SaveOutcome {
            saved: !already,
            saved_count: actor.saved_posts.len(),
        })
    }

    /// Append a comment to the post and notify its author. Empty text is
    /// accepted. Returns the full comment sequence.
    pub async fn add_comment(
        &self,
        actor_id: Uuid,
        post_id: Uuid,
        text: String,
    ) -> AppResult<Vec<Comment>> {
        let _gate = self.write_gate.lock().await;

        let mut post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        // The actor must exist even though their document is not mutated.
        self.load_user(actor_id).await?;

        post.comments.push(Comment {
            author: actor_id,
            text,
            created_at: chrono::Utc::now(),
        });

        if let Some(mut author) = self.store.get_user(post.author).await? {
            author.push_notification(NotificationKind::Comment, actor_id, Some(post_id));
            self.store.put_user(&author).await?;
        }

        self.store.put_post(&post).await?;

        info!(actor = %actor_id, post = %post_id, "added comment");

        Ok(post.comments)
    }

    /// Upsert the actor's score on the post and return the recomputed
    /// average. Scores outside 1..=5 are rejected before any read.
    pub async fn rate_post(&self, actor_id: Uuid, post_id: Uuid, score: i32) -> AppResult<f64> {
        if !(1..=5).contains(&score) {
            return Err(AppError::InvalidOperation(
                "Score must be between 1 and 5".to_string(),
            ));
        }

        let _gate = self.write_gate.lock().await;

        let mut post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        post.apply_rating(actor_id, score);
        self.store.put_post(&post).await?;

        Ok(post.avg_rating)
    }

    /// Mark every notification on the user's feed as read. Returns how
    /// many were newly flipped.
    pub async fn mark_notifications_read(&self, user_id: Uuid) -> AppResult<usize> {
        let _gate = self.write_gate.lock().await;

        let mut user = self.load_user(user_id).await?;
        let mut flipped = 0;
        for notification in &mut user.notifications {
            if !notification.read {
                notification.read = true;
                flipped += 1;
            }
        }

        if flipped > 0 {
            self.store.put_user(&user).await?;
        }

        Ok(flipped)
    }
}
