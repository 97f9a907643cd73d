use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_AVATAR: &str = "/uploads/default-avatar.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

/// A single entry in a user's notification feed. Embedded in the owning
/// user document; only the owner ever mutates the sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub from_user: Uuid,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub post: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// User document. `password_hash` is opaque to everything except the
/// identity service and must never reach an API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub profile_pic: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub saved_posts: Vec<Uuid>,
    pub liked_posts: Vec<Uuid>,
    pub notifications: Vec<Notification>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            profile_pic: DEFAULT_AVATAR.to_string(),
            bio: String::new(),
            interests: Vec::new(),
            followers: Vec::new(),
            following: Vec::new(),
            saved_posts: Vec::new(),
            liked_posts: Vec::new(),
            notifications: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append an unread notification. Fan-out target is always the owner
    /// of this document.
    pub fn push_notification(&mut self, kind: NotificationKind, from_user: Uuid, post: Option<Uuid>) {
        self.notifications.push(Notification {
            kind,
            from_user,
            post,
            read: false,
            created_at: Utc::now(),
        });
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            profile_pic: self.profile_pic.clone(),
        }
    }

    pub fn session_view(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            profile_pic: self.profile_pic.clone(),
        }
    }

    /// Everything except the credential hash.
    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            profile_pic: self.profile_pic.clone(),
            bio: self.bio.clone(),
            interests: self.interests.clone(),
            followers: self.followers.clone(),
            following: self.following.clone(),
            saved_posts: self.saved_posts.clone(),
            liked_posts: self.liked_posts.clone(),
            created_at: self.created_at,
        }
    }
}

/// Denormalized author summary attached to posts and notifications at
/// read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub profile_pic: String,
}

/// The shape returned alongside a freshly issued token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_pic: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub profile_pic: String,
    pub bio: String,
    pub interests: Vec<String>,
    pub followers: Vec<Uuid>,
    pub following: Vec<Uuid>,
    pub saved_posts: Vec<Uuid>,
    pub liked_posts: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_view_drops_the_credential_hash() {
        let user = User::new("ada", "ada@example.com", "argon2-opaque");
        let value = serde_json::to_value(user.public_view()).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert_eq!(value["username"], "ada");
    }

    #[test]
    fn notifications_default_unread() {
        let mut user = User::new("ada", "ada@example.com", "h");
        user.push_notification(NotificationKind::Follow, Uuid::new_v4(), None);
        assert_eq!(user.notifications.len(), 1);
        assert!(!user.notifications[0].read);
    }
}
