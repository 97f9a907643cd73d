use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Append-only comment record embedded in the post document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub author: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// One score per user; re-rating overwrites the existing entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user: Uuid,
    pub score: i32,
}

/// Post document. Author and image path are fixed at creation; the
/// remaining fields are mutated only through the social graph engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author: Uuid,
    pub image_path: String,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub categories: Vec<String>,
    pub brand_tags: Vec<String>,
    pub colors: Vec<String>,
    pub likes: Vec<Uuid>,
    pub ratings: Vec<Rating>,
    pub avg_rating: f64,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct PostMeta {
    pub caption: String,
    pub hashtags: Vec<String>,
    pub categories: Vec<String>,
    pub brand_tags: Vec<String>,
    pub colors: Vec<String>,
}

impl Post {
    pub fn new(author: Uuid, image_path: impl Into<String>, meta: PostMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            author,
            image_path: image_path.into(),
            caption: meta.caption,
            hashtags: meta.hashtags,
            categories: meta.categories,
            brand_tags: meta.brand_tags,
            colors: meta.colors,
            likes: Vec::new(),
            ratings: Vec::new(),
            avg_rating: 0.0,
            comments: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    pub fn has_liked(&self, user: Uuid) -> bool {
        self.likes.contains(&user)
    }

    /// Upsert the user's score and recompute the cached average.
    pub fn apply_rating(&mut self, user: Uuid, score: i32) {
        match self.ratings.iter_mut().find(|r| r.user == user) {
            Some(existing) => existing.score = score,
            None => self.ratings.push(Rating { user, score }),
        }
        self.recompute_avg_rating();
    }

    /// `avg_rating` is derived, never edited directly. Dividing by at
    /// least 1 keeps the empty collection at 0.
    pub fn recompute_avg_rating(&mut self) {
        let sum: i32 = self.ratings.iter().map(|r| r.score).sum();
        self.avg_rating = f64::from(sum) / self.ratings.len().max(1) as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_upsert_keeps_one_entry_per_user() {
        let mut post = Post::new(
            Uuid::new_v4(),
            "/uploads/fit.jpg",
            PostMeta {
                caption: String::new(),
                hashtags: vec![],
                categories: vec![],
                brand_tags: vec![],
                colors: vec![],
            },
        );
        let rater = Uuid::new_v4();
        post.apply_rating(rater, 4);
        post.apply_rating(rater, 5);
        assert_eq!(post.ratings.len(), 1);
        assert_eq!(post.ratings[0].score, 5);
        assert_eq!(post.avg_rating, 5.0);
    }

    #[test]
    fn average_is_zero_with_no_ratings() {
        let mut post = Post::new(
            Uuid::new_v4(),
            "/uploads/fit.jpg",
            PostMeta {
                caption: String::new(),
                hashtags: vec![],
                categories: vec![],
                brand_tags: vec![],
                colors: vec![],
            },
        );
        post.recompute_avg_rating();
        assert_eq!(post.avg_rating, 0.0);
    }
}
