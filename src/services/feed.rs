//! Feed queries: filtering, sorting and pagination over the post
//! collection, with author summaries joined at read time.

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Post;
use crate::services::{encode, post_view, user_summaries};
use crate::store::EntityStore;

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSort {
    #[default]
    Recent,
    TopRated,
    MostCommented,
}

impl FeedSort {
    /// Unknown or absent sort keys fall back to `recent`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("top-rated") => FeedSort::TopRated,
            Some("most-commented") => FeedSort::MostCommented,
            _ => FeedSort::Recent,
        }
    }
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<EntityStore>,
}

impl FeedService {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// Filtered, sorted, paginated feed. Pages are 1-indexed; the result
    /// is a contiguous slice with no total-count guarantee.
    pub async fn list_posts(
        &self,
        filter: &FeedFilter,
        sort: FeedSort,
        page: usize,
        limit: usize,
    ) -> AppResult<Vec<Value>> {
        let search = build_search_matcher(filter.search.as_deref())?;

        let mut posts: Vec<Post> = self
            .store
            .all_posts()
            .await?
            .into_iter()
            .filter(|post| matches_filter(post, filter, search.as_ref()))
            .collect();

        sort_posts(&mut posts, sort);

        let start = page.max(1).saturating_sub(1).saturating_mul(limit);
        let page_posts: Vec<Post> = posts.into_iter().skip(start).take(limit).collect();

        let authors = user_summaries(&self.store, page_posts.iter().map(|p| p.author)).await?;
        page_posts
            .iter()
            .map(|post| post_view(post, authors.get(&post.author)))
            .collect()
    }

    /// Single post with author and comment authors populated.
    pub async fn get_post(&self, id: Uuid) -> AppResult<Value> {
        let post = self
            .store
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let ids = std::iter::once(post.author).chain(post.comments.iter().map(|c| c.author));
        let summaries = user_summaries(&self.store, ids).await?;

        let mut view = post_view(&post, summaries.get(&post.author))?;
        let mut comment_views = Vec::with_capacity(post.comments.len());
        for comment in &post.comments {
            let mut cv = encode(comment)?;
            cv["author"] = match summaries.get(&comment.author) {
                Some(summary) => encode(summary)?,
                None => Value::Null,
            };
            comment_views.push(cv);
        }
        view["comments"] = Value::Array(comment_views);

        Ok(view)
    }
}

fn build_search_matcher(search: Option<&str>) -> AppResult<Option<Regex>> {
    match search.filter(|s| !s.trim().is_empty()) {
        Some(raw) => RegexBuilder::new(&regex::escape(raw))
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|e| AppError::Internal(format!("bad search pattern: {}", e))),
        None => Ok(None),
    }
}

/// Category is a conjunct; tag and search hits are OR-ed together.
fn matches_filter(post: &Post, filter: &FeedFilter, search: Option<&Regex>) -> bool {
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        if !post.categories.iter().any(|c| c == category) {
            return false;
        }
    }

    let tag_hit = filter
        .tag
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|tag| {
            post.hashtags.iter().any(|h| h == tag) || post.brand_tags.iter().any(|b| b == tag)
        });

    let search_hit = search.map(|re| {
        re.is_match(&post.caption)
            || post.hashtags.iter().any(|h| re.is_match(h))
            || post.brand_tags.iter().any(|b| re.is_match(b))
    });

    match (tag_hit, search_hit) {
        (None, None) => true,
        (tag, search) => tag.unwrap_or(false) || search.unwrap_or(false),
    }
}

fn sort_posts(posts: &mut [Post], sort: FeedSort) {
    match sort {
        FeedSort::Recent => posts.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        FeedSort::TopRated => posts.sort_by(|a, b| {
            b.avg_rating
                .total_cmp(&a.avg_rating)
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
        FeedSort::MostCommented => posts.sort_by(|a, b| {
            b.comments
                .len()
                .cmp(&a.comments.len())
                .then_with(|| b.created_at.cmp(&a.created_at))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::PostMeta;
    use chrono::{Duration, Utc};

    fn post(caption: &str, hashtags: &[&str], categories: &[&str]) -> Post {
        Post::new(
            Uuid::new_v4(),
            "/uploads/x.jpg",
            PostMeta {
                caption: caption.to_string(),
                hashtags: hashtags.iter().map(|s| s.to_string()).collect(),
                categories: categories.iter().map(|s| s.to_string()).collect(),
                brand_tags: vec!["Acme".to_string()],
                colors: vec![],
            },
        )
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filter = FeedFilter {
            search: Some("STREET".to_string()),
            ..Default::default()
        };
        let re = build_search_matcher(filter.search.as_deref()).unwrap();
        let hit = post("streetwear look", &[], &[]);
        let miss = post("formal dinner", &["office"], &[]);
        assert!(matches_filter(&hit, &filter, re.as_ref()));
        assert!(!matches_filter(&miss, &filter, re.as_ref()));
    }

    #[test]
    fn tag_and_search_hits_are_ored() {
        let filter = FeedFilter {
            search: Some("nomatch".to_string()),
            tag: Some("vintage".to_string()),
            ..Default::default()
        };
        let re = build_search_matcher(filter.search.as_deref()).unwrap();
        let tagged = post("plain caption", &["vintage"], &[]);
        assert!(matches_filter(&tagged, &filter, re.as_ref()));
    }

    #[test]
    fn category_is_a_conjunct() {
        let filter = FeedFilter {
            category: Some("summer".to_string()),
            tag: Some("vintage".to_string()),
            ..Default::default()
        };
        let tagged_wrong_category = post("caption", &["vintage"], &["winter"]);
        assert!(!matches_filter(&tagged_wrong_category, &filter, None));
    }

    #[test]
    fn top_rated_breaks_ties_by_recency() {
        let mut older = post("a", &[], &[]);
        older.avg_rating = 4.0;
        older.created_at = Utc::now() - Duration::hours(2);
        let mut newer = post("b", &[], &[]);
        newer.avg_rating = 4.0;
        let mut best = post("c", &[], &[]);
        best.avg_rating = 4.5;
        best.created_at = Utc::now() - Duration::hours(5);

        let mut posts = vec![older.clone(), newer.clone(), best.clone()];
        sort_posts(&mut posts, FeedSort::TopRated);

        assert_eq!(posts[0].id, best.id);
        assert_eq!(posts[1].id, newer.id);
        assert_eq!(posts[2].id, older.id);
    }

    #[test]
    fn most_commented_sorts_by_comment_count() {
        let mut chatty = post("a", &[], &[]);
        for _ in 0..3 {
            chatty.comments.push(crate::models::Comment {
                author: Uuid::new_v4(),
                text: "nice".to_string(),
                created_at: Utc::now(),
            });
        }
        let quiet = post("b", &[], &[]);

        let mut posts = vec![quiet.clone(), chatty.clone()];
        sort_posts(&mut posts, FeedSort::MostCommented);
        assert_eq!(posts[0].id, chatty.id);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_recent() {
        assert_eq!(FeedSort::parse(Some("weird")), FeedSort::Recent);
        assert_eq!(FeedSort::parse(None), FeedSort::Recent);
        assert_eq!(FeedSort::parse(Some("top-rated")), FeedSort::TopRated);
    }
}
