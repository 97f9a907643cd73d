//! Post endpoints: feed, single post, creation, and the social actions
//! that operate on a post.

use axum::extract::multipart::Field;
use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::parse_id;
use crate::app_state::AppState;
use crate::auth::Viewer;
use crate::error::{AppError, AppResult};
use crate::models::post::PostMeta;
use crate::models::Post;
use crate::services::feed::DEFAULT_PAGE_SIZE;
use crate::services::{FeedFilter, FeedSort};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post))
        .route("/{id}/like", post(toggle_like))
        .route("/{id}/save", post(toggle_save))
        .route("/{id}/comment", post(add_comment))
        .route("/{id}/rate", post(rate_post))
}

#[derive(Deserialize)]
struct FeedParams {
    search: Option<String>,
    category: Option<String>,
    tag: Option<String>,
    sort: Option<String>,
    page: Option<usize>,
    limit: Option<usize>,
}

async fn list_posts(
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> AppResult<Json<Value>> {
    let filter = FeedFilter {
        search: params.search,
        category: params.category,
        tag: params.tag,
    };
    let sort = FeedSort::parse(params.sort.as_deref());
    let posts = state
        .feed
        .list_posts(
            &filter,
            sort,
            params.page.unwrap_or(1),
            params.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        )
        .await?;

    Ok(Json(json!({ "success": true, "posts": posts })))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let post = state.feed.get_post(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "post": post })))
}

async fn create_post(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut image: Option<(Option<String>, Vec<u8>)> = None;
    let mut meta = PostMeta {
        caption: String::new(),
        hashtags: Vec::new(),
        categories: Vec::new(),
        brand_tags: Vec::new(),
        colors: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidOperation(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidOperation(format!("Malformed upload: {}", e)))?;
                image = Some((file_name, bytes.to_vec()));
            }
            "caption" => meta.caption = read_text(field).await?,
            "hashtags" => meta.hashtags = split_tags(&read_text(field).await?),
            "categories" => meta.categories = split_tags(&read_text(field).await?),
            "brandTags" => meta.brand_tags = split_tags(&read_text(field).await?),
            "colors" => meta.colors = split_tags(&read_text(field).await?),
            _ => {}
        }
    }

    let (file_name, bytes) = image
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| AppError::InvalidOperation("Image required".to_string()))?;

    let author = state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let image_path = state.blobs.put(file_name.as_deref(), &bytes).await?;
    let post = Post::new(user_id, image_path, meta);
    state.store.create_post(&post).await?;

    info!(author = %author.id, post = %post.id, "created post");

    Ok(Json(json!({ "success": true, "post": post })))
}

async fn toggle_like(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let outcome = state.graph.toggle_like(user_id, parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "liked": outcome.liked,
        "likes": outcome.like_count
    })))
}

async fn toggle_save(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let outcome = state.graph.toggle_save(user_id, parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "saved": outcome.saved,
        "savedCount": outcome.saved_count
    })))
}

#[derive(Deserialize)]
struct CommentRequest {
    #[serde(default)]
    text: String,
}

async fn add_comment(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
    Json(req): Json<CommentRequest>,
) -> AppResult<Json<Value>> {
    let comments = state
        .graph
        .add_comment(user_id, parse_id(&id)?, req.text)
        .await?;
    Ok(Json(json!({ "success": true, "comments": comments })))
}

#[derive(Deserialize)]
struct RateRequest {
    #[serde(default)]
    score: i32,
}

async fn rate_post(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
    Json(req): Json<RateRequest>,
) -> AppResult<Json<Value>> {
    let avg_rating = state
        .graph
        .rate_post(user_id, parse_id(&id)?, req.score)
        .await?;
    Ok(Json(json!({ "success": true, "avgRating": avg_rating })))
}

async fn read_text(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidOperation(format!("Malformed upload: {}", e)))
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
