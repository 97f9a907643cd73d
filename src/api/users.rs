//! User endpoints: profiles, follow graph, notifications, and the
//! viewer's resolved saved/liked lists.

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::parse_id;
use crate::app_state::AppState;
use crate::auth::Viewer;
use crate::error::{AppError, AppResult};
use crate::services::ProfileUpdate;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me/saved", get(my_saved))
        .route("/me/liked", get(my_liked))
        .route("/{id}", get(get_profile).put(update_profile))
        .route("/{id}/follow", post(toggle_follow))
        .route("/{id}/liked", get(liked_posts))
        .route("/{id}/notifications", get(notifications))
        .route("/{id}/notifications/read", put(mark_notifications_read))
}

async fn my_saved(State(state): State<AppState>, Viewer(user_id): Viewer) -> AppResult<Json<Value>> {
    let saved = state.profiles.saved_posts(user_id).await?;
    Ok(Json(json!({ "success": true, "saved": saved })))
}

async fn my_liked(State(state): State<AppState>, Viewer(user_id): Viewer) -> AppResult<Json<Value>> {
    let liked = state.profiles.liked_posts(user_id).await?;
    Ok(Json(json!({ "success": true, "liked": liked })))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let user = state.profiles.get_profile(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn toggle_follow(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let outcome = state.graph.toggle_follow(user_id, parse_id(&id)?).await?;
    Ok(Json(json!({
        "success": true,
        "following": outcome.following,
        "followersCount": outcome.follower_count
    })))
}

/// Any user's liked posts; requires a logged-in caller but not self.
async fn liked_posts(
    State(state): State<AppState>,
    Viewer(_viewer): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let liked = state.profiles.liked_posts(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "liked": liked })))
}

async fn notifications(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    require_self(user_id, id)?;
    let notifications = state.profiles.notifications(id).await?;
    Ok(Json(json!({ "success": true, "notifications": notifications })))
}

async fn mark_notifications_read(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    require_self(user_id, id)?;
    let updated = state.graph.mark_notifications_read(id).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

async fn update_profile(
    State(state): State<AppState>,
    Viewer(user_id): Viewer,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let id = parse_id(&id)?;
    require_self(user_id, id)?;

    let mut update = ProfileUpdate::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidOperation(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => update.username = Some(read_text(field).await?),
            "bio" => update.bio = Some(read_text(field).await?),
            "interests" => {
                update.interests = Some(
                    read_text(field)
                        .await?
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                )
            }
            "profilePic" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidOperation(format!("Malformed upload: {}", e)))?;
                if !bytes.is_empty() {
                    update.profile_pic =
                        Some(state.blobs.put(file_name.as_deref(), &bytes).await?);
                }
            }
            _ => {}
        }
    }

    let user = state.profiles.update_profile(id, update).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::InvalidOperation(format!("Malformed upload: {}", e)))
}

fn require_self(viewer: Uuid, subject: Uuid) -> AppResult<()> {
    if viewer != subject {
        return Err(AppError::Forbidden("Forbidden".to_string()));
    }
    Ok(())
}
