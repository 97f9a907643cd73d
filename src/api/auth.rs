//! Registration and login. Both return a bearer token plus a session
//! summary of the user.

use axum::{extract::State, routing::post, Json, Router};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::User;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<Value>> {
    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    if username.is_empty() {
        return Err(AppError::InvalidOperation("Username is required".to_string()));
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::InvalidOperation("Valid email required".to_string()));
    }
    if req.password.chars().count() < 6 {
        return Err(AppError::InvalidOperation(
            "Password must be 6+ characters".to_string(),
        ));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }
    if state.store.find_user_by_username(&username).await?.is_some() {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = state.identity.hash_password(&req.password)?;
    let user = User::new(username, email, password_hash);
    state.store.create_user(&user).await?;

    let token = state.identity.issue_token(user.id)?;
    info!(user = %user.id, username = %user.username, "registered user");

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": user.session_view()
    })))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<Value>> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidOperation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .store
        .find_user_by_email(email)
        .await?
        .ok_or_else(|| AppError::InvalidOperation("Invalid credentials".to_string()))?;

    if !state.identity.verify_password(&req.password, &user.password_hash) {
        return Err(AppError::InvalidOperation("Invalid credentials".to_string()));
    }

    let token = state.identity.issue_token(user.id)?;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": user.session_view()
    })))
}
