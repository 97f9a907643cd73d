//! Request-scoped viewer context. Middleware resolves the bearer token
//! once and injects the result into request extensions; handlers declare
//! their auth requirement through the `Viewer` extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ViewerContext {
    pub user_id: Option<Uuid>,
}

impl ViewerContext {
    pub fn authenticated(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Resolve the Authorization header into a viewer for every request.
/// A present-but-invalid token is a hard 401; an absent one yields an
/// anonymous viewer and the endpoint decides whether that is enough.
pub async fn viewer_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let viewer = match bearer_token(request.headers()) {
        Some(token) => ViewerContext::authenticated(state.identity.verify_token(token)?),
        None => ViewerContext::anonymous(),
    };

    request.extensions_mut().insert(Arc::new(viewer));
    Ok(next.run(request).await)
}

/// Accepts `Bearer <token>` or the raw token.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for endpoints that require an authenticated caller.
pub struct Viewer(pub Uuid);

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = viewer_from_parts(parts).and_then(|vc| {
            vc.user_id
                .map(Viewer)
                .ok_or_else(|| AppError::Unauthenticated("Authentication required".to_string()))
        });

        async move { result }
    }
}

fn viewer_from_parts(parts: &Parts) -> AppResult<Arc<ViewerContext>> {
    parts
        .extensions
        .get::<Arc<ViewerContext>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("viewer context missing from request".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_prefix_and_raw_tokens_both_parse() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("abc.def.ghi"),
        );
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        assert!(!ViewerContext::anonymous().is_authenticated());
    }
}
