// Read-side services: queries and aggregation over the entity store.

pub mod feed;
pub mod profile;

pub use feed::{FeedFilter, FeedService, FeedSort};
pub use profile::{ProfileService, ProfileUpdate};

use std::collections::HashMap;

use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Post, UserSummary};
use crate::store::EntityStore;

/// Fetch author summaries for a set of user ids, concurrently. Missing
/// users are simply absent from the map.
pub(crate) async fn user_summaries(
    store: &EntityStore,
    ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, UserSummary>> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    let results = futures::future::join_all(ids.iter().map(|id| store.get_user(*id))).await;

    let mut map = HashMap::with_capacity(ids.len());
    for result in results {
        if let Some(user) = result? {
            map.insert(user.id, user.summary());
        }
    }
    Ok(map)
}

/// Post document with the author reference swapped for a denormalized
/// summary, the way every list endpoint returns posts.
pub(crate) fn post_view(post: &Post, author: Option<&UserSummary>) -> AppResult<Value> {
    let mut view = encode(post)?;
    view["author"] = match author {
        Some(summary) => encode(summary)?,
        None => Value::Null,
    };
    Ok(view)
}

pub(crate) fn encode<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(format!("encode failed: {}", e)))
}
