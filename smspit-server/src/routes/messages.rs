use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use smspit_store::{Message, SearchQuery};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub total: usize,
}

/// GET /api/v1/messages
///
/// `total` is always the full store size; `limit`/`offset` only window the
/// returned page.
pub async fn list_messages(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<MessageList>> {
    let Query(params) = params.map_err(|e| ApiError::decode(e.body_text()))?;

    let snapshot = state.store.list().await;
    let total = snapshot.len();
    let messages = paginate(snapshot, params.offset, params.limit);

    Ok(Json(MessageList { messages, total }))
}

/// GET /api/v1/messages/search
pub async fn search_messages(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Json<MessageList>> {
    let Query(query) = query.map_err(|e| ApiError::decode(e.body_text()))?;

    let messages = state.store.search(&query).await;
    let total = messages.len();
    Ok(Json(MessageList { messages, total }))
}

/// GET /api/v1/messages/{id}
pub async fn get_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    state
        .store
        .find(&id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Message not found"))
}

/// DELETE /api/v1/messages
pub async fn delete_messages(State(state): State<AppState>) -> Json<Value> {
    let removed = state.store.delete_all().await;
    tracing::info!("🗑️ All messages cleared ({} removed)", removed);
    Json(json!({ "status": "cleared" }))
}

/// DELETE /api/v1/messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    if state.store.delete_one(&id).await {
        tracing::info!("🗑️ Message {} deleted", id);
        Ok(Json(json!({ "status": "deleted" })))
    } else {
        Err(ApiError::not_found("Message not found"))
    }
}

fn paginate(messages: Vec<Message>, offset: Option<usize>, limit: Option<usize>) -> Vec<Message> {
    let offset = offset.unwrap_or(0);
    let iter = messages.into_iter().skip(offset);
    match limit {
        Some(limit) => iter.take(limit).collect(),
        None => iter.collect(),
    }
}
