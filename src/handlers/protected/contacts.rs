use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use crate::middleware::{ApiResult, MessageResponse};
use crate::services::ContactInput;
use crate::state::AppState;

/// GET /contacts
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.contacts.list().await?))
}

/// PUT /contacts/:id
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    state.contacts.update(&id, input).await?;
    Ok(MessageResponse::ok("Contact updated"))
}

/// DELETE /contacts/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MessageResponse> {
    state.contacts.delete(&id).await?;
    Ok(MessageResponse::ok("Contact deleted"))
}
