use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::middleware::{ApiResult, MessageResponse};
use crate::services::ClientInput;
use crate::state::AppState;

/// POST /clients
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<ClientInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let id = state.clients.create(input).await?;
    Ok(MessageResponse::created("Client added", id))
}

/// PUT /clients/:id
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ClientInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    state.clients.update(&id, input).await?;
    Ok(MessageResponse::ok("Client updated"))
}

/// DELETE /clients/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MessageResponse> {
    state.clients.delete(&id).await?;
    Ok(MessageResponse::ok("Client deleted"))
}
