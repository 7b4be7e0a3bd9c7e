use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use crate::middleware::{ApiResult, MessageResponse};
use crate::services::TeamMemberInput;
use crate::state::AppState;

/// GET /team/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.team.get(&id).await?))
}

/// POST /team
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<TeamMemberInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let (id, profile_url) = state.team.create(input).await?;
    Ok(MessageResponse::created("Team member added", id).with_profile_url(profile_url))
}

/// PUT /team/:id
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TeamMemberInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let profile_url = state.team.update(&id, input).await?;
    Ok(MessageResponse::ok("Team member updated").with_profile_url(profile_url))
}

/// DELETE /team/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MessageResponse> {
    state.team.delete(&id).await?;
    Ok(MessageResponse::ok("Team member deleted"))
}
