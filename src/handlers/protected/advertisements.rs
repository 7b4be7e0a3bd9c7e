use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::middleware::{ApiResult, MessageResponse};
use crate::services::AdvertisementInput;
use crate::state::AppState;

/// POST /advertisements
pub async fn post(
    State(state): State<AppState>,
    payload: Result<Json<AdvertisementInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let id = state.advertisements.create(input).await?;
    Ok(MessageResponse::created("Advertisement added", id))
}

/// PUT /advertisements/:id
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<AdvertisementInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    state.advertisements.update(&id, input).await?;
    Ok(MessageResponse::ok("Advertisement updated"))
}

/// DELETE /advertisements/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MessageResponse> {
    state.advertisements.delete(&id).await?;
    Ok(MessageResponse::ok("Advertisement deleted successfully"))
}
