use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use crate::middleware::{ApiResult, MessageResponse};
use crate::services::InquiryStatusInput;
use crate::state::AppState;

/// GET /internship-inquiries - newest first
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.internships.list().await?))
}

/// PUT /internship-inquiries/:id - only the status can change
pub async fn put(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<InquiryStatusInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let message = state.internships.set_status(&id, input).await?;
    Ok(MessageResponse::ok(message))
}

/// DELETE /internship-inquiries/:id
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MessageResponse> {
    state.internships.delete(&id).await?;
    Ok(MessageResponse::ok("Internship inquiry deleted"))
}
