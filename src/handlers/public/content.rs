// Unauthenticated content reads and visitor submissions

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use crate::middleware::{ApiResult, MessageResponse};
use crate::services::{ContactInput, InternshipInput};
use crate::state::AppState;

/// GET /team
pub async fn team_list(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.team.list().await?))
}

/// GET /team/public/:id
pub async fn team_public_get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    Ok(Json(state.team.get(&id).await?))
}

/// GET /clients
pub async fn clients_list(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.clients.list().await?))
}

/// GET /advertisements - newest first
pub async fn advertisements_list(State(state): State<AppState>) -> ApiResult<Json<Vec<Value>>> {
    Ok(Json(state.advertisements.list().await?))
}

/// POST /contacts
pub async fn contact_submit(
    State(state): State<AppState>,
    payload: Result<Json<ContactInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let id = state.contacts.submit(input).await?;
    Ok(MessageResponse::created("Contact message submitted", id))
}

/// POST /internship-inquiries
pub async fn internship_submit(
    State(state): State<AppState>,
    payload: Result<Json<InternshipInput>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(input) = payload?;
    let id = state.internships.submit(input).await?;
    Ok(MessageResponse::created("Internship inquiry submitted", id))
}
