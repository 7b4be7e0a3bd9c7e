//! Approval-gated credential change endpoints.
//!
//! None of these take an auth header: requests are approved out of band by
//! the approver mailbox, and the verification link is opened from an email.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Json,
};
use serde::Deserialize;

use crate::changes::ChangeType;
use crate::middleware::{ApiResult, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailChangeRequest {
    pub email_to_change: Option<String>,
    pub new_email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeRequest {
    pub email_to_change: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyQuery {
    pub token: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub change_type: Option<String>,
}

/// POST /requestEmailChange
pub async fn request_email_change(
    State(state): State<AppState>,
    payload: Result<Json<EmailChangeRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(body) = payload?;
    let message = state
        .initiator
        .initiate(
            ChangeType::Email,
            body.email_to_change.as_deref().unwrap_or_default(),
            body.new_email.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(MessageResponse::ok(message))
}

/// POST /requestPasswordChange
pub async fn request_password_change(
    State(state): State<AppState>,
    payload: Result<Json<PasswordChangeRequest>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    let Json(body) = payload?;
    let message = state
        .initiator
        .initiate(
            ChangeType::Password,
            body.email_to_change.as_deref().unwrap_or_default(),
            body.new_password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(MessageResponse::ok(message))
}

/// GET /verify-change?token&userId&type
pub async fn verify_change(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> ApiResult<MessageResponse> {
    let Query(query) = query?;
    let message = state
        .verifier
        .verify(
            query.token.as_deref().unwrap_or_default(),
            query.user_id.as_deref().unwrap_or_default(),
            query.change_type.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(MessageResponse::ok(message))
}
