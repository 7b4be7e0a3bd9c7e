use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_jwt, Claims};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: LoginUser,
}

/// POST /auth/login - exchange admin credentials for a JWT
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let Json(body) = payload?;
    let email = body.email.unwrap_or_default();
    let password = body.password.unwrap_or_default();
    if email.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Email and password are required"));
    }

    let account = state
        .credentials
        .authenticate(email.trim(), &password)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Failed login attempt");
            ApiError::unauthorized("Invalid email or password")
        })?;

    let hours = state.options.jwt_expiry_hours;
    let claims = Claims::new(account.id.clone(), account.email.clone(), hours);
    let token = generate_jwt(&claims, &state.options.jwt_secret)?;
    tracing::info!("Admin {} logged in", account.id);

    Ok(ApiResponse::success(LoginResponse {
        token,
        expires_in: hours * 3600,
        user: LoginUser {
            id: account.id,
            email: account.email,
        },
    }))
}
