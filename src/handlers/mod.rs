// Handlers are split by security tier:
// public (no auth) and protected (admin JWT required).
pub mod protected;
pub mod public;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::middleware::ApiResponse;
use crate::state::AppState;

/// GET / - service description
pub async fn root() -> ApiResponse<Value> {
    ApiResponse::success(json!({
        "name": "Site API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/auth/login (public - token acquisition)",
            "changes": "/requestEmailChange, /requestPasswordChange, /verify-change (public)",
            "team": "/team[/:id] (list and /team/public/:id public, rest protected)",
            "clients": "/clients[/:id] (list public, rest protected)",
            "advertisements": "/advertisements[/:id] (list public, rest protected)",
            "contacts": "/contacts[/:id] (submit public, rest protected)",
            "internships": "/internship-inquiries[/:id] (submit public, rest protected)",
            "media": "/media/* (public)",
        }
    }))
}

/// GET /health - store reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let uptime = (now - state.started_at).num_seconds();

    match state.store.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "uptime_seconds": uptime,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
