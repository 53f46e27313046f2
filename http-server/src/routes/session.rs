use axum::{Json, extract::State, http::StatusCode, response::Json as ResponseJson};
use miner::catalog::{self, Upgrade};
use miner::errors::SessionError;
use miner::session::SessionView;
use miner::types::{Activity, UpgradeKind};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AppState, middleware::AuthUser};

// Session response
#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub message: String,
    pub session: Option<SessionView>,
}

// Upgrade purchase request
#[derive(Deserialize)]
pub struct UpgradeRequest {
    pub kind: UpgradeKind,
    pub cost: Decimal, // must equal the catalog price
}

// Upgrade purchase response
#[derive(Serialize)]
pub struct UpgradeResponse {
    pub success: bool,
    pub message: String,
    pub activity: Option<Activity>,
    pub session: Option<SessionView>,
}

// Get session endpoint
pub async fn get_session(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.open_session(&user.uid).await;
    let view = session.lock().await.view();

    let response = SessionResponse {
        success: true,
        message: "Session retrieved successfully".to_string(),
        session: Some(view),
    };
    (StatusCode::OK, Json(response))
}

// Toggle mining endpoint, arms or disarms the ticker
pub async fn toggle_mining(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> (StatusCode, Json<SessionResponse>) {
    let shared = state.open_session(&user.uid).await;

    // Arm or disarm while still holding the lock, in step with the flag
    let mut session = shared.lock().await;
    let status = session.toggle_mining().await;
    if status.is_mining() {
        state.arm(&user.uid, shared.clone());
    } else {
        state.registry.disarm(&user.uid);
    }
    let view = session.view();
    drop(session);

    let response = SessionResponse {
        success: true,
        message: if status.is_mining() {
            "Mining started".to_string()
        } else {
            "Mining stopped".to_string()
        },
        session: Some(view),
    };
    (StatusCode::OK, Json(response))
}

// Purchase upgrade endpoint
pub async fn purchase_upgrade(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Json(payload): Json<UpgradeRequest>,
) -> (StatusCode, Json<UpgradeResponse>) {
    let session = state.open_session(&user.uid).await;
    let mut session = session.lock().await;

    let result = session.purchase_upgrade(payload.kind, payload.cost).await;
    let (status, response) = match result {
        Ok(activity) => (
            StatusCode::OK,
            UpgradeResponse {
                success: true,
                message: format!("{} purchased!", catalog::lookup(payload.kind).name),
                activity: Some(activity),
                session: Some(session.view()),
            },
        ),
        Err(err) => {
            let status = match err {
                SessionError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            };
            (
                status,
                UpgradeResponse {
                    success: false,
                    message: err.to_string(),
                    activity: None,
                    session: Some(session.view()),
                },
            )
        }
    };

    (status, Json(response))
}

// Upgrade catalog endpoint
pub async fn get_upgrades() -> ResponseJson<Vec<Upgrade>> {
    Json(catalog::all().into_iter().copied().collect())
}
