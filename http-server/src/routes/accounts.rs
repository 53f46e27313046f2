use axum::{Json, extract::State, http::StatusCode};
use miner::accounts::{LOGIN_SUCCESS, REGISTER_SUCCESS};
use miner::errors::{AccountError, AuthError};
use miner::types::User;
use miner::validation::{LoginForm, RegistrationForm};
use serde::Serialize;

use crate::{AppState, middleware::AuthUser, models::AuthenticatedUser};

// Register / login response
#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub session_id: Option<String>,
    pub user: Option<AuthenticatedUser>,
}

fn account_error_status(err: &AccountError) -> StatusCode {
    match err {
        AccountError::Validation(_) => StatusCode::BAD_REQUEST,
        AccountError::Auth(AuthError::InvalidEmail | AuthError::WeakPassword) => {
            StatusCode::BAD_REQUEST
        }
        AccountError::Auth(AuthError::EmailInUse) => StatusCode::CONFLICT,
        AccountError::Auth(AuthError::TooManyRequests) => StatusCode::TOO_MANY_REQUESTS,
        AccountError::Auth(_) => StatusCode::UNAUTHORIZED,
    }
}

fn failure(err: AccountError) -> (StatusCode, Json<AuthResponse>) {
    let response = AuthResponse {
        success: false,
        message: err.to_string(),
        session_id: None,
        user: None,
    };
    (account_error_status(&err), Json(response))
}

// Load the user's session and hand out a bearer token
async fn start_session(state: &AppState, user: User, message: &str) -> AuthResponse {
    state.open_session(&user.uid).await;
    let session_id = state.registry.issue_token(&user);

    AuthResponse {
        success: true,
        message: message.to_string(),
        session_id: Some(session_id),
        user: Some(AuthenticatedUser::from(user)),
    }
}

// Register endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(form): Json<RegistrationForm>,
) -> (StatusCode, Json<AuthResponse>) {
    match state.accounts.register(&form).await {
        Ok(user) => {
            let response = start_session(&state, user, REGISTER_SUCCESS).await;
            (StatusCode::CREATED, Json(response))
        }
        Err(err) => {
            tracing::info!("Registration rejected: {}", err);
            failure(err)
        }
    }
}

// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> (StatusCode, Json<AuthResponse>) {
    match state.accounts.login(&form).await {
        Ok(user) => {
            let response = start_session(&state, user, LOGIN_SUCCESS).await;
            (StatusCode::OK, Json(response))
        }
        Err(err) => {
            tracing::info!("Login rejected: {}", err);
            failure(err)
        }
    }
}

// Logout endpoint, ends the session once its last token is revoked
pub async fn logout(
    State(state): State<AppState>,
    AuthUser { user, token }: AuthUser,
) -> (StatusCode, Json<AuthResponse>) {
    state.registry.end(&token);
    state.accounts.sign_out(&user.uid).await;

    let response = AuthResponse {
        success: true,
        message: "Logged out".to_string(),
        session_id: None,
        user: Some(user),
    };
    (StatusCode::OK, Json(response))
}
