use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use miner::directory::{DirectoryEntry, DirectoryUpdate, NewDirectoryEntry};
use miner::errors::{DirectoryError, ServiceError};
use serde::{Deserialize, Serialize};

use crate::{AppState, middleware::AuthUser, models::AuthenticatedUser};

// List users query parameters
#[derive(Deserialize)]
pub struct ListUsersRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    20
}

// Directory listing response
#[derive(Serialize)]
pub struct ListUsersResponse {
    pub success: bool,
    pub message: String,
    pub users: Vec<DirectoryEntry>,
}

// Single directory entry response
#[derive(Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: Option<DirectoryEntry>,
}

fn directory_error_status(err: &DirectoryError) -> StatusCode {
    match err {
        DirectoryError::Validation(_) => StatusCode::BAD_REQUEST,
        DirectoryError::Service(ServiceError::NotFound { .. }) => StatusCode::NOT_FOUND,
        DirectoryError::Service(ServiceError::Malformed(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        DirectoryError::Service(ServiceError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn user_failure(err: DirectoryError) -> (StatusCode, Json<UserResponse>) {
    tracing::warn!("Directory request failed: {}", err);
    let response = UserResponse {
        success: false,
        message: err.to_string(),
        user: None,
    };
    (directory_error_status(&err), Json(response))
}

// List users endpoint
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser { .. }: AuthUser,
    Query(params): Query<ListUsersRequest>,
) -> (StatusCode, Json<ListUsersResponse>) {
    match state.directory.list(params.limit).await {
        Ok(users) => (
            StatusCode::OK,
            Json(ListUsersResponse {
                success: true,
                message: format!("{} users", users.len()),
                users,
            }),
        ),
        Err(err) => (
            directory_error_status(&err),
            Json(ListUsersResponse {
                success: false,
                message: err.to_string(),
                users: Vec::new(),
            }),
        ),
    }
}

// Add user endpoint
pub async fn add_user(
    State(state): State<AppState>,
    AuthUser { .. }: AuthUser,
    Json(payload): Json<NewDirectoryEntry>,
) -> (StatusCode, Json<UserResponse>) {
    match state.directory.add(payload).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(UserResponse {
                success: true,
                message: "User added".to_string(),
                user: Some(user),
            }),
        ),
        Err(err) => user_failure(err),
    }
}

// Get user endpoint
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser { .. }: AuthUser,
    Path(id): Path<String>,
) -> (StatusCode, Json<UserResponse>) {
    match state.directory.get(&id).await {
        Ok(Some(user)) => (
            StatusCode::OK,
            Json(UserResponse {
                success: true,
                message: "User retrieved successfully".to_string(),
                user: Some(user),
            }),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(UserResponse {
                success: false,
                message: format!("User '{}' not found", id),
                user: None,
            }),
        ),
        Err(err) => user_failure(err),
    }
}

// Update user endpoint
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser { .. }: AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<DirectoryUpdate>,
) -> (StatusCode, Json<UserResponse>) {
    if let Err(err) = state.directory.update(&id, payload).await {
        return user_failure(err);
    }

    match state.directory.get(&id).await {
        Ok(user) => (
            StatusCode::OK,
            Json(UserResponse {
                success: true,
                message: "User updated".to_string(),
                user,
            }),
        ),
        Err(err) => user_failure(err),
    }
}

// User profile response
#[derive(Serialize)]
pub struct UserProfileResponse {
    pub success: bool,
    pub user: Option<AuthenticatedUser>,
    pub message: String,
}

// Get user profile endpoint (protected route)
pub async fn get_profile(AuthUser { user, .. }: AuthUser) -> (StatusCode, Json<UserProfileResponse>) {
    let response = UserProfileResponse {
        success: true,
        user: Some(user),
        message: "Profile retrieved successfully".to_string(),
    };
    (StatusCode::OK, Json(response))
}
