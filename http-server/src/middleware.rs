use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};

use crate::{AppState, models::AuthenticatedUser};

// Axum extractor for authenticated users
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: AuthenticatedUser,
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Extract the Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or_else(|| {
                (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response()
            })?;

        // Check if it's a Bearer token
        let Some(token) = auth_header.strip_prefix("Bearer ") else {
            return Err((
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format",
            )
                .into_response());
        };

        match state.registry.user_for_token(token) {
            Some(user) => Ok(AuthUser {
                user: AuthenticatedUser::from(user),
                token: token.to_string(),
            }),
            None => Err((StatusCode::UNAUTHORIZED, "Invalid token").into_response()),
        }
    }
}
