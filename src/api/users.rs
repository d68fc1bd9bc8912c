// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{AuthenticatedUser, Role, UserOnly};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// User's unique ID
    pub user_id: String,
    pub username: String,
    /// Roles claimed at sign-in
    pub roles: Vec<Role>,
    /// Scheme that admitted the request
    pub scheme: String,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl From<AuthenticatedUser> for UserMeResponse {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            roles: user.roles,
            scheme: user.scheme,
            expires_at: user.expires_at,
        }
    }
}

/// Get the current authenticated user's information.
///
/// This endpoint returns the identity and roles of the currently authenticated user.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing session"),
        (status = 403, description = "Forbidden - User role required"),
    )
)]
pub async fn get_current_user(user: UserOnly) -> Json<UserMeResponse> {
    Json(user.into_inner().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_me_response_from_authenticated_user() {
        let user = AuthenticatedUser {
            user_id: "user_123".to_string(),
            username: "ada".to_string(),
            roles: vec![Role::User],
            scheme: "UserScheme".to_string(),
            token_id: "jti".to_string(),
            expires_at: 1700000000,
        };

        let response: UserMeResponse = user.into();
        assert_eq!(response.user_id, "user_123");
        assert_eq!(response.roles, vec![Role::User]);
        assert_eq!(response.scheme, "UserScheme");
    }
}
