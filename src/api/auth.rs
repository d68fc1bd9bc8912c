// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sign-in, sign-out and session status endpoints.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{
    AuthError, CredentialIssuer, OptionalAuth, Role, TokenResult, TransportCookies, UserScheme,
};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /v1/auth/login
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Issuing client; the server default is used when absent
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Response for POST /v1/auth/login
///
/// Session values travel in `Set-Cookie` headers; the body only describes
/// the session.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    /// Whether a session was created
    pub succeeded: bool,
    /// Set when the account must confirm its email first (no session created)
    pub requires_confirm_email: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<DateTime<Utc>>,
    /// Sealed refresh value for future refresh flows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl LoginResponse {
    fn confirm_email_required() -> Self {
        Self {
            succeeded: false,
            requires_confirm_email: true,
            user_id: None,
            username: None,
            roles: Vec::new(),
            access_expires_at: None,
            refresh_expires_at: None,
            refresh_token: None,
        }
    }
}

impl From<&TokenResult> for LoginResponse {
    fn from(result: &TokenResult) -> Self {
        Self {
            succeeded: true,
            requires_confirm_email: false,
            user_id: Some(result.user_id.clone()),
            username: Some(result.username.clone()),
            roles: result.roles.clone(),
            access_expires_at: Some(result.access_expires_at),
            refresh_expires_at: Some(result.refresh_expires_at),
            refresh_token: Some(result.refresh_token.clone()),
        }
    }
}

/// Response for POST /v1/auth/logout
#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    /// Always true: sign-out never fails
    pub signed_out: bool,
}

/// Response for GET /v1/auth/status
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

fn with_cookies(mut response: Response, cookies: Vec<HeaderValue>) -> Response {
    for cookie in cookies {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Sign in with email and password.
///
/// On success the three session cookies are set. A previous session of the
/// same user is revoked.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, or email confirmation required", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let issuer = CredentialIssuer::new(state.auth.clone());
    let client_id = request
        .client_id
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.client_id.clone());

    let outcome = tokio::task::spawn_blocking(move || {
        issuer.authenticate(&request.email, &request.password, &client_id)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Sign-in task failed");
        ApiError::from(AuthError::Unauthorized)
    })?;

    match outcome {
        Ok(result) => {
            let cookies = state.cookies.session_cookies(
                &result.access_token,
                &result.user_id_token,
                &result.username,
                result.refresh_expires_at,
            );
            let response = Json(LoginResponse::from(&result)).into_response();
            Ok(with_cookies(response, cookies))
        }
        Err(AuthError::RequiresConfirmEmail) => {
            Ok(Json(LoginResponse::confirm_email_required()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// Sign out.
///
/// Clears the session cookies and revokes the session record. Always
/// succeeds, including without a session.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Signed out", body = LogoutResponse),
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let response = with_cookies(
        Json(LogoutResponse { signed_out: true }).into_response(),
        state.cookies.clear_cookies(),
    );

    let cookies = TransportCookies::from_headers(&headers);
    CredentialIssuer::new(state.auth.clone()).sign_out(&cookies);

    response
}

/// Report whether the request carries a valid session, whatever its roles.
#[utoipa::path(
    get,
    path = "/v1/auth/status",
    tag = "Auth",
    responses(
        (status = 200, description = "Session status", body = SessionStatusResponse),
    )
)]
pub async fn status(auth: OptionalAuth<UserScheme>) -> Json<SessionStatusResponse> {
    Json(match auth.user {
        Some(user) => SessionStatusResponse {
            authenticated: true,
            username: Some(user.username),
            expires_at: Some(user.expires_at),
        },
        None => SessionStatusResponse {
            authenticated: false,
            username: None,
            expires_at: None,
        },
    })
}
