// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.
//!
//! These are the only outcomes callers ever see. Which internal check failed
//! (decryption, missing record, bad signature, identity mismatch) is logged
//! and collapsed into [`AuthError::Unauthorized`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password (deliberately indistinguishable)
    InvalidCredentials,
    /// Email confirmation is required first; no session was created
    RequiresConfirmEmail,
    /// Any transport, crypto, signature, or lookup failure after sign-in
    Unauthorized,
    /// Authenticated, but lacks the required role
    Forbidden,
    /// Session cookies present but not well-formed (anonymous)
    MalformedTransport,
    /// No session cookies (anonymous)
    NoCredentials,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::RequiresConfirmEmail => "requires_confirm_email",
            AuthError::Unauthorized => "unauthorized",
            AuthError::Forbidden => "forbidden",
            AuthError::MalformedTransport => "malformed_transport",
            AuthError::NoCredentials => "no_credentials",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::RequiresConfirmEmail => StatusCode::OK,
            AuthError::InvalidCredentials
            | AuthError::Unauthorized
            | AuthError::MalformedTransport
            | AuthError::NoCredentials => StatusCode::UNAUTHORIZED,
        }
    }

    /// Whether this outcome means "no session" rather than a failed check.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, AuthError::NoCredentials | AuthError::MalformedTransport)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::RequiresConfirmEmail => {
                write!(f, "Email address must be confirmed before signing in")
            }
            AuthError::Unauthorized => write!(f, "Authentication required"),
            AuthError::Forbidden => write!(f, "Insufficient permissions for this operation"),
            AuthError::MalformedTransport | AuthError::NoCredentials => {
                write!(f, "Authentication required")
            }
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn unauthorized_returns_401_with_code() {
        let response = AuthError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "unauthorized");
    }

    #[tokio::test]
    async fn forbidden_returns_403() {
        let response = AuthError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn anonymous_outcomes_share_the_generic_message() {
        assert!(AuthError::NoCredentials.is_anonymous());
        assert!(AuthError::MalformedTransport.is_anonymous());
        assert!(!AuthError::Unauthorized.is_anonymous());
        assert_eq!(
            AuthError::MalformedTransport.to_string(),
            AuthError::Unauthorized.to_string()
        );
    }
}
