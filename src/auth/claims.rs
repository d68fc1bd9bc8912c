// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signed-token claims and the authenticated principal.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// Claims carried by a session token.
///
/// Field names follow the wire names issued by earlier deployments
/// (`nameid`, `LoggedOn`, `role`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: the username
    pub sub: String,

    /// Unique token id
    pub jti: String,

    /// User id
    #[serde(rename = "nameid")]
    pub user_id: String,

    /// Sign-in time (RFC 3339)
    #[serde(rename = "LoggedOn")]
    pub logged_on: String,

    /// One entry per role held at issuance
    #[serde(rename = "role", default)]
    pub roles: Vec<String>,

    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Roles in the token that this service knows about.
    pub fn known_roles(&self) -> Vec<Role> {
        self.roles.iter().filter_map(|r| Role::from_str(r)).collect()
    }
}

/// Authenticated principal produced for a request.
///
/// This is the primary type used by handlers to represent the caller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub username: String,

    /// Roles claimed by the token at issuance
    pub roles: Vec<Role>,

    /// Scheme that admitted the request (e.g. `AdminScheme`)
    pub scheme: String,

    /// Token id (`jti`)
    pub token_id: String,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Build a principal from validated claims, scoped to `scheme`'s role.
    pub fn from_claims(claims: SessionClaims, scheme: Role) -> Self {
        Self {
            roles: claims.known_roles(),
            user_id: claims.user_id,
            username: claims.sub,
            scheme: scheme.scheme_name().to_string(),
            token_id: claims.jti,
            expires_at: claims.exp,
        }
    }
}
