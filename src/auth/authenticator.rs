// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Inbound Request Authenticator
//!
//! One implementation for every role; the required role is a value.
//!
//! ## Checks (in order, no retries)
//!
//! | Step | Check | Outcome on failure |
//! |------|-------|--------------------|
//! | 1 | access and user-id cookies present | `NoCredentials` |
//! | 2 | both are sealed-value shaped | `MalformedTransport` |
//! | 3 | both open under the app key | `Unauthorized` |
//! | 4 | live record for (user id, username cookie) | `Unauthorized` |
//! | 5 | access value opens under the record's `k_jwt` | `Unauthorized` |
//! | 6 | HS256 signature, lifetime, issuer, audience | `Unauthorized` |
//! | 7 | `sub` == username cookie, `nameid` == user id | `Unauthorized` |
//! | 8 | account still exists under the same id | `Unauthorized` |
//! | 9 | account currently holds the role | `Forbidden` + audit |

use std::sync::Arc;

use super::claims::{AuthenticatedUser, SessionClaims};
use super::context::AuthContext;
use super::cookies::{is_sealed_shape, TransportCookies};
use super::directory::{DirectoryError, DirectoryUser};
use super::error::AuthError;
use super::protector::ProtectorError;
use super::roles::Role;
use super::token::TokenError;
use crate::storage::{AuditEventType, StoreError};

/// Why a request was refused. Logged, never returned.
#[derive(Debug, thiserror::Error)]
enum Denial {
    #[error("outer layer did not open: {0}")]
    OuterLayer(ProtectorError),
    #[error("username cookie missing")]
    MissingUsername,
    #[error("no live session record")]
    NoSession,
    #[error("session store unavailable: {0}")]
    Store(#[from] StoreError),
    #[error("inner layer did not open: {0}")]
    InnerLayer(ProtectorError),
    #[error("token rejected: {0}")]
    Token(#[from] TokenError),
    #[error("token subject does not match username cookie")]
    SubjectMismatch,
    #[error("token user id does not match user id cookie")]
    UserIdMismatch,
    #[error("account no longer exists")]
    UnknownAccount,
    #[error("username now belongs to another account")]
    AccountMismatch,
    #[error("directory unavailable: {0}")]
    Directory(#[from] DirectoryError),
}

/// Authenticates requests for one required role.
#[derive(Clone)]
pub struct RequestAuthenticator {
    ctx: Arc<AuthContext>,
    required_role: Role,
}

impl RequestAuthenticator {
    pub fn new(ctx: Arc<AuthContext>, required_role: Role) -> Self {
        Self { ctx, required_role }
    }

    /// Authenticate the cookies of a request to `path`.
    pub fn authenticate(
        &self,
        cookies: &TransportCookies,
        path: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let (claims, user) = self.resolve(cookies, path)?;

        match self.ctx.directory.is_in_role(&user, self.required_role) {
            Ok(true) => Ok(AuthenticatedUser::from_claims(claims, self.required_role)),
            Ok(false) => {
                tracing::warn!(
                    scheme = self.required_role.scheme_name(),
                    path,
                    user_id = %user.id,
                    required_role = %self.required_role,
                    "Authenticated user lacks required role"
                );
                let description =
                    format!("Unauthorized access to {path} (requires {})", self.required_role);
                self.ctx.audit.record(
                    &user.id,
                    AuditEventType::UnauthorizedAccess,
                    Some(&description),
                );
                Err(AuthError::Forbidden)
            }
            Err(e) => {
                tracing::error!(
                    scheme = self.required_role.scheme_name(),
                    path,
                    error = %e,
                    "Role lookup failed"
                );
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Identify the session without checking the required role.
    ///
    /// Runs steps 1 to 8 only and never audits.
    pub fn identify(
        &self,
        cookies: &TransportCookies,
        path: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let (claims, _) = self.resolve(cookies, path)?;
        Ok(AuthenticatedUser::from_claims(claims, self.required_role))
    }

    fn resolve(
        &self,
        cookies: &TransportCookies,
        path: &str,
    ) -> Result<(SessionClaims, DirectoryUser), AuthError> {
        let scheme = self.required_role.scheme_name();

        let (Some(access), Some(sealed_user_id)) =
            (cookies.access.as_deref(), cookies.user_id.as_deref())
        else {
            return Err(AuthError::NoCredentials);
        };

        if !is_sealed_shape(access) || !is_sealed_shape(sealed_user_id) {
            tracing::debug!(scheme, path, "Session cookies are not sealed values");
            return Err(AuthError::MalformedTransport);
        }

        match self.verify(access, sealed_user_id, cookies.username.as_deref()) {
            Ok(verified) => Ok(verified),
            Err(Denial::Token(TokenError::Expired)) => {
                tracing::info!(scheme, path, "Session token expired; refresh not supported");
                Err(AuthError::Unauthorized)
            }
            Err(denial) => {
                tracing::warn!(scheme, path, denial = %denial, "Request authentication failed");
                Err(AuthError::Unauthorized)
            }
        }
    }

    /// Steps 3 to 8: open both layers and cross-check identity.
    fn verify(
        &self,
        access: &str,
        sealed_user_id: &str,
        username: Option<&str>,
    ) -> Result<(SessionClaims, DirectoryUser), Denial> {
        let ctx = &self.ctx;
        let app_key = &ctx.settings.app_key;

        let inner_token = ctx
            .protector
            .unprotect(app_key, access)
            .map_err(Denial::OuterLayer)?;
        let user_id = ctx
            .protector
            .unprotect(app_key, sealed_user_id)
            .map_err(Denial::OuterLayer)?;

        let username = username.ok_or(Denial::MissingUsername)?;
        let record = ctx
            .store
            .get_for_username(&user_id, username)?
            .ok_or(Denial::NoSession)?;

        let signed = ctx
            .protector
            .unprotect(&record.encryption_key_jwt, &inner_token)
            .map_err(Denial::InnerLayer)?;
        let claims = ctx.signer.validate(&signed)?;

        if claims.sub != username {
            return Err(Denial::SubjectMismatch);
        }
        if claims.user_id != user_id {
            return Err(Denial::UserIdMismatch);
        }

        let user = ctx
            .directory
            .find_by_username(&claims.sub)?
            .ok_or(Denial::UnknownAccount)?;
        if user.id != user_id {
            return Err(Denial::AccountMismatch);
        }

        Ok((claims, user))
    }
}
