// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Issuer
//!
//! Turns a verified email/password pair into a live session:
//!
//! 1. Look the account up and verify the password
//! 2. Refuse unconfirmed emails when the policy requires it
//! 3. Sign a token, seal it under a fresh per-token key (`k_jwt`)
//! 4. Seal the result again under the application key for the cookie
//! 5. Persist the [`TokenRecord`], superseding any previous session
//!
//! The per-token keys only live in the record, so revoking the record
//! kills the cookie even while the signed token itself is still valid.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use super::context::AuthContext;
use super::cookies::TransportCookies;
use super::directory::{DirectoryError, DirectoryUser};
use super::error::AuthError;
use super::protector::{random_identifier, ProtectorError};
use super::roles::Role;
use super::token::TokenError;
use crate::storage::{AuditEventType, StoreError, TokenRecord};

/// Entropy of per-token key names.
const KEY_ID_BYTES: usize = 16;

/// Entropy of refresh values.
const REFRESH_VALUE_BYTES: usize = 32;

/// Transport-ready values of a fresh session.
#[derive(Debug, Clone)]
pub struct TokenResult {
    /// app-key( k_jwt( signed token ) )
    pub access_token: String,
    /// app-key( user id )
    pub user_id_token: String,
    /// k_refresh( refresh value ), kept for refresh flows
    pub refresh_token: String,
    pub user_id: String,
    pub username: String,
    pub roles: Vec<Role>,
    /// Expiry of the signed token
    pub access_expires_at: DateTime<Utc>,
    /// Expiry of the session record and cookies
    pub refresh_expires_at: DateTime<Utc>,
}

/// Failures past the credential check. Never shown to callers.
#[derive(Debug, thiserror::Error)]
enum IssueError {
    #[error("directory: {0}")]
    Directory(#[from] DirectoryError),
    #[error("token: {0}")]
    Token(#[from] TokenError),
    #[error("protector: {0}")]
    Protector(#[from] ProtectorError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct CredentialIssuer {
    ctx: Arc<AuthContext>,
}

impl CredentialIssuer {
    pub fn new(ctx: Arc<AuthContext>) -> Self {
        Self { ctx }
    }

    /// Sign a user in. Blocking: password verification is CPU-bound.
    pub fn authenticate(
        &self,
        email: &str,
        password: &str,
        client_id: &str,
    ) -> Result<TokenResult, AuthError> {
        let user = match self.ctx.directory.find_by_email(email) {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::info!("Sign-in rejected: no account for email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(error = %e, "Directory lookup failed during sign-in");
                return Err(AuthError::Unauthorized);
            }
        };

        match self.ctx.directory.check_password(&user, password) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(user_id = %user.id, "Sign-in rejected: wrong password");
                self.ctx.audit.record(
                    &user.id,
                    AuditEventType::InvalidPassword,
                    Some("Invalid password"),
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Password verification failed");
                return Err(AuthError::Unauthorized);
            }
        }

        if self.ctx.settings.require_confirmed_email && !user.email_confirmed {
            tracing::info!(user_id = %user.id, "Sign-in deferred: email not confirmed");
            self.ctx.audit.record(
                &user.id,
                AuditEventType::EmailNotConfirmed,
                Some("Email confirmation required"),
            );
            return Err(AuthError::RequiresConfirmEmail);
        }

        match self.issue(&user, client_id) {
            Ok(result) => {
                tracing::info!(
                    user_id = %user.id,
                    client_id = %client_id,
                    expires_at = %result.access_expires_at,
                    "Session issued"
                );
                self.ctx.audit.record(&user.id, AuditEventType::SignIn, None);
                Ok(result)
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Failed to issue session");
                Err(AuthError::Unauthorized)
            }
        }
    }

    fn issue(&self, user: &DirectoryUser, client_id: &str) -> Result<TokenResult, IssueError> {
        let ctx = &self.ctx;
        let settings = &ctx.settings;
        let now = Utc::now();

        let roles = ctx.directory.get_roles(user)?;
        let lifetime = if roles.iter().any(Role::is_privileged) {
            settings.privileged_window
        } else {
            settings.access_window
        };

        let claims = ctx
            .signer
            .claims_for(&user.id, &user.username, &roles, now, lifetime)?;
        let signed = ctx.signer.sign(&claims)?;

        let key_jwt = random_identifier(KEY_ID_BYTES)?;
        let key_refresh = random_identifier(KEY_ID_BYTES)?;
        let value = random_identifier(REFRESH_VALUE_BYTES)?;

        let inner_token = ctx.protector.protect(&key_jwt, &signed)?;
        let access_token = ctx.protector.protect(&settings.app_key, &inner_token)?;
        let user_id_token = ctx.protector.protect(&settings.app_key, &user.id)?;
        let refresh_token = ctx.protector.protect(&key_refresh, &value)?;

        let record = TokenRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            username: user.username.clone(),
            client_id: client_id.to_string(),
            value,
            encryption_key_jwt: key_jwt,
            encryption_key_refresh_token: key_refresh,
            expiry_date: now + settings.refresh_window,
            date_created: now,
            last_modified_date: None,
        };

        // Everything is sealed before this point: a failure above leaves any
        // previous session untouched.
        ctx.store.put(&record)?;

        Ok(TokenResult {
            access_token,
            user_id_token,
            refresh_token,
            user_id: user.id.clone(),
            username: user.username.clone(),
            roles,
            access_expires_at: Utc.timestamp_opt(claims.exp, 0).single().unwrap_or(now + lifetime),
            refresh_expires_at: record.expiry_date,
        })
    }

    /// Revoke the session named by the user-id cookie.
    ///
    /// Never fails; returns whether a record was removed. Clearing the
    /// cookies themselves is the caller's job and must happen regardless.
    pub fn sign_out(&self, cookies: &TransportCookies) -> bool {
        let Some(sealed) = cookies.user_id.as_deref() else {
            tracing::warn!("Sign-out without user id cookie");
            return false;
        };

        let user_id = match self.ctx.protector.unprotect(&self.ctx.settings.app_key, sealed) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::warn!(error = %e, "Sign-out with unreadable user id cookie");
                return false;
            }
        };

        match self.ctx.store.remove_all(&user_id) {
            Ok(true) => {
                tracing::info!(user_id = %user_id, "Session revoked");
                self.ctx.audit.record(&user_id, AuditEventType::SignOut, None);
                true
            }
            Ok(false) => {
                tracing::warn!(user_id = %user_id, "Sign-out found no active session");
                false
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to revoke session");
                false
            }
        }
    }
}
