// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the scheme-bound aliases in handlers to require a role:
//!
//! ```rust,ignore
//! async fn my_handler(user: UserOnly) -> impl IntoResponse {
//!     // user derefs to AuthenticatedUser
//! }
//! ```

use std::marker::PhantomData;
use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};

use super::authenticator::RequestAuthenticator;
use super::cookies::TransportCookies;
use super::roles::{AdminScheme, RoleScheme, UserScheme};
use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;

/// Extractor requiring the role of scheme `S`.
///
/// Every request runs the full cookie check and re-reads the user's roles
/// from the directory.
pub struct Authenticated<S: RoleScheme> {
    pub user: AuthenticatedUser,
    scheme: PhantomData<fn() -> S>,
}

/// Extractor that requires admin role.
pub type AdminOnly = Authenticated<AdminScheme>;

/// Extractor that requires user role.
pub type UserOnly = Authenticated<UserScheme>;

impl<S: RoleScheme> Authenticated<S> {
    pub fn into_inner(self) -> AuthenticatedUser {
        self.user
    }
}

impl<S: RoleScheme> Deref for Authenticated<S> {
    type Target = AuthenticatedUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<S: RoleScheme> FromRequestParts<AppState> for Authenticated<S> {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = TransportCookies::from_headers(&parts.headers);
        let user = RequestAuthenticator::new(state.auth.clone(), S::ROLE)
            .authenticate(&cookies, parts.uri.path())?;
        Ok(Self {
            user,
            scheme: PhantomData,
        })
    }
}

/// Optional authentication extractor.
///
/// Yields any valid session without enforcing the role of `S`, and `None`
/// instead of rejecting. Never audits.
pub struct OptionalAuth<S: RoleScheme> {
    pub user: Option<AuthenticatedUser>,
    scheme: PhantomData<fn() -> S>,
}

impl<S: RoleScheme> FromRequestParts<AppState> for OptionalAuth<S> {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = TransportCookies::from_headers(&parts.headers);
        let user = RequestAuthenticator::new(state.auth.clone(), S::ROLE)
            .identify(&cookies, parts.uri.path())
            .ok();
        Ok(Self {
            user,
            scheme: PhantomData,
        })
    }
}
