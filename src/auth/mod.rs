// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Cookie-transported session tokens for the Session Guard API.
//!
//! ## Auth Flow
//!
//! 1. Client posts email and password to `/v1/auth/login`
//! 2. [`CredentialIssuer`]:
//!    - Verifies the password against the [`UserDirectory`]
//!    - Signs an HS256 token and seals it twice (per-token key, then app key)
//!    - Stores the per-token keys in the user's single [`TokenRecord`]
//! 3. Client sends the `sg_access`, `sg_uid` and `sg_user` cookies back
//! 4. [`RequestAuthenticator`] (via the [`Authenticated`] extractor):
//!    - Opens both layers, validates the token, cross-checks identity
//!    - Re-checks the required role against the directory
//!
//! ## Security
//!
//! - Signing in again supersedes the previous session
//! - Sign-out deletes the record, which makes the old cookies unreadable
//! - Callers only ever see the coarse [`AuthError`] outcomes
//! - Clock skew tolerance is 60 seconds
//!
//! [`TokenRecord`]: crate::storage::TokenRecord

pub mod authenticator;
pub mod claims;
pub mod context;
pub mod cookies;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod issuer;
pub mod protector;
pub mod roles;
pub mod token;

pub use authenticator::RequestAuthenticator;
pub use claims::{AuthenticatedUser, SessionClaims};
pub use context::AuthContext;
pub use cookies::{CookiePolicy, TransportCookies};
pub use directory::{DirectoryUser, InMemoryDirectory, NewUser, UserDirectory};
pub use error::AuthError;
pub use extractor::{AdminOnly, Authenticated, OptionalAuth, UserOnly};
pub use issuer::{CredentialIssuer, TokenResult};
pub use protector::{KeyRingProtector, Protector, ProtectorError};
pub use roles::{AdminScheme, Role, RoleScheme, UserScheme};
pub use token::TokenSigner;
