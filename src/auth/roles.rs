// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles and the authentication scheme bound to each.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// Membership is exact: the authenticator asks the directory whether the
/// user holds the required role, there is no implied hierarchy.
///
/// - `Admin` - Operators; gets the short privileged token window
/// - `User` - Regular signed-in account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    /// Every known role.
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];

    /// Parse role from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "user" => Some(Role::User),
            _ => None,
        }
    }

    /// Claim value written into signed tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
        }
    }

    /// Name of the authentication scheme that requires this role.
    pub fn scheme_name(&self) -> &'static str {
        match self {
            Role::Admin => "AdminScheme",
            Role::User => "UserScheme",
        }
    }

    /// Whether holding this role shortens the signed token lifetime.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time binding of an extractor to the role it requires.
pub trait RoleScheme: Send + Sync + 'static {
    const ROLE: Role;
}

/// Scheme requiring [`Role::Admin`].
pub struct AdminScheme;

/// Scheme requiring [`Role::User`].
pub struct UserScheme;

impl RoleScheme for AdminScheme {
    const ROLE: Role = Role::Admin;
}

impl RoleScheme for UserScheme {
    const ROLE: Role = Role::User;
}
