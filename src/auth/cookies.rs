// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transport cookies carrying the session.
//!
//! | Cookie | Content |
//! |--------|---------|
//! | `sg_access` | app-key( k_jwt( signed token ) ) |
//! | `sg_uid` | app-key( user id ) |
//! | `sg_user` | username, percent-encoded; cross-check only |

use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, Utc};

pub const ACCESS_COOKIE: &str = "sg_access";
pub const USER_ID_COOKIE: &str = "sg_uid";
pub const USERNAME_COOKIE: &str = "sg_user";

/// Upper bound for a sealed cookie value.
const MAX_SEALED_LEN: usize = 4096;

/// The three session values as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportCookies {
    pub access: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl TransportCookies {
    /// Collect the session cookies from every `Cookie` header.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = Self::default();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else {
                continue;
            };
            for part in raw.split(';') {
                let Some((name, value)) = part.trim().split_once('=') else {
                    continue;
                };
                let value = value.trim().trim_matches('"').to_string();
                match name.trim() {
                    ACCESS_COOKIE => cookies.access = Some(value),
                    USER_ID_COOKIE => cookies.user_id = Some(value),
                    USERNAME_COOKIE => {
                        cookies.username = urlencoding::decode(&value).ok().map(|v| v.into_owned())
                    }
                    _ => {}
                }
            }
        }
        cookies
    }
}

/// Whether `value` has the shape of a sealed value (non-empty base64url).
pub fn is_sealed_shape(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_SEALED_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Cookie attributes shared by every session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    /// Emit `Secure` (disable only for plain-HTTP development).
    pub secure: bool,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self { secure: true }
    }
}

impl CookiePolicy {
    /// `Set-Cookie` value for a session cookie expiring at `expires`.
    pub fn build(&self, name: &str, value: &str, expires: DateTime<Utc>) -> String {
        let max_age = (expires - Utc::now()).num_seconds().max(0);
        format!(
            "{name}={value}; Path=/; Expires={expires}; Max-Age={max_age}; HttpOnly; SameSite=Strict{secure}",
            expires = http_date(expires),
            secure = self.secure_attr(),
        )
    }

    /// `Set-Cookie` value that deletes a session cookie.
    pub fn build_clear(&self, name: &str) -> String {
        format!(
            "{name}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly; SameSite=Strict{secure}",
            secure = self.secure_attr(),
        )
    }

    /// The three `Set-Cookie` values establishing a session.
    pub fn session_cookies(
        &self,
        access: &str,
        user_id: &str,
        username: &str,
        expires: DateTime<Utc>,
    ) -> Vec<HeaderValue> {
        [
            self.build(ACCESS_COOKIE, access, expires),
            self.build(USER_ID_COOKIE, user_id, expires),
            self.build(USERNAME_COOKIE, &urlencoding::encode(username), expires),
        ]
        .into_iter()
        .filter_map(|c| HeaderValue::from_str(&c).ok())
        .collect()
    }

    /// The three `Set-Cookie` values ending a session.
    pub fn clear_cookies(&self) -> Vec<HeaderValue> {
        [ACCESS_COOKIE, USER_ID_COOKIE, USERNAME_COOKIE]
            .into_iter()
            .filter_map(|name| HeaderValue::from_str(&self.build_clear(name)).ok())
            .collect()
    }

    fn secure_attr(&self) -> &'static str {
        if self.secure {
            "; Secure"
        } else {
            ""
        }
    }
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
