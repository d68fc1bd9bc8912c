// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session Guard - Cookie Session Authentication Service
//!
//! Issues HS256 session tokens sealed under two layers of encryption,
//! transports them in cookies, and authenticates each inbound request for a
//! required role. One live session per user; signing in again supersedes it.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Credential issuer, request authenticator, collaborator traits
//! - `storage` - Session records (redb) and the audit log
//! - `sweeper` - Background purge of expired sessions

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
pub mod sweeper;
