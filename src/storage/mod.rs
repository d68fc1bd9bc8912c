// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Persistent Storage
//!
//! Durable state lives under the data directory:
//!
//! - `token_store` - one live session record per user (redb)
//! - `audit` - daily JSONL audit log

pub mod audit;
pub mod paths;
pub mod token_store;

pub use audit::{AuditError, AuditEvent, AuditEventType, AuditHook, FileAuditLog};
pub use paths::StoragePaths;
pub use token_store::{RedbTokenStore, StoreError, StoreResult, TokenRecord, TokenStore};
