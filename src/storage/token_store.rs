// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token records backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `session_tokens`: user_id → serialized TokenRecord
//!
//! Keying the table by owner makes "one live record per user" structural:
//! `put` removes the previous record and inserts the new one inside a single
//! write transaction. redb serializes write transactions and readers only see
//! committed snapshots, so two logins racing for the same user leave exactly
//! one record and a concurrent `get` sees the old or the new one, never both
//! or neither.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

// =============================================================================
// Table Definitions
// =============================================================================

/// user_id → serialized TokenRecord (JSON bytes).
const SESSION_TOKENS: TableDefinition<&str, &[u8]> = TableDefinition::new("session_tokens");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Record
// =============================================================================

/// The single live authentication session of a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRecord {
    /// Surrogate key.
    pub id: String,
    /// Owner of the session.
    pub user_id: String,
    /// Owner's username when the session was issued.
    pub username: String,
    /// Client that requested the session.
    pub client_id: String,
    /// Opaque random refresh value.
    pub value: String,
    /// Key name sealing the signed token (inner cookie layer).
    pub encryption_key_jwt: String,
    /// Key name sealing the refresh value.
    pub encryption_key_refresh_token: String,
    pub expiry_date: DateTime<Utc>,
    pub date_created: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Whether the session window has passed at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry_date <= now
    }
}

// =============================================================================
// TokenStore
// =============================================================================

/// Durable store holding at most one live [`TokenRecord`] per user.
///
/// Reads treat expired records as absent.
pub trait TokenStore: Send + Sync {
    /// Replace any record of `record.user_id` with `record`, atomically.
    fn put(&self, record: &TokenRecord) -> StoreResult<()>;

    /// Live record of a user.
    fn get(&self, user_id: &str) -> StoreResult<Option<TokenRecord>>;

    /// Live record of a user whose stored owner username equals `username`.
    fn get_for_username(&self, user_id: &str, username: &str) -> StoreResult<Option<TokenRecord>> {
        Ok(self.get(user_id)?.filter(|r| r.username == username))
    }

    /// Delete every record of a user. Returns whether anything was removed.
    fn remove_all(&self, user_id: &str) -> StoreResult<bool>;

    /// Whether a live record exists for the user.
    fn exists(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.get(user_id)?.is_some())
    }

    /// Delete every expired record. Returns how many were removed.
    fn purge_expired(&self) -> StoreResult<usize>;
}

/// [`TokenStore`] in an embedded redb file.
pub struct RedbTokenStore {
    db: Database,
}

impl RedbTokenStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSION_TOKENS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    fn read_raw(&self, user_id: &str) -> StoreResult<Option<TokenRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SESSION_TOKENS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

impl TokenStore for RedbTokenStore {
    fn put(&self, record: &TokenRecord) -> StoreResult<()> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(SESSION_TOKENS)?;
            let superseded = table.remove(record.user_id.as_str())?.is_some();
            table.insert(record.user_id.as_str(), json.as_slice())?;
            if superseded {
                tracing::debug!(user_id = %record.user_id, "Superseded previous session record");
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, user_id: &str) -> StoreResult<Option<TokenRecord>> {
        let now = Utc::now();
        Ok(self.read_raw(user_id)?.filter(|r| !r.is_expired_at(now)))
    }

    fn remove_all(&self, user_id: &str) -> StoreResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(SESSION_TOKENS)?;
            let removed = table.remove(user_id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn purge_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(SESSION_TOKENS)?;

            let mut expired = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                match serde_json::from_slice::<TokenRecord>(value.value()) {
                    Ok(record) if record.is_expired_at(now) => {
                        expired.push(key.value().to_string());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(user_id = %key.value(), error = %e, "Dropping unreadable session record");
                        expired.push(key.value().to_string());
                    }
                }
            }

            for user_id in &expired {
                table.remove(user_id.as_str())?;
            }
            expired.len()
        };
        write_txn.commit()?;
        Ok(purged)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn temp_store() -> (RedbTokenStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbTokenStore::open(&dir.path().join("sessions.redb")).unwrap();
        (store, dir)
    }

    fn sample_record(user_id: &str, value: &str) -> TokenRecord {
        let now = Utc::now();
        TokenRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            username: format!("{user_id}-name"),
            client_id: "web".to_string(),
            value: value.to_string(),
            encryption_key_jwt: format!("kjwt-{value}"),
            encryption_key_refresh_token: format!("kref-{value}"),
            expiry_date: now + Duration::days(7),
            date_created: now,
            last_modified_date: None,
        }
    }

    #[test]
    fn put_and_get_record() {
        let (store, _dir) = temp_store();
        let record = sample_record("user-1", "v1");
        store.put(&record).unwrap();

        assert_eq!(store.get("user-1").unwrap(), Some(record));
        assert!(store.exists("user-1").unwrap());
        assert!(store.get("user-2").unwrap().is_none());
    }

    #[test]
    fn put_supersedes_previous_record() {
        let (store, _dir) = temp_store();
        store.put(&sample_record("user-1", "first")).unwrap();
        store.put(&sample_record("user-1", "second")).unwrap();

        let live = store.get("user-1").unwrap().unwrap();
        assert_eq!(live.value, "second");
        assert_eq!(live.encryption_key_jwt, "kjwt-second");
    }

    #[test]
    fn get_for_username_requires_matching_owner() {
        let (store, _dir) = temp_store();
        store.put(&sample_record("user-1", "v1")).unwrap();

        assert!(store.get_for_username("user-1", "user-1-name").unwrap().is_some());
        assert!(store.get_for_username("user-1", "someone-else").unwrap().is_none());
    }

    #[test]
    fn expired_record_reads_as_absent() {
        let (store, _dir) = temp_store();
        let mut record = sample_record("user-1", "v1");
        record.expiry_date = Utc::now() - Duration::seconds(1);
        store.put(&record).unwrap();

        assert!(store.get("user-1").unwrap().is_none());
        assert!(!store.exists("user-1").unwrap());
    }

    #[test]
    fn remove_all_reports_whether_anything_was_removed() {
        let (store, _dir) = temp_store();
        store.put(&sample_record("user-1", "v1")).unwrap();

        assert!(store.remove_all("user-1").unwrap());
        assert!(!store.exists("user-1").unwrap());
        assert!(!store.remove_all("user-1").unwrap());
    }

    #[test]
    fn purge_expired_removes_only_stale_records() {
        let (store, _dir) = temp_store();
        let mut stale = sample_record("user-stale", "old");
        stale.expiry_date = Utc::now() - Duration::minutes(5);
        store.put(&stale).unwrap();
        store.put(&sample_record("user-live", "new")).unwrap();

        assert_eq!(store.purge_expired().unwrap(), 1);
        assert!(store.exists("user-live").unwrap());
        assert!(!store.remove_all("user-stale").unwrap());
    }

    #[test]
    fn racing_puts_leave_exactly_one_record() {
        let (store, _dir) = temp_store();
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store.put(&sample_record("user-race", &format!("v{i}"))).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let live = store.get("user-race").unwrap().unwrap();
        assert!(live.value.starts_with('v'));
        assert!(store.remove_all("user-race").unwrap());
        assert!(!store.exists("user-race").unwrap());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.redb");
        {
            let store = RedbTokenStore::open(&path).unwrap();
            store.put(&sample_record("user-1", "durable")).unwrap();
        }
        let store = RedbTokenStore::open(&path).unwrap();
        assert_eq!(store.get("user-1").unwrap().unwrap().value, "durable");
    }
}
