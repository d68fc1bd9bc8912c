// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for authentication events.
//!
//! Sign-ins, rejected credentials, unconfirmed emails, sign-outs and
//! role-denied requests are appended to a daily JSONL file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StoragePaths;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum AuditEventType {
    #[serde(rename = "AUTH.SIGN_IN")]
    SignIn,
    #[serde(rename = "AUTH.SIGN_OUT")]
    SignOut,
    #[serde(rename = "AUTH.INVALID.PASSWORD")]
    InvalidPassword,
    #[serde(rename = "AUTH.EMAIL_NOT_CONFIRMED")]
    EmailNotConfirmed,
    #[serde(rename = "AUTH.UNAUTHORIZED_ACCESS")]
    UnauthorizedAccess,
}

impl AuditEventType {
    pub fn code(&self) -> &'static str {
        match self {
            AuditEventType::SignIn => "AUTH.SIGN_IN",
            AuditEventType::SignOut => "AUTH.SIGN_OUT",
            AuditEventType::InvalidPassword => "AUTH.INVALID.PASSWORD",
            AuditEventType::EmailNotConfirmed => "AUTH.EMAIL_NOT_CONFIRMED",
            AuditEventType::UnauthorizedAccess => "AUTH.UNAUTHORIZED_ACCESS",
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuditEvent {
    pub fn new(user_id: impl Into<String>, event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: user_id.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Sink for security-relevant events.
///
/// Fire-and-forget: implementations log their own failures and never
/// surface them to the authentication flow.
pub trait AuditHook: Send + Sync {
    fn record(&self, user_id: &str, event_type: AuditEventType, description: Option<&str>);
}

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid date: {0}")]
    InvalidDate(String),
}

/// Append-only JSONL audit log, one file per UTC day.
pub struct FileAuditLog {
    paths: StoragePaths,
    // Serializes appends so concurrent lines never interleave.
    write_lock: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            write_lock: Mutex::new(()),
        }
    }

    /// Append an event to its day's file.
    pub fn log(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.paths.audit_events_file(&date);

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }

    /// Read audit events for a specific date (`YYYY-MM-DD`).
    pub fn read_events(&self, date: &str) -> Result<Vec<AuditEvent>, AuditError> {
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| AuditError::InvalidDate(e.to_string()))?;

        let path = self.paths.audit_events_file(date);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(AuditError::from))
            .collect()
    }
}

impl AuditHook for FileAuditLog {
    fn record(&self, user_id: &str, event_type: AuditEventType, description: Option<&str>) {
        let mut event = AuditEvent::new(user_id, event_type);
        if let Some(description) = description {
            event = event.with_description(description);
        }
        if let Err(e) = self.log(&event) {
            tracing::error!(
                user_id = %user_id,
                event_type = event_type.code(),
                error = %e,
                "Failed to write audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileAuditLog) {
        let temp = TempDir::new().unwrap();
        let log = FileAuditLog::new(StoragePaths::new(temp.path()));
        (temp, log)
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    #[test]
    fn event_type_serializes_as_code() {
        let json = serde_json::to_string(&AuditEventType::InvalidPassword).unwrap();
        assert_eq!(json, r#""AUTH.INVALID.PASSWORD""#);
        assert_eq!(AuditEventType::SignIn.code(), "AUTH.SIGN_IN");
    }

    #[test]
    fn record_and_read_events() {
        let (_temp, log) = setup();

        log.record("user_1", AuditEventType::SignIn, None);
        log.record(
            "user_2",
            AuditEventType::UnauthorizedAccess,
            Some("/v1/admin/session"),
        );

        let events = log.read_events(&today()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::SignIn);
        assert_eq!(events[1].user_id, "user_2");
        assert_eq!(events[1].description.as_deref(), Some("/v1/admin/session"));
    }

    #[test]
    fn missing_day_reads_empty() {
        let (_temp, log) = setup();
        assert!(log.read_events("2001-01-01").unwrap().is_empty());
    }

    #[test]
    fn invalid_date_is_rejected() {
        let (_temp, log) = setup();
        assert!(matches!(
            log.read_events("../../etc"),
            Err(AuditError::InvalidDate(_))
        ));
    }
}
