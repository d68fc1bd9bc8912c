// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthContext, CookiePolicy};
use crate::storage::FileAuditLog;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthContext>,
    pub cookies: CookiePolicy,
    /// Client id recorded when a login names none.
    pub client_id: String,
    /// Readable audit log for the admin query endpoint.
    pub audit_log: Option<Arc<FileAuditLog>>,
}

impl AppState {
    pub fn new(auth: Arc<AuthContext>, cookies: CookiePolicy, client_id: impl Into<String>) -> Self {
        Self {
            auth,
            cookies,
            client_id: client_id.into(),
            audit_log: None,
        }
    }

    pub fn with_audit_log(mut self, audit_log: Arc<FileAuditLog>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }
}
