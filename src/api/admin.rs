// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only API endpoints.
//!
//! These endpoints require the Admin role and provide:
//! - The caller's own privileged session
//! - Audit log queries

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::{AdminOnly, Role},
    error::ApiError,
    state::AppState,
    storage::{AuditError, AuditEvent},
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response for GET /v1/admin/session
#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSessionResponse {
    pub user_id: String,
    pub username: String,
    pub roles: Vec<Role>,
    pub scheme: String,
    /// Token id (`jti`)
    pub token_id: String,
    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

/// Query parameters for audit log queries.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// Day to read (YYYY-MM-DD format, default today).
    pub date: Option<String>,
    /// Filter by user ID.
    pub user_id: Option<String>,
    /// Filter by event type (e.g. `AUTH.SIGN_IN`).
    pub event_type: Option<String>,
    /// Maximum number of results (default 100).
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

/// Response for audit log queries.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    /// Audit events matching the query.
    pub events: Vec<AuditEvent>,
    /// Total count (before limit/offset).
    pub total: usize,
    /// Whether there are more results.
    pub has_more: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Describe the caller's admin session.
#[utoipa::path(
    get,
    path = "/v1/admin/session",
    tag = "Admin",
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Admin session", body = AdminSessionResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin role required"),
    )
)]
pub async fn get_admin_session(admin: AdminOnly) -> Json<AdminSessionResponse> {
    let user = admin.into_inner();
    Json(AdminSessionResponse {
        user_id: user.user_id,
        username: user.username,
        roles: user.roles,
        scheme: user.scheme,
        token_id: user.token_id,
        expires_at: user.expires_at,
    })
}

/// Query audit logs.
///
/// Reads one day of audit events, optionally filtered by user ID or event
/// type. Admin only.
#[utoipa::path(
    get,
    path = "/v1/admin/audit/events",
    tag = "Admin",
    params(AuditQueryParams),
    security(("session_cookie" = [])),
    responses(
        (status = 200, description = "Audit events", body = AuditLogResponse),
        (status = 400, description = "Invalid query parameters"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin role required"),
        (status = 503, description = "Audit log not configured"),
    )
)]
pub async fn query_audit_logs(
    admin: AdminOnly,
    Query(params): Query<AuditQueryParams>,
    State(state): State<AppState>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let audit_log = state
        .audit_log
        .clone()
        .ok_or_else(|| ApiError::unavailable("Audit log is not configured"))?;

    let date = params
        .date
        .clone()
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());
    NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request("Invalid date format. Use YYYY-MM-DD."))?;

    let mut events = audit_log.read_events(&date).map_err(|e| match e {
        AuditError::InvalidDate(_) => ApiError::bad_request("Invalid date format. Use YYYY-MM-DD."),
        other => {
            tracing::error!(error = %other, "Failed to read audit events");
            ApiError::internal("Failed to read audit events")
        }
    })?;

    if let Some(user_id) = &params.user_id {
        events.retain(|e| &e.user_id == user_id);
    }
    if let Some(event_type) = &params.event_type {
        events.retain(|e| e.event_type.code() == event_type);
    }

    let total = events.len();
    let limit = params.limit.unwrap_or(100).min(1000);
    let offset = params.offset.unwrap_or(0);
    let has_more = offset.saturating_add(limit) < total;
    let events: Vec<AuditEvent> = events.into_iter().skip(offset).take(limit).collect();

    tracing::info!(admin_id = %admin.user_id, date = %date, total, "Audit log queried");

    Ok(Json(AuditLogResponse {
        events,
        total,
        has_more,
    }))
}
