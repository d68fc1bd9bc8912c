// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{auth::cookies::ACCESS_COOKIE, auth::Role, state::AppState, storage::AuditEvent};

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/status", get(auth::status))
        .route("/users/me", get(users::get_current_user))
        .route("/admin/session", get(admin::get_admin_session))
        .route("/admin/audit/events", get(admin::query_audit_logs))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
}

/// Registers the session cookie as an API key scheme.
struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(ACCESS_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::logout,
        auth::status,
        users::get_current_user,
        admin::get_admin_session,
        admin::query_audit_logs,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            Role,
            AuditEvent,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::LogoutResponse,
            auth::SessionStatusResponse,
            users::UserMeResponse,
            admin::AdminSessionResponse,
            admin::AuditLogResponse,
            health::ReadyResponse,
            health::HealthResponse
        )
    ),
    modifiers(&SessionCookieAddon),
    tags(
        (name = "Auth", description = "Sign-in and sign-out"),
        (name = "Users", description = "Current user"),
        (name = "Admin", description = "Admin-only operations"),
        (name = "Health", description = "Liveness and readiness")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::context::testing::{fixture, Fixture, PASSWORD};
    use crate::auth::CookiePolicy;
    use crate::storage::{AuditEventType, AuditHook, FileAuditLog, StoragePaths};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(f: &Fixture) -> Router {
        router(AppState::new(f.ctx.clone(), CookiePolicy { secure: false }, "web"))
    }

    fn login_request(email: &str, password: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::json!({ "email": email, "password": password }).to_string(),
            ))
            .unwrap()
    }

    /// `name=value` pairs from every `Set-Cookie` header.
    fn cookie_pairs(response: &Response) -> String {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn login_sets_cookies_and_me_reads_them() {
        let f = fixture();
        let app = app(&f);

        let response = app
            .clone()
            .oneshot(login_request("ada@example.com", PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 3);
        let cookie = cookie_pairs(&response);
        let body = json_body(response).await;
        assert_eq!(body["succeeded"], true);
        assert_eq!(body["username"], "ada");

        let response = app.oneshot(get("/v1/users/me", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["username"], "ada");
        assert_eq!(body["scheme"], "UserScheme");
    }

    #[tokio::test]
    async fn bad_credentials_are_401() {
        let f = fixture();
        let response = app(&f)
            .oneshot(login_request("ada@example.com", "bad"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(json_body(response).await["error_code"], "invalid_credentials");
    }

    #[tokio::test]
    async fn unconfirmed_email_is_soft_failure() {
        let f = fixture();
        let response = app(&f)
            .oneshot(login_request("pending@example.com", PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        let body = json_body(response).await;
        assert_eq!(body["succeeded"], false);
        assert_eq!(body["requires_confirm_email"], true);
    }

    #[tokio::test]
    async fn me_without_cookies_is_401() {
        let f = fixture();
        let response = app(&f)
            .oneshot(Request::builder().uri("/v1/users/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_route_forbids_plain_user() {
        let f = fixture();
        let app = app(&f);
        let login = app
            .clone()
            .oneshot(login_request("ada@example.com", PASSWORD))
            .await
            .unwrap();
        let cookie = cookie_pairs(&login);

        let response = app.oneshot(get("/v1/admin/session", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn logout_clears_cookies_and_revokes() {
        let f = fixture();
        let app = app(&f);
        let login = app
            .clone()
            .oneshot(login_request("ada@example.com", PASSWORD))
            .await
            .unwrap();
        let cookie = cookie_pairs(&login);

        let logout = Request::builder()
            .method("POST")
            .uri("/v1/auth/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(logout).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cleared: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(cleared.len(), 3);
        assert!(cleared.iter().all(|v| v.to_str().unwrap().contains("Max-Age=0")));

        let response = app.oneshot(get("/v1/users/me", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn logout_without_session_still_succeeds() {
        let f = fixture();
        let response = app(&f)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["signed_out"], true);
    }

    #[tokio::test]
    async fn status_reports_anonymous() {
        let f = fixture();
        let response = app(&f).oneshot(get("/v1/auth/status", "sg_access=x")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["authenticated"], false);
    }

    #[tokio::test]
    async fn status_reports_admin_session_without_audit() {
        let f = fixture();
        let app = app(&f);
        let login = app
            .clone()
            .oneshot(login_request("root@example.com", PASSWORD))
            .await
            .unwrap();
        let cookie = cookie_pairs(&login);

        let response = app.oneshot(get("/v1/auth/status", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["username"], "root");
        assert!(f.audit.of_type(AuditEventType::UnauthorizedAccess).is_empty());
    }

    #[tokio::test]
    async fn admin_can_query_audit_log() {
        let f = fixture();
        let temp = tempfile::TempDir::new().unwrap();
        let audit_log = Arc::new(FileAuditLog::new(StoragePaths::new(temp.path())));
        audit_log.record(&f.ada_id, AuditEventType::SignIn, None);

        let app = router(
            AppState::new(f.ctx.clone(), CookiePolicy { secure: false }, "web")
                .with_audit_log(audit_log),
        );
        let login = app
            .clone()
            .oneshot(login_request("root@example.com", PASSWORD))
            .await
            .unwrap();
        let cookie = cookie_pairs(&login);

        let response = app
            .clone()
            .oneshot(get("/v1/admin/audit/events?event_type=AUTH.SIGN_IN", &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["events"][0]["user_id"], f.ada_id.as_str());

        let response = app
            .clone()
            .oneshot(get(
                &format!("/v1/admin/audit/events?offset={}", usize::MAX),
                &cookie,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["has_more"], false);
        assert_eq!(body["events"].as_array().unwrap().len(), 0);

        let response = app
            .oneshot(get("/v1/admin/audit/events?date=yesterday", &cookie))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_ok() {
        let f = fixture();
        let response = app(&f)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["checks"]["token_store"], "ok");
    }
}
