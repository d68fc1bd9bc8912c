// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use session_guard::{
    api::router,
    auth::{AuthContext, CookiePolicy, InMemoryDirectory, KeyRingProtector},
    config::{AppConfig, LogFormat},
    state::AppState,
    storage::{FileAuditLog, RedbTokenStore, StoragePaths},
    sweeper::SessionSweeper,
};

/// How long in-flight requests may finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    // Storage
    let paths = StoragePaths::new(&config.data_dir);
    std::fs::create_dir_all(paths.root()).expect("Failed to create data directory");
    let store = Arc::new(
        RedbTokenStore::open(&paths.sessions_db()).expect("Failed to open session store"),
    );
    let audit_log = Arc::new(FileAuditLog::new(paths.clone()));

    // Collaborators
    let directory = match &config.users_file {
        Some(path) => {
            InMemoryDirectory::from_json_file(path).expect("Failed to load users file")
        }
        None => {
            tracing::warn!("USERS_FILE not set; user directory starts empty");
            InMemoryDirectory::new()
        }
    };
    let protector =
        KeyRingProtector::new(config.master_key.0.clone()).expect("Invalid master key");

    let auth = Arc::new(AuthContext::new(
        config.session.clone(),
        Arc::new(directory),
        store.clone(),
        Arc::new(protector),
        audit_log.clone(),
    ));
    let state = AppState::new(
        auth,
        CookiePolicy {
            secure: config.cookie_secure,
        },
        config.client_id.clone(),
    )
    .with_audit_log(audit_log);
    let app = router(state);

    // Background tasks
    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(
        SessionSweeper::new(store)
            .with_interval(config.sweep_interval)
            .run(shutdown.clone()),
    );

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Failed to parse bind address");

    match (&config.tls_cert_path, &config.tls_key_path) {
        (Some(cert), Some(key)) => {
            // Install the ring crypto provider for rustls (must be done before any TLS operations)
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");

            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .expect("Failed to load TLS certificate and key");

            let handle = axum_server::Handle::new();
            tokio::spawn({
                let handle = handle.clone();
                let shutdown = shutdown.clone();
                async move {
                    wait_for_signal(shutdown).await;
                    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
                }
            });

            tracing::info!(%addr, "Session Guard listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        (None, None) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind listener");

            tracing::info!(%addr, "Session Guard listening on http (docs at /docs)");
            axum::serve(listener, app)
                .with_graceful_shutdown(wait_for_signal(shutdown.clone()))
                .await
                .expect("HTTP server failed");
        }
        _ => {
            tracing::error!("TLS_CERT_PATH and TLS_KEY_PATH must be set together");
            std::process::exit(1);
        }
    }

    shutdown.cancel();
    let _ = sweeper.await;
    tracing::info!("Session Guard stopped");
}

/// Resolve on Ctrl-C, cancelling background tasks.
async fn wait_for_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
