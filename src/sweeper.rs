// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Sweeper
//!
//! Background task that deletes token records past their expiry date.
//! Expired records already read as absent, so this only reclaims space;
//! authentication never depends on the sweeper having run.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken` for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::TokenStore;

/// Default interval between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

pub struct SessionSweeper {
    store: Arc<dyn TokenStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Session sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Session sweeper shutting down");
                return;
            }

            self.sweep_once().await;

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Session sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// Purge expired records once. Returns how many were removed.
    pub async fn sweep_once(&self) -> usize {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || store.purge_expired()).await;

        match result {
            Ok(Ok(0)) => {
                debug!("Session sweeper: nothing to purge");
                0
            }
            Ok(Ok(count)) => {
                info!(count, "Session sweeper: purged expired sessions");
                count
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Session sweeper: purge failed");
                0
            }
            Err(e) => {
                warn!(error = %e, "Session sweeper: purge task failed");
                0
            }
        }
    }
}
