//! # Dialer Server Manager
//!
//! High-level lifecycle wrapper around the engine: builds it, recovers
//! leads stranded by the previous process, runs the dispatch loop and a
//! periodic status monitor as background tasks, and shuts both down through
//! a shared cancellation token checked at every suspension point.
//!
//! ## Server Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             DialerServer                │
//! ├─────────────────────────────────────────┤
//! │     AdminApi      │    SupervisorApi    │
//! ├─────────────────────────────────────────┤
//! │             DialerEngine                │
//! ├─────────────────────────────────────────┤
//! │   Database │ Watcher │ Call Launcher    │
//! ├─────────────────────────────────────────┤
//! │      Telephony Control Plane (HTTP)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use autodial_dial_engine::prelude::*;
//!
//! # async fn example(control_plane: Arc<dyn SessionControl>) -> Result<()> {
//! let mut server = DialerServerBuilder::new()
//!     .with_config(DialerConfig::default())
//!     .with_control_plane(control_plane)
//!     .with_database_path("/var/lib/autodial/campaigns.db".to_string())
//!     .build()
//!     .await?;
//!
//! server.start().await?;
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use autodial_telephony_core::{ControlPlaneClient, SessionControl};

use crate::api::{AdminApi, SupervisorApi};
use crate::config::DialerConfig;
use crate::error::{DialerError, Result};
use crate::orchestrator::DialerEngine;

/// A complete dialer server that manages engine lifecycle and provides APIs.
pub struct DialerServer {
    /// The core dialing engine
    engine: Arc<DialerEngine>,

    /// Admin API for campaign administration
    admin_api: AdminApi,

    /// Supervisor API for monitoring
    supervisor_api: SupervisorApi,

    /// Server configuration
    config: DialerConfig,

    /// Cancellation token shared with every background task
    shutdown: CancellationToken,

    /// Optional handle to the dispatch loop task
    dispatch_handle: Option<JoinHandle<()>>,

    /// Optional handle to the monitoring task
    monitor_handle: Option<JoinHandle<()>>,
}

impl DialerServer {
    /// Create a new server over an explicit control plane implementation.
    pub async fn new(
        config: DialerConfig,
        telephony: Arc<dyn SessionControl>,
    ) -> Result<Self> {
        let engine = DialerEngine::new(config.clone(), telephony).await?;

        let admin_api = AdminApi::new(engine.clone());
        let supervisor_api = SupervisorApi::new(engine.clone());

        Ok(Self {
            engine,
            admin_api,
            supervisor_api,
            config,
            shutdown: CancellationToken::new(),
            dispatch_handle: None,
            monitor_handle: None,
        })
    }

    /// Start background processing: stalled-lead recovery, then the
    /// dispatch loop and the status monitor.
    pub async fn start(&mut self) -> Result<()> {
        let recovered = self.engine.recover_stalled_leads().await?;
        if recovered > 0 {
            info!("♻️ Recovered {recovered} leads stranded by a previous run");
        }

        let engine = self.engine.clone();
        let shutdown = self.shutdown.clone();
        self.dispatch_handle = Some(tokio::spawn(async move {
            engine.run_dispatch_loop(shutdown).await;
        }));

        let supervisor_api = self.supervisor_api.clone();
        let interval = self.config.general.monitor_interval;
        let shutdown = self.shutdown.clone();
        self.monitor_handle = Some(tokio::spawn(async move {
            Self::monitor_loop(supervisor_api, interval, shutdown).await;
        }));

        info!("✅ Dialer server started");
        Ok(())
    }

    /// Stop the server gracefully. Both loops observe the token at their
    /// next suspension point; an attempt interrupted mid-watch is picked up
    /// by recovery on the next start.
    pub async fn stop(&mut self) -> Result<()> {
        info!("🛑 Stopping dialer server...");
        self.shutdown.cancel();

        if let Some(handle) = self.dispatch_handle.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.monitor_handle.take() {
            let _ = handle.await;
        }

        info!("✅ Dialer server stopped");
        Ok(())
    }

    /// Run until stopped, logging a heartbeat.
    pub async fn run(&self) -> Result<()> {
        info!("📞 Dialer server is running");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_secs(60)) => {}
            }

            match self.supervisor_api.get_stats().await {
                Ok(stats) => info!(
                    "📊 Stats - Calls: {}, Completed: {}, Pending leads: {}",
                    stats.total_calls, stats.completed_calls, stats.pending_leads
                ),
                Err(e) => error!("Failed to read stats: {e}"),
            }
        }
    }

    /// Get a reference to the admin API
    pub fn admin_api(&self) -> &AdminApi {
        &self.admin_api
    }

    /// Get a reference to the supervisor API
    pub fn supervisor_api(&self) -> &SupervisorApi {
        &self.supervisor_api
    }

    /// Get a reference to the engine (for advanced usage)
    pub fn engine(&self) -> &Arc<DialerEngine> {
        &self.engine
    }

    /// Internal monitoring loop
    async fn monitor_loop(
        supervisor_api: SupervisorApi,
        interval: Duration,
        shutdown: CancellationToken,
    ) {
        info!("👀 Starting status monitor");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match supervisor_api.get_stats().await {
                Ok(stats) => {
                    info!("📊 === Dialer Status Update ===");
                    info!(
                        "  📞 Calls: {} total, {} completed",
                        stats.total_calls, stats.completed_calls
                    );
                    info!("  📥 Pending leads: {}", stats.pending_leads);
                    if let Some(overall) = stats.avg_score_overall {
                        info!("  ⭐ Average survey score: {overall:.1}");
                    }
                }
                Err(e) => error!("Failed to get dialer stats: {e}"),
            }
        }

        info!("Status monitor stopped");
    }
}

/// Builder for DialerServer with fluent API
pub struct DialerServerBuilder {
    config: Option<DialerConfig>,
    telephony: Option<Arc<dyn SessionControl>>,
    database_path: Option<Option<String>>,
}

impl DialerServerBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: None,
            telephony: None,
            database_path: None,
        }
    }

    /// Set the configuration
    pub fn with_config(mut self, config: DialerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a specific control plane implementation instead of the HTTP
    /// client built from configuration. Tests use this for fakes.
    pub fn with_control_plane(mut self, telephony: Arc<dyn SessionControl>) -> Self {
        self.telephony = Some(telephony);
        self
    }

    /// Set the database path
    pub fn with_database_path(mut self, path: String) -> Self {
        self.database_path = Some(Some(path));
        self
    }

    /// Use an in-memory database
    pub fn with_in_memory_database(mut self) -> Self {
        self.database_path = Some(None);
        self
    }

    /// Build the server
    pub async fn build(self) -> Result<DialerServer> {
        let mut config = self.config.ok_or_else(|| {
            DialerError::Configuration("Configuration not provided".to_string())
        })?;
        if let Some(database_path) = self.database_path {
            config.database.database_path = database_path;
        }

        let telephony = match self.telephony {
            Some(telephony) => telephony,
            None => {
                Arc::new(ControlPlaneClient::new(config.telephony.clone())?)
                    as Arc<dyn SessionControl>
            }
        };

        DialerServer::new(config, telephony).await
    }
}

impl Default for DialerServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
