//! # Dial-Engine - Campaign Dialing Orchestration for Autodial
//!
//! This crate is the control loop of the autodial stack: it works through
//! the leads of active survey campaigns one call at a time, launches each
//! call through the external telephony control plane, watches the session
//! until it can classify the outcome, and schedules bounded retries for the
//! attempts that did not reach a completed survey.
//!
//! ## Architecture
//!
//! The engine follows a layered architecture:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             DialerServer                │
//! ├─────────────────────────────────────────┤
//! │     AdminApi      │    SupervisorApi    │
//! ├─────────────────────────────────────────┤
//! │             DialerEngine                │
//! │  Dispatch Loop │ Watcher │ Retry Policy │
//! ├─────────────────────────────────────────┤
//! │    Database    │   Call Launcher        │
//! ├─────────────────────────────────────────┤
//! │      Telephony Control Plane (HTTP)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Single-Flight Dialing**: exactly one call attempt in flight across
//!   the whole process, held as an explicit permit rather than an accident
//!   of sequential code
//! - **Debounced Completion Detection**: session disappearance is only
//!   believed after consecutive confirmations, because the control plane
//!   offers no reliable completion callback
//! - **Bounded Retries**: failed, unreached and incomplete calls re-enter
//!   the pool with a per-campaign back-off until the retry budget is spent
//! - **Crash Recovery**: leads stranded mid-call by a restart are
//!   re-admitted on startup instead of staying stuck
//! - **Shared-Store Discipline**: terminal statuses written by the remote
//!   conversational agent are authoritative and never overwritten
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use autodial_dial_engine::prelude::*;
//!
//! # async fn example(control_plane: Arc<dyn SessionControl>) -> Result<()> {
//! let config = DialerConfig::default();
//!
//! let mut server = DialerServerBuilder::new()
//!     .with_config(config)
//!     .with_control_plane(control_plane)
//!     .with_in_memory_database()
//!     .build()
//!     .await?;
//!
//! server.start().await?;
//!
//! // Seed work through the admin API
//! let admin = server.admin_api();
//! let campaign = admin
//!     .create_campaign(
//!         NewCampaign {
//!             name: "post-install-survey".to_string(),
//!             max_retries: 3,
//!             retry_interval_secs: 180,
//!         },
//!         vec![NewLead {
//!             phone_number: "+34600111222".to_string(),
//!             display_name: "Alice Example".to_string(),
//!         }],
//!     )
//!     .await?;
//! admin.activate_campaign(campaign.id).await?;
//!
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod orchestrator;
pub mod prelude;
pub mod server;

// Re-export the main engine types
pub use config::{DatabaseConfig, DialerConfig, GeneralConfig, WatcherConfig};
pub use error::{DialerError, Result};
pub use orchestrator::DialerEngine;
pub use server::{DialerServer, DialerServerBuilder};

// Re-export the control plane seam so embedders need one import
pub use autodial_telephony_core::{ControlPlaneClient, ControlPlaneConfig, SessionControl};
