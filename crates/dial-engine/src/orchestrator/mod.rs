//! # Campaign Dialing Orchestration Module
//!
//! This module drives the end-to-end lifecycle of outbound survey calls,
//! coordinating lead selection, session launch, completion detection and
//! retry scheduling on top of the shared campaign database and the external
//! telephony control plane.
//!
//! ## Overview
//!
//! The orchestrator is deliberately serial: one lead is in flight at any
//! moment across the whole process. That trades throughput for trunk-capacity
//! safety and makes every failure attributable to exactly one attempt. The
//! in-flight attempt is represented by an explicit permit, so the invariant
//! is enforced by a token rather than by the accident of sequential code.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Dispatch Loop                        │
//! │  active campaigns → eligible lead → claim → attempt      │
//! └───────────┬──────────────────────────────────────────────┘
//!             │ one claimed lead + one fresh call record
//! ┌───────────▼───────────┐   ┌──────────────────────────────┐
//! │     Call Launcher     │   │      Completion Watcher      │
//! │  session → agent →    │──▶│  poll record (authoritative) │
//! │  warm-up → dial-out   │   │  poll session (debounced)    │
//! └───────────────────────┘   └───────────┬──────────────────┘
//!                                         │ terminal status
//!                             ┌───────────▼──────────────────┐
//!                             │       Retry Scheduler        │
//!                             │  status → lead outcome +     │
//!                             │  bounded back-off schedule   │
//!                             └──────────────────────────────┘
//! ```
//!
//! ## Key Behaviors
//!
//! - **Authoritative record first**: a terminal status written by the remote
//!   agent ends the watch immediately; session polling only matters while
//!   the record is still `initiated`.
//! - **Debounced absence**: a single "session gone" observation is treated
//!   as noise; absence acts only after consecutive confirmations.
//! - **Synthesized outcomes are reported, never dropped**: a watch that
//!   times out or confirms a dead session resolves to `unreached` and the
//!   status is written back (conditionally) so no reader ever sees a call
//!   stuck in `initiated`.
//! - **Per-lead failure isolation**: a trunk rejection marks that lead
//!   `failed` with back-off and the loop moves on; an unexpected loop-level
//!   error pauses the loop briefly and resumes it.
//!
//! ## Components
//!
//! - [`core`]: the [`DialerEngine`] tying configuration, stores, control
//!   plane and the single-flight permit together
//! - [`dispatcher`]: the always-running dispatch loop (one lead at a time)
//! - [`launcher`]: session creation, agent dispatch and dial-out
//! - [`watcher`]: debounced, polling completion detection
//! - [`retry`]: terminal-status classification and back-off scheduling

pub mod core;
pub mod dispatcher;
pub mod launcher;
pub mod retry;
pub mod watcher;

pub use self::core::DialerEngine;
pub use launcher::CallLauncher;
pub use retry::{LeadOutcome, RetryPolicy};
pub use watcher::CompletionWatcher;
