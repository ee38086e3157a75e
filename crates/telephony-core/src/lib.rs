//! # Telephony-Core - Control Plane Access for Autodial
//!
//! This crate provides the contract between the dialing engine and the
//! external telephony control plane: ephemeral call sessions ("rooms") are
//! created per call attempt, an outbound SIP leg is dialed into them, and a
//! remote conversational agent is dispatched to join. The engine never talks
//! to the control plane directly; it goes through the [`SessionControl`]
//! trait so tests and alternative providers can swap the transport out.
//!
//! The production implementation, [`ControlPlaneClient`], speaks the
//! Twirp-style HTTP API of a LiveKit-compatible room service and mints a
//! short-lived HS256 access token per request.

pub mod client;
pub mod control;
pub mod error;
pub mod token;
pub mod types;

pub use client::{ControlPlaneClient, ControlPlaneConfig};
pub use control::SessionControl;
pub use error::{Result, TelephonyError};
pub use token::AccessToken;
pub use types::SessionInfo;
