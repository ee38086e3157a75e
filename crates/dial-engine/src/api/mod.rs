//! # Management APIs
//!
//! In-process surfaces over the engine, mirroring the split between people
//! who set campaigns up and people who watch them run:
//!
//! - [`AdminApi`]: create, activate, pause and delete campaigns and their
//!   leads
//! - [`SupervisorApi`]: aggregate statistics and recent call records
//!
//! Both are cheap clones over the shared engine; any HTTP or UI layer is
//! expected to wrap these rather than reach into the database.

pub mod admin;
pub mod supervisor;

pub use admin::AdminApi;
pub use supervisor::{DashboardStats, SupervisorApi};
