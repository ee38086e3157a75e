//! Convenient re-exports for common usage patterns

pub use crate::api::{AdminApi, DashboardStats, SupervisorApi};
pub use crate::config::{DatabaseConfig, DialerConfig, GeneralConfig, WatcherConfig};
pub use crate::database::{
    Campaign, CampaignStatus, CallRecord, CallRecordStatus, DatabaseManager, Lead, LeadStatus,
    NewCampaign, NewLead, SurveyUpdate,
};
pub use crate::error::{DialerError, Result};
pub use crate::orchestrator::{CallLauncher, CompletionWatcher, DialerEngine, RetryPolicy};
pub use crate::server::{DialerServer, DialerServerBuilder};

pub use autodial_telephony_core::{
    ControlPlaneClient, ControlPlaneConfig, SessionControl, TelephonyError,
};
