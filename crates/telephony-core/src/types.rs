//! Wire types for the room service API
//!
//! Field names follow the LiveKit-compatible JSON wire format, so several
//! structs carry `room`/`rooms` names even though the rest of the stack
//! calls these objects sessions.

use serde::{Deserialize, Serialize};

/// A live call session as reported by the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub name: String,
    #[serde(default)]
    pub num_participants: u32,
    #[serde(default)]
    pub creation_time: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListSessionsRequest {
    /// Filter to specific session names; empty lists every session.
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListSessionsResponse {
    #[serde(default)]
    pub rooms: Vec<SessionInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteSessionRequest {
    pub room: String,
}

/// Dials the outbound SIP leg into a session through the configured trunk.
#[derive(Debug, Clone, Serialize)]
pub struct DialOutRequest {
    pub sip_trunk_id: String,
    pub sip_call_to: String,
    pub room_name: String,
    pub participant_identity: String,
    pub participant_name: String,
}

/// Forces the named conversational agent into a session, so a competing
/// deployment cannot pick the job up instead.
#[derive(Debug, Clone, Serialize)]
pub struct AgentDispatchRequest {
    pub agent_name: String,
    pub room: String,
}
