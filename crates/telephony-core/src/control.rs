//! The control plane contract consumed by the dialing engine

use async_trait::async_trait;

use crate::error::Result;

/// Operations the dialing engine needs from the telephony control plane.
///
/// Every operation must be idempotent or tolerate "already exists": the
/// engine retries attempts and may re-issue creates for a session name it
/// already created. Implementations map their provider's duplicate errors
/// to success rather than surfacing them.
#[async_trait]
pub trait SessionControl: Send + Sync {
    /// Create the ephemeral call session. Succeeds if it already exists.
    async fn create_session(&self, name: &str) -> Result<()>;

    /// Dial the destination number into the session through the SIP trunk.
    /// A trunk rejection is a hard error and surfaces to the caller.
    async fn dial_out(
        &self,
        session_name: &str,
        phone_number: &str,
        caller_identity: &str,
        display_name: &str,
    ) -> Result<()>;

    /// Dispatch the conversational agent into the session. Succeeds if a
    /// dispatch rule for this agent is already present.
    async fn ensure_agent_joined(&self, session_name: &str, agent_name: &str) -> Result<()>;

    /// Whether the session still exists on the control plane. Transient
    /// query failures surface as errors, not as `false`.
    async fn session_exists(&self, name: &str) -> Result<bool>;

    /// Tear the session down. Succeeds if it is already gone.
    async fn delete_session(&self, name: &str) -> Result<()>;
}
