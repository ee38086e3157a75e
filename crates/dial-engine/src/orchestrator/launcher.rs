//! Call launch sequence against the control plane

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use autodial_telephony_core::SessionControl;

use crate::config::GeneralConfig;
use crate::error::{DialerError, Result};

/// Brings a call up: session, conversational agent, then the SIP leg.
///
/// Creation and agent dispatch are idempotent at the control plane client,
/// so a re-launch of a session name that already exists is harmless. The
/// dial-out is the only hard edge; a trunk rejection surfaces to the
/// dispatch loop, which classifies the attempt as failed.
pub struct CallLauncher {
    telephony: Arc<dyn SessionControl>,
    agent_name: String,
    caller_identity_prefix: String,
    agent_warmup: Duration,
}

impl CallLauncher {
    pub fn new(general: &GeneralConfig, telephony: Arc<dyn SessionControl>) -> Self {
        Self {
            telephony,
            agent_name: general.agent_name.clone(),
            caller_identity_prefix: general.caller_identity_prefix.clone(),
            agent_warmup: general.agent_warmup,
        }
    }

    pub async fn launch(
        &self,
        session_name: &str,
        phone_number: &str,
        display_name: &str,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        self.telephony.create_session(session_name).await?;
        debug!("Session {session_name} ready");

        self.telephony
            .ensure_agent_joined(session_name, &self.agent_name)
            .await?;
        debug!("Agent {} dispatched into {session_name}", self.agent_name);

        // Give the agent time to load before the callee can pick up,
        // otherwise the greeting audio is cut off.
        if !self.agent_warmup.is_zero() {
            tokio::select! {
                _ = shutdown.cancelled() => return Err(DialerError::Shutdown),
                _ = tokio::time::sleep(self.agent_warmup) => {}
            }
        }

        let identity = format!("{}_{}", self.caller_identity_prefix, phone_number);
        let name = if display_name.is_empty() {
            "Customer"
        } else {
            display_name
        };
        self.telephony
            .dial_out(session_name, phone_number, &identity, name)
            .await?;

        info!("📞 Dialed {phone_number} into session {session_name}");
        Ok(())
    }
}
