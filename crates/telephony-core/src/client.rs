//! HTTP client for a LiveKit-compatible room service
//!
//! All calls are Twirp-style JSON POSTs authenticated with a bearer token
//! minted per request. Duplicate-create responses are mapped to success so
//! the [`SessionControl`] idempotence contract holds at this layer.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::control::SessionControl;
use crate::error::{Result, TelephonyError};
use crate::token::AccessToken;
use crate::types::{
    AgentDispatchRequest, CreateSessionRequest, DeleteSessionRequest, DialOutRequest,
    ListSessionsRequest, ListSessionsResponse,
};

const RPC_CREATE_ROOM: &str = "/twirp/livekit.RoomService/CreateRoom";
const RPC_LIST_ROOMS: &str = "/twirp/livekit.RoomService/ListRooms";
const RPC_DELETE_ROOM: &str = "/twirp/livekit.RoomService/DeleteRoom";
const RPC_CREATE_SIP_PARTICIPANT: &str = "/twirp/livekit.SIP/CreateSIPParticipant";
const RPC_CREATE_AGENT_DISPATCH: &str = "/twirp/livekit.AgentDispatchService/CreateDispatch";

/// Connection settings for the control plane.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    /// Base URL of the room service. `ws`/`wss` schemes are accepted and
    /// normalized to their HTTP equivalents.
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    /// Outbound SIP trunk used for every dial-out.
    pub sip_trunk_id: String,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7880".to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            sip_trunk_id: String::new(),
        }
    }
}

/// Production [`SessionControl`] implementation.
pub struct ControlPlaneClient {
    config: ControlPlaneConfig,
    base_url: Url,
    http: reqwest::Client,
}

impl ControlPlaneClient {
    pub fn new(config: ControlPlaneConfig) -> Result<Self> {
        if config.api_key.is_empty() || config.api_secret.is_empty() {
            return Err(TelephonyError::Configuration(
                "control plane API key and secret are required".to_string(),
            ));
        }

        let mut base_url = Url::parse(&config.url)
            .map_err(|e| TelephonyError::Configuration(format!("invalid control plane URL: {e}")))?;
        // Provider SDKs hand out websocket URLs; the admin API is plain HTTP.
        match base_url.scheme() {
            "ws" => base_url
                .set_scheme("http")
                .map_err(|_| TelephonyError::Configuration("cannot normalize URL scheme".into()))?,
            "wss" => base_url
                .set_scheme("https")
                .map_err(|_| TelephonyError::Configuration("cannot normalize URL scheme".into()))?,
            _ => {}
        }

        Ok(Self {
            config,
            base_url,
            http: reqwest::Client::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| TelephonyError::Configuration(format!("invalid RPC path {path}: {e}")))
    }

    async fn rpc<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response> {
        let token = AccessToken::new(&self.config.api_key, &self.config.api_secret).to_jwt()?;
        let response = self
            .http
            .post(self.endpoint(path)?)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        let err = TelephonyError::Api {
            status: status.as_u16(),
            message,
        };
        if err.is_already_exists() {
            return Err(match err {
                TelephonyError::Api { message, .. } => TelephonyError::AlreadyExists(message),
                other => other,
            });
        }
        Err(err)
    }
}

#[async_trait]
impl SessionControl for ControlPlaneClient {
    async fn create_session(&self, name: &str) -> Result<()> {
        let request = CreateSessionRequest {
            name: name.to_string(),
        };
        match self.rpc(RPC_CREATE_ROOM, &request).await {
            Ok(_) => {
                debug!("Created session {name}");
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!("Session {name} already exists, continuing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn dial_out(
        &self,
        session_name: &str,
        phone_number: &str,
        caller_identity: &str,
        display_name: &str,
    ) -> Result<()> {
        if self.config.sip_trunk_id.is_empty() {
            return Err(TelephonyError::Configuration(
                "sip_trunk_id is required for dial-out".to_string(),
            ));
        }
        let request = DialOutRequest {
            sip_trunk_id: self.config.sip_trunk_id.clone(),
            sip_call_to: phone_number.to_string(),
            room_name: session_name.to_string(),
            participant_identity: caller_identity.to_string(),
            participant_name: display_name.to_string(),
        };
        self.rpc(RPC_CREATE_SIP_PARTICIPANT, &request).await?;
        debug!("Dialed {phone_number} into {session_name}");
        Ok(())
    }

    async fn ensure_agent_joined(&self, session_name: &str, agent_name: &str) -> Result<()> {
        let request = AgentDispatchRequest {
            agent_name: agent_name.to_string(),
            room: session_name.to_string(),
        };
        match self.rpc(RPC_CREATE_AGENT_DISPATCH, &request).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_already_exists() => {
                debug!("Agent {agent_name} already dispatched to {session_name}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn session_exists(&self, name: &str) -> Result<bool> {
        let request = ListSessionsRequest {
            names: vec![name.to_string()],
        };
        let response = self.rpc(RPC_LIST_ROOMS, &request).await?;
        let listing: ListSessionsResponse = response.json().await?;
        Ok(listing.rooms.iter().any(|room| room.name == name))
    }

    async fn delete_session(&self, name: &str) -> Result<()> {
        let request = DeleteSessionRequest {
            room: name.to_string(),
        };
        match self.rpc(RPC_DELETE_ROOM, &request).await {
            Ok(_) => Ok(()),
            Err(TelephonyError::Api { status, message })
                if status == 404 || message.to_lowercase().contains("not found") =>
            {
                warn!("Session {name} was already gone when deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
