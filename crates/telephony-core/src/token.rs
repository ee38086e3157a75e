//! Short-lived access tokens for the room service API
//!
//! Every control plane request carries a freshly minted HS256 JWT. Tokens
//! are scoped to server-side room administration and expire quickly, so
//! nothing long-lived needs to be cached or revoked.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TelephonyError};

const DEFAULT_TTL_SECS: i64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct VideoGrant {
    #[serde(rename = "roomCreate", skip_serializing_if = "std::ops::Not::not", default)]
    pub room_create: bool,
    #[serde(rename = "roomList", skip_serializing_if = "std::ops::Not::not", default)]
    pub room_list: bool,
    #[serde(rename = "roomAdmin", skip_serializing_if = "std::ops::Not::not", default)]
    pub room_admin: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub room: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// Builder for a single server-to-server access token.
pub struct AccessToken {
    api_key: String,
    api_secret: String,
    identity: String,
    ttl: Duration,
    grant: VideoGrant,
}

impl AccessToken {
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            identity: "autodial-engine".to_string(),
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
            grant: VideoGrant {
                room_create: true,
                room_list: true,
                room_admin: true,
                room: None,
            },
        }
    }

    pub fn with_identity(mut self, identity: &str) -> Self {
        self.identity = identity.to_string();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Scope the token to a single session name.
    pub fn with_session(mut self, name: &str) -> Self {
        self.grant.room = Some(name.to_string());
        self
    }

    /// Sign the token with the configured API secret.
    pub fn to_jwt(&self) -> Result<String> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(TelephonyError::Configuration(
                "API key and secret are required to mint tokens".to_string(),
            ));
        }

        let now = Utc::now();
        let claims = Claims {
            iss: self.api_key.clone(),
            sub: self.identity.clone(),
            nbf: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            video: self.grant.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| TelephonyError::Token(e.to_string()))
    }
}
