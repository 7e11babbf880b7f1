//! Protocol Messages
//!
//! Wire format for client-server communication over HTTP.
//! Every response, successful or not, is a [`ResponseEnvelope`] serialized
//! as JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::ids::{GameId, PlayerToken};

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// Outcome marker of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeState {
    /// The request succeeded and `data` is present.
    Okay,
    /// The request failed and `error_name` and `error_message` are present.
    Error,
}

/// Uniform response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T> {
    /// Okay or error.
    pub state: EnvelopeState,
    /// Payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error category on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_name: Option<ErrorCode>,
    /// Human-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl<T> ResponseEnvelope<T> {
    /// Successful response carrying `data`.
    pub fn okay(data: T) -> Self {
        Self {
            state: EnvelopeState::Okay,
            data: Some(data),
            error_name: None,
            error_message: None,
        }
    }

    /// Failed response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            state: EnvelopeState::Error,
            data: None,
            error_name: Some(code),
            error_message: Some(message.into()),
        }
    }

    /// Whether this is a successful response.
    pub fn is_okay(&self) -> bool {
        self.state == EnvelopeState::Okay
    }
}

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Unknown or expired game, or a player not in the game.
    NotFound,
    /// Registration refused.
    RegistrationFailed,
    /// Half-map broke a board rule.
    HalfMapRejected,
    /// Action out of turn or on a finished game.
    TurnOrderViolation,
    /// Freshness window exceeded.
    Timeout,
    /// Request body could not be read.
    InvalidRequest,
}

// =============================================================================
// PAYLOADS
// =============================================================================

/// Payload of a game creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameIdView {
    /// New game ID.
    pub game_id: GameId,
}

/// Payload of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdView {
    /// Token the client uses for every later request.
    pub player_id: PlayerToken,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl<T: Serialize> ResponseEnvelope<T> {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<T: DeserializeOwned> ResponseEnvelope<T> {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
