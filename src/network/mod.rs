//! Network Layer
//!
//! HTTP boundary around the game engine: the registry of live games, the
//! service translating requests into game transitions, and the axum router.
//! This layer is **non-deterministic** - all game logic runs through `game/`.

pub mod protocol;
pub mod registry;
pub mod server;
pub mod service;

pub use protocol::{EnvelopeState, ErrorCode, GameIdView, PlayerIdView, ResponseEnvelope};
pub use registry::{GameRegistry, RegistryConfig, RegistryError, SharedGame};
pub use server::{router, GameServer, GameServerError, ServerConfig};
pub use service::{GameService, ServiceConfig, ServiceError};

use std::str::FromStr;

use tracing::warn;

/// Parse an environment variable, ignoring it with a warning when malformed.
pub(crate) fn env_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring malformed environment variable");
            None
        }
    }
}
