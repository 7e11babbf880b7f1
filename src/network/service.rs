//! Game Service
//!
//! Turns client requests into registry lookups and game transitions, and
//! every outcome into a [`ResponseEnvelope`]. The freshness check runs here,
//! under the same game lock as the transition it guards. A game removed from
//! the registry while a request waited for its lock is reported as not found.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OwnedRwLockWriteGuard;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::ids::{GameId, PlayerToken};
use crate::game::map::HalfMap;
use crate::game::player::PlayerRegistration;
use crate::game::state::{Game, GameError, GameState};
use crate::network::env_var;
use crate::network::protocol::{ErrorCode, GameIdView, PlayerIdView, ResponseEnvelope};
use crate::network::registry::{GameRegistry, RegistryError};

/// Configuration for the game service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Longest a player may take between two accepted actions.
    pub freshness_window: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            freshness_window: Duration::from_secs(5),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            freshness_window: env_var("TREASURE_FRESHNESS_SECS")
                .map(Duration::from_secs)
                .unwrap_or_else(|| Self::default().freshness_window),
        }
    }
}

/// Service errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Unknown or expired game.
    #[error(transparent)]
    NotFound(#[from] RegistryError),

    /// Registration refused.
    #[error("registration failed: {0}")]
    Registration(GameError),

    /// A game transition failed.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A player's half-map body could not be read; the player lost.
    #[error("half-map could not be read: {0}")]
    UnreadableHalfMap(String),

    /// Request body could not be read.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Error category reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::NotFound(_) => ErrorCode::NotFound,
            ServiceError::Registration(_) => ErrorCode::RegistrationFailed,
            ServiceError::Game(GameError::Disqualified(violation)) => {
                if violation.is_turn_order() {
                    ErrorCode::TurnOrderViolation
                } else {
                    ErrorCode::HalfMapRejected
                }
            }
            ServiceError::Game(GameError::Timeout { .. }) => ErrorCode::Timeout,
            ServiceError::Game(GameError::PlayerNotFound(_)) => ErrorCode::NotFound,
            ServiceError::Game(_) => ErrorCode::TurnOrderViolation,
            ServiceError::UnreadableHalfMap(_) => ErrorCode::HalfMapRejected,
            ServiceError::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }

    /// Wrap into an error envelope.
    pub fn into_envelope<T>(self) -> ResponseEnvelope<T> {
        ResponseEnvelope::error(self.code(), self.to_string())
    }
}

fn respond<T>(result: Result<T, ServiceError>) -> ResponseEnvelope<T> {
    match result {
        Ok(data) => ResponseEnvelope::okay(data),
        Err(err) => {
            debug!(code = ?err.code(), error = %err, "Request failed");
            err.into_envelope()
        }
    }
}

/// Request handling on top of a shared registry.
#[derive(Clone)]
pub struct GameService {
    registry: Arc<GameRegistry>,
    config: ServiceConfig,
}

impl GameService {
    /// Create a service.
    pub fn new(registry: Arc<GameRegistry>, config: ServiceConfig) -> Self {
        Self { registry, config }
    }

    /// The registry behind this service.
    pub fn registry(&self) -> &Arc<GameRegistry> {
        &self.registry
    }

    /// Service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Create a game.
    pub async fn new_game(&self) -> ResponseEnvelope<GameIdView> {
        let (game_id, _) = self.registry.create().await;
        ResponseEnvelope::okay(GameIdView { game_id })
    }

    /// Register a player for a game.
    pub async fn register_player(
        &self,
        game_id: &GameId,
        registration: PlayerRegistration,
    ) -> ResponseEnvelope<PlayerIdView> {
        respond(self.try_register_player(game_id, registration).await)
    }

    /// Submit a half-map and return the sender's view of the game.
    pub async fn submit_half_map(
        &self,
        game_id: &GameId,
        half_map: HalfMap,
    ) -> ResponseEnvelope<GameState> {
        respond(self.try_submit_half_map(game_id, half_map).await)
    }

    /// Refuse a half-map body that did not parse.
    ///
    /// If the body still names a player of the game, that player is
    /// disqualified as for any other refused half-map.
    pub async fn reject_half_map(
        &self,
        game_id: &GameId,
        sender: Option<PlayerToken>,
        reason: String,
    ) -> ResponseEnvelope<GameState> {
        respond(self.try_reject_half_map(game_id, sender, reason).await)
    }

    /// The requester's view of a game.
    pub async fn game_state(
        &self,
        game_id: &GameId,
        player_id: &PlayerToken,
    ) -> ResponseEnvelope<GameState> {
        respond(self.try_game_state(game_id, player_id).await)
    }

    /// Write-lock a game that is still live once the lock is held.
    async fn lock_live(
        &self,
        game_id: &GameId,
    ) -> Result<OwnedRwLockWriteGuard<Game>, ServiceError> {
        let game = self.registry.get(game_id).await?;
        let guard = game.clone().write_owned().await;
        if !self.registry.holds(game_id, &game).await {
            debug!(game_id = %game_id, "Game removed while the request waited");
            return Err(RegistryError::NotFound(game_id.clone()).into());
        }
        Ok(guard)
    }

    async fn try_register_player(
        &self,
        game_id: &GameId,
        registration: PlayerRegistration,
    ) -> Result<PlayerIdView, ServiceError> {
        let mut game = self.lock_live(game_id).await?;

        let student_id = registration.student_id.clone();
        let player_id = game
            .register(registration, Instant::now())
            .map_err(ServiceError::Registration)?;

        info!(game_id = %game_id, student_id = %student_id, "Registration accepted");
        Ok(PlayerIdView { player_id })
    }

    async fn try_submit_half_map(
        &self,
        game_id: &GameId,
        half_map: HalfMap,
    ) -> Result<GameState, ServiceError> {
        let mut game = self.lock_live(game_id).await?;

        let sender = half_map.player_id.clone();
        game.enforce_freshness(&sender, Instant::now(), self.config.freshness_window)?;
        game.add_half_map(half_map)?;
        Ok(game.state_for(&sender)?)
    }

    async fn try_reject_half_map(
        &self,
        game_id: &GameId,
        sender: Option<PlayerToken>,
        reason: String,
    ) -> Result<GameState, ServiceError> {
        let Some(sender) = sender else {
            return Err(ServiceError::InvalidRequest(reason));
        };
        let mut game = self.lock_live(game_id).await?;

        game.enforce_freshness(&sender, Instant::now(), self.config.freshness_window)?;
        if game.is_over() {
            return Err(GameError::GameOver.into());
        }
        game.lost_game(&sender)?;

        warn!(
            game_id = %game_id,
            player = %sender,
            reason = %reason,
            "Unreadable half-map, player disqualified"
        );
        Err(ServiceError::UnreadableHalfMap(reason))
    }

    async fn try_game_state(
        &self,
        game_id: &GameId,
        player_id: &PlayerToken,
    ) -> Result<GameState, ServiceError> {
        let mut game = self.lock_live(game_id).await?;

        game.enforce_freshness(player_id, Instant::now(), self.config.freshness_window)?;
        Ok(game.state_for(player_id)?)
    }
}
