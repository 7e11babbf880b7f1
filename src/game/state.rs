//! Game State Machine
//!
//! One game: registration of two players, the alternating half-map
//! submissions, and the terminal outcome. Every transition that a client can
//! observe rotates the game-state ID.
//!
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::ids::{GameId, GameStateId, PlayerToken};
use crate::core::rng::DeterministicRng;
use crate::game::combiner::{combine, CombinedMaps};
use crate::game::map::{AcceptedHalfMap, FullMap, HalfMap};
use crate::game::player::{Player, PlayerRegistration, TurnState};
use crate::game::validator::{validate, HalfMapViolation, SubmissionContext};

/// Players per game.
pub const MAX_PLAYERS: usize = 2;

/// Chance (percent) that the second registered player acts first.
pub const NEWCOMER_FIRST_CHANCE: u32 = 80;

/// Errors from game transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// The game has already ended.
    #[error("game is already over")]
    GameOver,

    /// Both seats are taken.
    #[error("game already has {} players", MAX_PLAYERS)]
    GameFull,

    /// The token is registered already.
    #[error("player {0} is already registered")]
    AlreadyRegistered(PlayerToken),

    /// The token does not belong to this game.
    #[error("player {0} is not part of this game")]
    PlayerNotFound(PlayerToken),

    /// The half-map was refused; the sender lost.
    #[error("{0}")]
    Disqualified(HalfMapViolation),

    /// The player took longer than the freshness window; the player lost.
    #[error("player {player} exceeded the time limit of {window:?} ({elapsed:?} since the last action)")]
    Timeout {
        /// Late player.
        player: PlayerToken,
        /// Time since the last accepted action.
        elapsed: Duration,
        /// Allowed window.
        window: Duration,
    },
}

/// A player's entry in a state snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStateView {
    /// Student first name.
    pub first_name: String,
    /// Student last name.
    pub last_name: String,
    /// Student identifier.
    pub student_id: String,
    /// Real token for the requester, fake token for the opponent.
    pub player_id: PlayerToken,
    /// Turn state.
    pub state: TurnState,
    /// Whether the player holds its treasure. Nothing is collected before
    /// the first move.
    pub collected_treasure: bool,
}

/// Snapshot of a game as seen by one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Current game-state ID.
    pub game_state_id: GameStateId,
    /// Players in registration order.
    pub players: Vec<PlayerStateView>,
    /// The requester's full map, once both half-maps are in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_map: Option<FullMap>,
}

/// A single game.
#[derive(Debug)]
pub struct Game {
    id: GameId,
    state_id: GameStateId,
    players: Vec<Player>,
    half_maps: Vec<AcceptedHalfMap>,
    /// Real token to the fake token shown to the opponent.
    fake_tokens: BTreeMap<PlayerToken, PlayerToken>,
    full_maps: Option<CombinedMaps>,
    game_over: bool,
    rng: DeterministicRng,
}

impl Game {
    /// Create an empty game.
    pub fn new(id: GameId, seed: u64) -> Self {
        let mut rng = DeterministicRng::new(seed);
        let state_id = GameStateId::random(&mut rng);

        Self {
            id,
            state_id,
            players: Vec::with_capacity(MAX_PLAYERS),
            half_maps: Vec::with_capacity(MAX_PLAYERS),
            fake_tokens: BTreeMap::new(),
            full_maps: None,
            game_over: false,
            rng,
        }
    }

    /// Game ID.
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Current game-state ID.
    pub fn state_id(&self) -> &GameStateId {
        &self.state_id
    }

    /// Players in registration order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a player by real token.
    pub fn player(&self, token: &PlayerToken) -> Option<&Player> {
        self.players.iter().find(|player| player.token() == token)
    }

    /// Accepted half-maps in acceptance order.
    pub fn half_maps(&self) -> &[AcceptedHalfMap] {
        &self.half_maps
    }

    /// Both projections, once combined.
    pub fn combined(&self) -> Option<&CombinedMaps> {
        self.full_maps.as_ref()
    }

    /// The fake token shown to the opponent of `token`.
    pub fn fake_token(&self, token: &PlayerToken) -> Option<&PlayerToken> {
        self.fake_tokens.get(token)
    }

    /// Whether the game has ended.
    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// Register a new player and return the token minted for it.
    pub fn register(
        &mut self,
        registration: PlayerRegistration,
        now: Instant,
    ) -> Result<PlayerToken, GameError> {
        self.ensure_open_seat()?;

        let token = PlayerToken::random_unused(|candidate| {
            self.players.iter().any(|p| p.token() == candidate)
                || self.fake_tokens.values().any(|fake| fake == candidate)
        });
        self.add_player(Player::new(registration, token.clone(), now))?;
        Ok(token)
    }

    /// Seat a player.
    ///
    /// A failure leaves the existing players untouched.
    pub fn add_player(&mut self, mut player: Player) -> Result<(), GameError> {
        self.ensure_open_seat()?;
        if self.player(player.token()).is_some() {
            return Err(GameError::AlreadyRegistered(player.token().clone()));
        }

        let fake = PlayerToken::random_unused(|candidate| {
            candidate == player.token()
                || self.players.iter().any(|p| p.token() == candidate)
                || self.fake_tokens.values().any(|fake| fake == candidate)
        });
        self.fake_tokens.insert(player.token().clone(), fake);

        player.turn_state = TurnState::ShouldWait;
        self.players.push(player);

        if self.players.len() == MAX_PLAYERS {
            let (newcomer, earlier) = if self.rng.chance(NEWCOMER_FIRST_CHANCE) {
                (TurnState::ShouldActNext, TurnState::ShouldWait)
            } else {
                (TurnState::ShouldWait, TurnState::ShouldActNext)
            };
            self.players[0].turn_state = earlier;
            self.players[1].turn_state = newcomer;
        }

        self.rotate_state_id();

        info!(
            game_id = %self.id,
            players = self.players.len(),
            "Player registered"
        );

        Ok(())
    }

    /// Accept or refuse a half-map.
    ///
    /// A refused half-map disqualifies its sender. Once both half-maps are in,
    /// the full maps are combined.
    pub fn add_half_map(&mut self, half_map: HalfMap) -> Result<(), GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        let sender = half_map.player_id.clone();
        if self.player(&sender).is_none() {
            return Err(GameError::PlayerNotFound(sender));
        }

        let context = SubmissionContext {
            players: &self.players,
            accepted: &self.half_maps,
        };
        let grid = match validate(&half_map, context) {
            Ok(grid) => grid,
            Err(violation) => {
                warn!(
                    game_id = %self.id,
                    player = %sender,
                    turn_order = violation.is_turn_order(),
                    reason = %violation,
                    "Half-map rejected, player disqualified"
                );
                self.finish(&sender);
                return Err(GameError::Disqualified(violation));
            }
        };

        for player in &mut self.players {
            if *player.token() == sender {
                player.submitted_half_map = true;
                player.turn_state = TurnState::ShouldWait;
            } else {
                player.turn_state = TurnState::ShouldActNext;
            }
        }
        self.half_maps.push(AcceptedHalfMap { owner: sender.clone(), grid });
        self.rotate_state_id();

        info!(
            game_id = %self.id,
            player = %sender,
            accepted = self.half_maps.len(),
            "Half-map accepted"
        );

        if self.full_maps.is_none() {
            if let Ok(pair) = <&[AcceptedHalfMap; 2]>::try_from(self.half_maps.as_slice()) {
                self.full_maps = Some(combine(pair, &mut self.rng));
            }
        }

        Ok(())
    }

    /// Declare `token` the loser and end the game.
    ///
    /// Applies even to a finished game, overriding its outcome.
    pub fn lost_game(&mut self, token: &PlayerToken) -> Result<(), GameError> {
        if self.player(token).is_none() {
            return Err(GameError::PlayerNotFound(token.clone()));
        }
        self.finish(token);
        Ok(())
    }

    /// Check that `token` acts within `window` of its last accepted action.
    ///
    /// A late player loses the game. Finished games are not timed.
    pub fn enforce_freshness(
        &mut self,
        token: &PlayerToken,
        now: Instant,
        window: Duration,
    ) -> Result<(), GameError> {
        let game_over = self.game_over;
        let player = self
            .players
            .iter_mut()
            .find(|player| player.token() == token)
            .ok_or_else(|| GameError::PlayerNotFound(token.clone()))?;
        if game_over {
            return Ok(());
        }

        match player.check_time(now, window) {
            Ok(()) => Ok(()),
            Err(elapsed) => {
                warn!(
                    game_id = %self.id,
                    player = %token,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Player exceeded the time limit"
                );
                self.finish(token);
                Err(GameError::Timeout {
                    player: token.clone(),
                    elapsed,
                    window,
                })
            }
        }
    }

    /// Snapshot for the player holding `token`.
    pub fn state_for(&self, token: &PlayerToken) -> Result<GameState, GameError> {
        if self.player(token).is_none() {
            return Err(GameError::PlayerNotFound(token.clone()));
        }

        let players = self
            .players
            .iter()
            .map(|player| {
                let shown = if player.token() == token {
                    player.token().clone()
                } else {
                    self.fake_tokens
                        .get(player.token())
                        .cloned()
                        .unwrap_or_else(|| PlayerToken::new(""))
                };
                let registration = player.registration();
                PlayerStateView {
                    first_name: registration.first_name.clone(),
                    last_name: registration.last_name.clone(),
                    student_id: registration.student_id.clone(),
                    player_id: shown,
                    state: player.turn_state(),
                    collected_treasure: false,
                }
            })
            .collect();

        Ok(GameState {
            game_state_id: self.state_id.clone(),
            players,
            full_map: self
                .full_maps
                .as_ref()
                .and_then(|maps| maps.for_viewer(token))
                .cloned(),
        })
    }

    fn ensure_open_seat(&self) -> Result<(), GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(GameError::GameFull);
        }
        Ok(())
    }

    fn finish(&mut self, loser: &PlayerToken) {
        for player in &mut self.players {
            player.turn_state = if player.token() == loser {
                TurnState::Lost
            } else {
                TurnState::Won
            };
        }
        self.game_over = true;
        self.rotate_state_id();

        debug!(game_id = %self.id, loser = %loser, "Game over");
    }

    fn rotate_state_id(&mut self) {
        self.state_id = GameStateId::next_after(&mut self.rng, &self.state_id);
    }
}
