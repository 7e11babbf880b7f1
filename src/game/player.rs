//! Player State
//!
//! A registered participant of one game. Only [`Game`](super::state::Game)
//! mutates players.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::core::ids::PlayerToken;

/// Registration payload sent by a client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRegistration {
    /// Student first name.
    pub first_name: String,
    /// Student last name.
    pub last_name: String,
    /// Student identifier.
    pub student_id: String,
}

impl PlayerRegistration {
    /// Create a registration payload.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            student_id: student_id.into(),
        }
    }
}

/// Per-player turn state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Waiting for the opponent.
    ShouldWait,
    /// This player's action is expected next.
    ShouldActNext,
    /// Game over, this player won.
    Won,
    /// Game over, this player lost.
    Lost,
}

impl TurnState {
    /// Won or Lost.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TurnState::Won | TurnState::Lost)
    }
}

/// A player registered for a game.
#[derive(Clone, Debug)]
pub struct Player {
    registration: PlayerRegistration,
    token: PlayerToken,
    pub(crate) turn_state: TurnState,
    pub(crate) submitted_half_map: bool,
    last_action: Instant,
}

impl Player {
    /// Create a freshly registered player.
    pub fn new(registration: PlayerRegistration, token: PlayerToken, now: Instant) -> Self {
        Self {
            registration,
            token,
            turn_state: TurnState::ShouldWait,
            submitted_half_map: false,
            last_action: now,
        }
    }

    /// Registration details.
    pub fn registration(&self) -> &PlayerRegistration {
        &self.registration
    }

    /// Real player token.
    pub fn token(&self) -> &PlayerToken {
        &self.token
    }

    /// Current turn state.
    pub fn turn_state(&self) -> TurnState {
        self.turn_state
    }

    /// Whether this player's half-map has been accepted.
    pub fn has_submitted_half_map(&self) -> bool {
        self.submitted_half_map
    }

    /// Instant of the last accepted action.
    pub fn last_action(&self) -> Instant {
        self.last_action
    }

    /// Record an action at `now` if it arrives within `window` of the last one.
    ///
    /// Returns the elapsed time as the error when the window was exceeded; the
    /// last-action instant is left untouched in that case.
    pub(crate) fn check_time(&mut self, now: Instant, window: Duration) -> Result<(), Duration> {
        let elapsed = now.saturating_duration_since(self.last_action);
        if elapsed > window {
            return Err(elapsed);
        }
        self.last_action = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(now: Instant) -> Player {
        Player::new(
            PlayerRegistration::new("Ada", "Lovelace", "a0001"),
            PlayerToken::new("token"),
            now,
        )
    }

    #[test]
    fn test_new_player_waits() {
        let p = player(Instant::now());
        assert_eq!(p.turn_state(), TurnState::ShouldWait);
        assert!(!p.has_submitted_half_map());
    }

    #[test]
    fn test_check_time_within_window() {
        let start = Instant::now();
        let mut p = player(start);

        let later = start + Duration::from_secs(4);
        assert!(p.check_time(later, Duration::from_secs(5)).is_ok());
        assert_eq!(p.last_action(), later);
    }

    #[test]
    fn test_check_time_exceeded() {
        let start = Instant::now();
        let mut p = player(start);

        let late = start + Duration::from_secs(6);
        assert_eq!(
            p.check_time(late, Duration::from_secs(5)),
            Err(Duration::from_secs(6))
        );
        assert_eq!(p.last_action(), start);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TurnState::Won.is_terminal());
        assert!(TurnState::Lost.is_terminal());
        assert!(!TurnState::ShouldWait.is_terminal());
        assert!(!TurnState::ShouldActNext.is_terminal());
    }
}
