//! Game Logic Module
//!
//! Everything that decides the outcome of a game. Deterministic for a given
//! seed; the only non-seeded input is the clock used by the freshness check.
//!
//! ## Module Structure
//!
//! - `map`: Half-map, grid and full-map types
//! - `player`: Registered players and turn states
//! - `validator`: Half-map rule checks
//! - `combiner`: Merging two half-maps into per-player projections
//! - `state`: The per-game state machine

pub mod combiner;
pub mod map;
pub mod player;
pub mod state;
pub mod validator;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export key types
pub use combiner::{combine, CombinedMaps};
pub use map::{
    Aspect, FortState, FullMap, FullMapTile, HalfMap, HalfMapGrid, HalfMapTile,
    PlayerPositionState, Terrain, TreasureState,
};
pub use player::{Player, PlayerRegistration, TurnState};
pub use state::{Game, GameError, GameState, PlayerStateView};
pub use validator::{validate, HalfMapViolation};
