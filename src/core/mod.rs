//! Core primitives.
//!
//! Seeded randomness and identifier generation. Everything probabilistic in
//! the game engine draws from these types.

pub mod ids;
pub mod rng;

// Re-export core types
pub use ids::{GameId, GameStateId, PlayerToken};
pub use rng::{derive_game_seed, DeterministicRng};
