//! # Treasure Hunt Game Server
//!
//! Authoritative server for the two-player treasure hunt board game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   TREASURE HUNT SERVER                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── ids.rs      - Game, game-state and player identifiers   │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── map.rs      - Half-map, grid and full-map types         │
//! │  ├── player.rs   - Players and turn states                   │
//! │  ├── validator.rs- Half-map rule checks                      │
//! │  ├── combiner.rs - Half-maps to per-player full maps         │
//! │  └── state.rs    - Per-game state machine                    │
//! │                                                              │
//! │  network/        - HTTP boundary (non-deterministic)         │
//! │  ├── registry.rs - Live games, capacity and expiry           │
//! │  ├── service.rs  - Requests to transitions and envelopes     │
//! │  ├── protocol.rs - Response envelope and payloads            │
//! │  └── server.rs   - axum router                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are deterministic:
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - Game randomness from seeded Xorshift128+
//! - Player tokens from random v4 UUIDs, never from the seeded stream
//! - The clock only enters through the freshness check
//!
//! A registry started with a fixed seed hands out identical game IDs, turn
//! orders and full maps for identical request sequences. Only the player
//! tokens differ.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use core::ids::{GameId, GameStateId, PlayerToken};
pub use core::rng::DeterministicRng;
pub use game::state::{Game, GameError, GameState};
pub use network::{GameRegistry, GameServer, GameService, ServerConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
