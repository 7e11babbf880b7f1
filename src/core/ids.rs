//! Identifier Generation
//!
//! Short alphanumeric tokens for games and game states are drawn from a
//! [`DeterministicRng`], so a seeded registry hands out reproducible IDs.
//! Player tokens are credentials and come from random v4 UUIDs instead; they
//! must not be derivable from the IDs every client sees.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::rng::DeterministicRng;

/// Alphabet for short identifiers: digits, upper case, lower case.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of a game identifier.
pub const GAME_ID_LENGTH: usize = 5;

/// Length of a game-state identifier.
pub const GAME_STATE_ID_LENGTH: usize = 15;

/// Random alphanumeric string of `len` characters.
pub fn alphanumeric(rng: &mut DeterministicRng, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.next_int(ALPHABET.len() as u32) as usize] as char)
        .collect()
}

/// Keep drawing until `taken` rejects nothing.
pub fn generate_unique<T>(
    rng: &mut DeterministicRng,
    mut make: impl FnMut(&mut DeterministicRng) -> T,
    mut taken: impl FnMut(&T) -> bool,
) -> T {
    loop {
        let candidate = make(rng);
        if !taken(&candidate) {
            return candidate;
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing identifier, e.g. one taken from a request path.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Five-character game identifier.
    GameId
);

string_id!(
    /// Opaque version stamp that rotates on every state-affecting transition.
    GameStateId
);

string_id!(
    /// Opaque player token (UUID formatted).
    PlayerToken
);

impl GameId {
    /// Draw a random game ID.
    pub fn random(rng: &mut DeterministicRng) -> Self {
        Self(alphanumeric(rng, GAME_ID_LENGTH))
    }
}

impl GameStateId {
    /// Draw a random game-state ID.
    pub fn random(rng: &mut DeterministicRng) -> Self {
        Self(alphanumeric(rng, GAME_STATE_ID_LENGTH))
    }

    /// Draw a game-state ID guaranteed to differ from `previous`.
    pub fn next_after(rng: &mut DeterministicRng, previous: &GameStateId) -> Self {
        generate_unique(rng, Self::random, |candidate| candidate == previous)
    }
}

impl PlayerToken {
    /// Mint a random v4 UUID token.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Mint tokens until `taken` rejects nothing.
    pub fn random_unused(mut taken: impl FnMut(&PlayerToken) -> bool) -> Self {
        loop {
            let candidate = Self::random();
            if !taken(&candidate) {
                return candidate;
            }
        }
    }
}
