//! Game Registry
//!
//! Owns every live game. Bounded two ways: by capacity (the oldest game is
//! evicted first) and by age (every game is removed a fixed time after its
//! creation, whether or not it is still being played).

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::core::ids::{generate_unique, GameId};
use crate::core::rng::{derive_game_seed, entropy_seed, DeterministicRng};
use crate::game::state::Game;
use crate::network::env_var;

/// A game shared between concurrent requests.
pub type SharedGame = Arc<RwLock<Game>>;

/// Configuration for the game registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum live games.
    pub capacity: usize,
    /// Lifetime of a game, counted from creation.
    pub ttl: Duration,
    /// Registry seed; drawn from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            capacity: 999,
            ttl: Duration::from_secs(600),
            seed: None,
        }
    }
}

impl RegistryConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_var("TREASURE_CAPACITY").unwrap_or(defaults.capacity),
            ttl: env_var("TREASURE_GAME_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            seed: env_var("TREASURE_SEED").or(defaults.seed),
        }
    }
}

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No live game with this ID.
    #[error("game {0} not found")]
    NotFound(GameId),
}

struct RegistryEntry {
    game: SharedGame,
    expiry: AbortHandle,
    generation: u64,
}

struct RegistryInner {
    games: BTreeMap<GameId, RegistryEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<GameId>,
    rng: DeterministicRng,
    next_generation: u64,
}

impl RegistryInner {
    /// Detach an entry. With `generation` set, only that incarnation is taken.
    fn take(&mut self, id: &GameId, generation: Option<u64>) -> Option<RegistryEntry> {
        let current = self.games.get(id)?.generation;
        if generation.is_some_and(|g| g != current) {
            return None;
        }
        self.order.retain(|queued| queued != id);
        self.games.remove(id)
    }
}

/// Capacity- and age-bounded collection of games.
pub struct GameRegistry {
    config: RegistryConfig,
    seed: u64,
    inner: Arc<RwLock<RegistryInner>>,
}

impl GameRegistry {
    /// Create an empty registry.
    pub fn new(config: RegistryConfig) -> Self {
        let seed = config.seed.unwrap_or_else(entropy_seed);
        debug!(
            seed = %hex::encode(seed.to_le_bytes()),
            capacity = config.capacity,
            ttl_secs = config.ttl.as_secs(),
            "Game registry created"
        );

        Self {
            config,
            seed,
            inner: Arc::new(RwLock::new(RegistryInner {
                games: BTreeMap::new(),
                order: VecDeque::new(),
                rng: DeterministicRng::new(seed),
                next_generation: 0,
            })),
        }
    }

    /// Registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Seed every game seed is derived from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Create a game under a fresh ID and schedule its expiry.
    ///
    /// Evicts the oldest game when the registry is full. Must be called from
    /// within a tokio runtime.
    pub async fn create(&self) -> (GameId, SharedGame) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let games = &inner.games;
        let id = generate_unique(&mut inner.rng, GameId::random, |candidate| {
            games.contains_key(candidate)
        });

        while inner.games.len() >= self.config.capacity.max(1) {
            let Some(oldest) = inner.order.front().cloned() else {
                break;
            };
            if let Some(entry) = inner.take(&oldest, None) {
                entry.expiry.abort();
                debug!(game_id = %oldest, "Game evicted, registry at capacity");
            }
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let game = Arc::new(RwLock::new(Game::new(
            id.clone(),
            derive_game_seed(self.seed, id.as_str()),
        )));
        let expiry = self.schedule_expiry(id.clone(), generation);

        inner.games.insert(
            id.clone(),
            RegistryEntry {
                game: game.clone(),
                expiry,
                generation,
            },
        );
        inner.order.push_back(id.clone());

        info!(game_id = %id, live = inner.games.len(), "Game created");

        (id, game)
    }

    /// Look up a live game.
    pub async fn get(&self, id: &GameId) -> Result<SharedGame, RegistryError> {
        let inner = self.inner.read().await;
        inner
            .games
            .get(id)
            .map(|entry| entry.game.clone())
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Remove a game. Returns whether it was present.
    pub async fn remove(&self, id: &GameId) -> bool {
        let mut inner = self.inner.write().await;
        match inner.take(id, None) {
            Some(entry) => {
                entry.expiry.abort();
                debug!(game_id = %id, "Game removed");
                true
            }
            None => false,
        }
    }

    /// Whether a game is live.
    pub async fn contains(&self, id: &GameId) -> bool {
        self.inner.read().await.games.contains_key(id)
    }

    /// Whether `game` is still the live entry under `id`.
    ///
    /// False once the game was removed, even if a newer game took its ID.
    pub async fn holds(&self, id: &GameId, game: &SharedGame) -> bool {
        self.inner
            .read()
            .await
            .games
            .get(id)
            .is_some_and(|entry| Arc::ptr_eq(&entry.game, game))
    }

    /// Number of live games.
    pub async fn len(&self) -> usize {
        self.inner.read().await.games.len()
    }

    /// Whether no game is live.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn schedule_expiry(&self, id: GameId, generation: u64) -> AbortHandle {
        let inner = Arc::downgrade(&self.inner);
        let ttl = self.config.ttl;

        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;

            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut inner = inner.write().await;
            if inner.take(&id, Some(generation)).is_some() {
                info!(game_id = %id, "Game expired");
            }
        })
        .abort_handle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(capacity: usize, seed: u64) -> RegistryConfig {
        RegistryConfig {
            capacity,
            ttl: Duration::from_secs(600),
            seed: Some(seed),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = GameRegistry::new(config(10, 1));
        let (id, game) = registry.create().await;

        let found = registry.get(&id).await.unwrap();
        assert!(Arc::ptr_eq(&game, &found));
        assert_eq!(found.read().await.id(), &id);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let registry = GameRegistry::new(config(10, 1));
        let id = GameId::new("zzzzz");

        assert_eq!(registry.get(&id).await.err(), Some(RegistryError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = GameRegistry::new(config(999, 2));
        let mut seen = std::collections::BTreeSet::new();

        for _ in 0..200 {
            let (id, _) = registry.create().await;
            assert!(seen.insert(id));
        }
        assert_eq!(registry.len().await, 200);
    }

    #[tokio::test]
    async fn test_seeded_registries_agree() {
        let a = GameRegistry::new(config(10, 99));
        let b = GameRegistry::new(config(10, 99));

        for _ in 0..5 {
            let (id_a, game_a) = a.create().await;
            let (id_b, game_b) = b.create().await;
            assert_eq!(id_a, id_b);
            assert_eq!(game_a.read().await.state_id(), game_b.read().await.state_id());
        }
    }

    #[tokio::test]
    async fn test_oldest_evicted_at_capacity() {
        let registry = GameRegistry::new(config(3, 3));

        let (first, _) = registry.create().await;
        let (second, _) = registry.create().await;
        let (third, _) = registry.create().await;
        let (fourth, _) = registry.create().await;

        assert_eq!(registry.len().await, 3);
        assert!(!registry.contains(&first).await);
        assert!(registry.contains(&second).await);
        assert!(registry.contains(&third).await);
        assert!(registry.contains(&fourth).await);
    }

    #[tokio::test]
    async fn test_eviction_skips_removed_games() {
        let registry = GameRegistry::new(config(2, 4));

        let (first, _) = registry.create().await;
        let (second, _) = registry.create().await;
        assert!(registry.remove(&first).await);

        let (third, _) = registry.create().await;
        assert!(registry.contains(&second).await);
        assert!(registry.contains(&third).await);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let registry = GameRegistry::new(config(10, 5));
        let (id, game) = registry.create().await;

        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.is_empty().await);

        // Handles held by in-flight requests stay usable
        assert_eq!(game.read().await.id(), &id);
    }

    #[tokio::test]
    async fn test_holds_tracks_the_live_entry() {
        let registry = GameRegistry::new(config(10, 9));
        let (id, game) = registry.create().await;
        assert!(registry.holds(&id, &game).await);

        assert!(registry.remove(&id).await);
        assert!(!registry.holds(&id, &game).await);

        let stranger = Arc::new(RwLock::new(Game::new(id.clone(), 0)));
        assert!(!registry.holds(&id, &stranger).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_expires_after_ttl() {
        let registry = GameRegistry::new(config(10, 6));
        let (id, _) = registry.create().await;

        tokio::time::sleep(Duration::from_secs(599)).await;
        assert!(registry.contains(&id).await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!registry.contains(&id).await);
        assert!(matches!(registry.get(&id).await, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_is_not_idle_based() {
        let registry = GameRegistry::new(config(10, 7));
        let (id, _) = registry.create().await;

        for _ in 0..10 {
            tokio::time::sleep(Duration::from_secs(61)).await;
            let _ = registry.get(&id).await;
        }

        assert!(!registry.contains(&id).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_game_timer_is_cancelled() {
        let registry = GameRegistry::new(config(10, 8));
        let (id, _) = registry.create().await;
        assert!(registry.remove(&id).await);

        let (other, _) = registry.create().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        assert!(registry.contains(&other).await);

        tokio::time::sleep(Duration::from_secs(301)).await;
        assert!(registry.is_empty().await);
    }
}
