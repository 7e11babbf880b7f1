//! Half-Map Combination
//!
//! Merges the two accepted half-maps of a game into one 64-tile board and
//! renders it once per player. Runs exactly once per game.
//!
//! Shared between both projections:
//! - the aspect (8x8 or 16x4),
//! - which half-map forms the first half.
//!
//! Drawn per projection:
//! - the decoy enemy position, sampled over the grass tiles with a chance of
//!   10% that grows by 10% after every tile that was not picked.

use tracing::debug;

use crate::core::ids::PlayerToken;
use crate::core::rng::DeterministicRng;
use crate::game::map::{
    AcceptedHalfMap, Aspect, FortState, FullMap, FullMapTile, PlayerPositionState, Terrain,
    TreasureState, FULL_MAP_TILES,
};

/// Starting chance (percent) of placing the decoy on a grass tile.
pub const DECOY_START_CHANCE: u32 = 10;

/// Chance increase (percent) after every tile that was not picked.
pub const DECOY_CHANCE_STEP: u32 = 10;

/// Both projections of a combined board.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CombinedMaps {
    /// Aspect shared by both projections.
    pub aspect: Aspect,
    /// Owner of the first half (origin at 0, 0).
    pub first_half_owner: PlayerToken,
    /// One projection per viewer, in half-map acceptance order.
    pub projections: [(PlayerToken, FullMap); 2],
}

impl CombinedMaps {
    /// Projection for a viewer.
    pub fn for_viewer(&self, viewer: &PlayerToken) -> Option<&FullMap> {
        self.projections
            .iter()
            .find(|(owner, _)| owner == viewer)
            .map(|(_, map)| map)
    }
}

/// Combine two accepted half-maps.
pub fn combine(maps: &[AcceptedHalfMap; 2], rng: &mut DeterministicRng) -> CombinedMaps {
    let aspect = if rng.chance(50) { Aspect::Wide } else { Aspect::Square };

    let ordered = if rng.chance(50) {
        [&maps[1], &maps[0]]
    } else {
        [&maps[0], &maps[1]]
    };

    let projections = [
        (maps[0].owner.clone(), project(&maps[0].owner, ordered, aspect, rng)),
        (maps[1].owner.clone(), project(&maps[1].owner, ordered, aspect, rng)),
    ];

    debug!(
        aspect = ?aspect,
        width = aspect.width(),
        height = aspect.height(),
        first_half = %ordered[0].owner,
        "Combined half-maps into full map"
    );

    CombinedMaps {
        aspect,
        first_half_owner: ordered[0].owner.clone(),
        projections,
    }
}

/// Render the board as `viewer` sees it.
fn project(
    viewer: &PlayerToken,
    ordered: [&AcceptedHalfMap; 2],
    aspect: Aspect,
    rng: &mut DeterministicRng,
) -> FullMap {
    let mut slots: Vec<Option<FullMapTile>> = vec![None; FULL_MAP_TILES];
    let mut threshold = DECOY_START_CHANCE;
    let mut decoy_placed = false;
    let mut last_grass = None;

    for (half, map) in ordered.iter().enumerate() {
        let (dx, dy) = if half == 0 { (0, 0) } else { aspect.second_half_offset() };
        let own_half = map.owner == *viewer;

        for tile in map.grid.tiles() {
            let x = tile.x + dx;
            let y = tile.y + dy;
            let index = (y * aspect.width() + x) as usize;

            let mut player_position = PlayerPositionState::NoPlayerPresent;
            let mut fort = FortState::NoOrUnknownFortState;
            if tile.fortress && own_half {
                player_position = PlayerPositionState::MyPlayerPosition;
                fort = FortState::MyFortPresent;
            }

            let eligible = !decoy_placed && tile.terrain == Terrain::Grass;
            if eligible && rng.chance(threshold) {
                decoy_placed = true;
                player_position = with_enemy(player_position);
            } else {
                threshold = threshold.saturating_add(DECOY_CHANCE_STEP);
            }
            if tile.terrain == Terrain::Grass {
                last_grass = Some(index);
            }

            slots[index] = Some(FullMapTile {
                x,
                y,
                terrain: tile.terrain,
                player_position,
                treasure: TreasureState::NoOrUnknownTreasureState,
                fort,
            });
        }
    }

    if !decoy_placed {
        if let Some(tile) = last_grass.and_then(|index| slots[index].as_mut()) {
            tile.player_position = with_enemy(tile.player_position);
        }
    }

    FullMap {
        aspect,
        tiles: slots.into_iter().flatten().collect(),
    }
}

fn with_enemy(position: PlayerPositionState) -> PlayerPositionState {
    match position {
        PlayerPositionState::MyPlayerPosition => PlayerPositionState::BothPlayerPosition,
        _ => PlayerPositionState::EnemyPlayerPosition,
    }
}
