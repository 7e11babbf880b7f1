//! Board Types
//!
//! Half-maps as submitted by clients, the validated flat grid they are stored
//! as, and the per-viewer full map produced by the combiner.
//!
//! Grids are flat arrays indexed by `y * width + x`; coordinates never index
//! a grid without going through [`HalfMapGrid::index_of`] or
//! [`FullMap::index_of`].

use serde::{Deserialize, Serialize};

use crate::core::ids::PlayerToken;

/// Width of a half-map.
pub const HALF_MAP_WIDTH: u32 = 8;

/// Height of a half-map.
pub const HALF_MAP_HEIGHT: u32 = 4;

/// Tiles in a half-map.
pub const HALF_MAP_TILES: usize = (HALF_MAP_WIDTH * HALF_MAP_HEIGHT) as usize;

/// Tiles in a full map.
pub const FULL_MAP_TILES: usize = HALF_MAP_TILES * 2;

// =============================================================================
// TERRAIN
// =============================================================================

/// Terrain kind of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Walkable. Decoys are only ever placed on grass.
    Grass,
    /// Walkable, slow.
    Mountain,
    /// Not walkable; splits reachability.
    Water,
}

impl Terrain {
    /// Whether a player can stand on this terrain.
    #[inline]
    pub fn is_walkable(self) -> bool {
        self != Terrain::Water
    }
}

// =============================================================================
// HALF MAP
// =============================================================================

/// One tile of a submitted half-map, in the submitter's local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfMapTile {
    /// Column, 0..8.
    pub x: u32,
    /// Row, 0..4.
    pub y: u32,
    /// Terrain kind.
    pub terrain: Terrain,
    /// Home fortress on this tile.
    #[serde(default)]
    pub fortress: bool,
}

impl HalfMapTile {
    /// Create a tile without a fortress.
    pub const fn new(x: u32, y: u32, terrain: Terrain) -> Self {
        Self { x, y, terrain, fortress: false }
    }

    /// Create the fortress tile.
    pub const fn fortress(x: u32, y: u32, terrain: Terrain) -> Self {
        Self { x, y, terrain, fortress: true }
    }
}

/// A half-map as it arrives on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalfMap {
    /// Token of the submitting player.
    pub player_id: PlayerToken,
    /// Tiles, in any order.
    pub tiles: Vec<HalfMapTile>,
}

impl HalfMap {
    /// Create a half-map submission.
    pub fn new(player_id: PlayerToken, tiles: Vec<HalfMapTile>) -> Self {
        Self { player_id, tiles }
    }
}

/// A structurally complete 8×4 half-map: every coordinate exactly once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HalfMapGrid {
    tiles: [HalfMapTile; HALF_MAP_TILES],
}

impl HalfMapGrid {
    /// Flat index of a coordinate, `None` outside the grid.
    #[inline]
    pub fn index_of(x: u32, y: u32) -> Option<usize> {
        if x < HALF_MAP_WIDTH && y < HALF_MAP_HEIGHT {
            Some((y * HALF_MAP_WIDTH + x) as usize)
        } else {
            None
        }
    }

    /// Build a grid from loose tiles.
    ///
    /// Fails with the offending coordinate if a tile lies outside the grid or
    /// a coordinate is given twice. The caller has already checked the count.
    pub(crate) fn from_tiles(tiles: &[HalfMapTile]) -> Result<Self, GridError> {
        let mut slots: [Option<HalfMapTile>; HALF_MAP_TILES] = [None; HALF_MAP_TILES];

        for tile in tiles {
            let index = Self::index_of(tile.x, tile.y).ok_or(GridError::OutOfBounds {
                x: tile.x,
                y: tile.y,
            })?;
            if slots[index].replace(*tile).is_some() {
                return Err(GridError::Duplicate { x: tile.x, y: tile.y });
            }
        }

        let mut grid = [HalfMapTile::new(0, 0, Terrain::Grass); HALF_MAP_TILES];
        for (index, slot) in slots.iter().enumerate() {
            let x = index as u32 % HALF_MAP_WIDTH;
            let y = index as u32 / HALF_MAP_WIDTH;
            grid[index] = slot.ok_or(GridError::Missing { x, y })?;
        }

        Ok(Self { tiles: grid })
    }

    /// Tile at a coordinate.
    pub fn get(&self, x: u32, y: u32) -> Option<&HalfMapTile> {
        Self::index_of(x, y).map(|index| &self.tiles[index])
    }

    /// All tiles in index order.
    pub fn tiles(&self) -> &[HalfMapTile; HALF_MAP_TILES] {
        &self.tiles
    }

    /// The fortress tile, if any.
    pub fn fortress(&self) -> Option<&HalfMapTile> {
        self.tiles.iter().find(|tile| tile.fortress)
    }

    /// Count tiles of a terrain.
    pub fn count(&self, terrain: Terrain) -> usize {
        self.tiles.iter().filter(|tile| tile.terrain == terrain).count()
    }
}

/// Structural problems that prevent building a grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GridError {
    OutOfBounds { x: u32, y: u32 },
    Duplicate { x: u32, y: u32 },
    Missing { x: u32, y: u32 },
}

/// A half-map that passed validation, with its owner.
#[derive(Clone, Debug)]
pub struct AcceptedHalfMap {
    /// Submitting player.
    pub owner: PlayerToken,
    /// Validated grid.
    pub grid: HalfMapGrid,
}

// =============================================================================
// FULL MAP
// =============================================================================

/// Board aspect of the combined map.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aspect {
    /// Halves stacked: 8 wide, 8 high.
    Square,
    /// Halves side by side: 16 wide, 4 high.
    Wide,
}

impl Aspect {
    /// Offset applied to the second half.
    pub fn second_half_offset(self) -> (u32, u32) {
        match self {
            Aspect::Square => (0, HALF_MAP_HEIGHT),
            Aspect::Wide => (HALF_MAP_WIDTH, 0),
        }
    }

    /// Width of the combined board.
    pub fn width(self) -> u32 {
        match self {
            Aspect::Square => HALF_MAP_WIDTH,
            Aspect::Wide => HALF_MAP_WIDTH * 2,
        }
    }

    /// Height of the combined board.
    pub fn height(self) -> u32 {
        match self {
            Aspect::Square => HALF_MAP_HEIGHT * 2,
            Aspect::Wide => HALF_MAP_HEIGHT,
        }
    }
}

/// Who the viewer sees on a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerPositionState {
    /// Nobody known.
    NoPlayerPresent,
    /// The opponent (as told to the viewer).
    EnemyPlayerPosition,
    /// The viewer.
    MyPlayerPosition,
    /// Viewer and opponent share the tile.
    BothPlayerPosition,
}

/// Treasure knowledge for a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreasureState {
    /// Nothing known.
    NoOrUnknownTreasureState,
    /// The viewer's treasure lies here.
    MyTreasureIsPresent,
}

/// Fortress knowledge for a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FortState {
    /// Nothing known.
    NoOrUnknownFortState,
    /// The viewer's own fortress.
    MyFortPresent,
    /// The opponent's fortress.
    EnemyFortPresent,
}

/// One tile of a full-map projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullMapTile {
    /// Column on the full board.
    pub x: u32,
    /// Row on the full board.
    pub y: u32,
    /// Terrain kind.
    pub terrain: Terrain,
    /// Players known on this tile.
    pub player_position: PlayerPositionState,
    /// Treasure knowledge.
    pub treasure: TreasureState,
    /// Fortress knowledge.
    pub fort: FortState,
}

/// The combined 64-tile board as seen by one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullMap {
    /// Board aspect.
    pub aspect: Aspect,
    /// Tiles indexed by `y * width + x`.
    pub tiles: Vec<FullMapTile>,
}

impl FullMap {
    /// Board width.
    pub fn width(&self) -> u32 {
        self.aspect.width()
    }

    /// Board height.
    pub fn height(&self) -> u32 {
        self.aspect.height()
    }

    /// Flat index of a coordinate for this board's aspect.
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width() && y < self.height() {
            Some((y * self.width() + x) as usize)
        } else {
            None
        }
    }

    /// Tile at a coordinate.
    pub fn get(&self, x: u32, y: u32) -> Option<&FullMapTile> {
        self.index_of(x, y).and_then(|index| self.tiles.get(index))
    }

    /// Tiles with the given position state.
    pub fn positions(&self, state: PlayerPositionState) -> impl Iterator<Item = &FullMapTile> {
        self.tiles.iter().filter(move |tile| tile.player_position == state)
    }
}
