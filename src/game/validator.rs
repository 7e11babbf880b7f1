//! Half-Map Validation
//!
//! Pure checks of one submission against the rules of the board and the
//! current state of the game it is submitted to. Nothing here mutates the
//! game; the state machine decides what a violation costs the sender.
//!
//! Rules run in a fixed order and the first failing rule is reported. Rules
//! that can fail in several ways at once (terrain quotas, border rules)
//! report every violation of that rule together.

use std::fmt;

use thiserror::Error;

use crate::core::ids::PlayerToken;
use crate::game::map::{
    AcceptedHalfMap, GridError, HalfMap, HalfMapGrid, Terrain, HALF_MAP_HEIGHT, HALF_MAP_TILES,
    HALF_MAP_WIDTH,
};
use crate::game::player::{Player, TurnState};

/// Minimum mountain tiles per half-map.
pub const MIN_MOUNTAINS: usize = 3;
/// Minimum water tiles per half-map.
pub const MIN_WATER: usize = 4;
/// Minimum grass tiles per half-map.
pub const MIN_GRASS: usize = 15;
/// Maximum water tiles on the top and bottom rows together.
pub const MAX_WIDTH_BORDER_WATER: usize = 3;
/// Maximum water tiles on the left and right columns together.
pub const MAX_HEIGHT_BORDER_WATER: usize = 1;
/// Maximum identical positions between the two half-maps of a game.
pub const MAX_SIMILAR_TILES: usize = 10;

/// Players a game needs before half-maps are accepted.
const REQUIRED_PLAYERS: usize = 2;

/// What the validator needs to know about the game.
#[derive(Clone, Copy, Debug)]
pub struct SubmissionContext<'a> {
    /// Registered players.
    pub players: &'a [Player],
    /// Half-maps accepted so far.
    pub accepted: &'a [AcceptedHalfMap],
}

/// A terrain kind below its quota.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainShortfall {
    /// Terrain kind.
    pub terrain: Terrain,
    /// Tiles found.
    pub found: usize,
    /// Tiles required.
    pub required: usize,
}

impl fmt::Display for TerrainShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} count insufficient, given are {} with {} desired",
            self.terrain, self.found, self.required
        )
    }
}

/// A broken border or fortress rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderViolation {
    /// No tile carries the fortress.
    MissingFortress,
    /// More than one tile carries a fortress.
    MultipleFortresses {
        /// Fortress tiles found.
        count: usize,
    },
    /// Too much water along the top and bottom rows.
    WidthBorderWater {
        /// Water tiles found.
        found: usize,
    },
    /// Too much water along the left and right columns.
    HeightBorderWater {
        /// Water tiles found.
        found: usize,
    },
}

impl fmt::Display for BorderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BorderViolation::MissingFortress => write!(f, "fortress is not present"),
            BorderViolation::MultipleFortresses { count } => {
                write!(f, "{} fortresses present, exactly one allowed", count)
            }
            BorderViolation::WidthBorderWater { found } => write!(
                f,
                "water fields on the width of the border is {}, the maximal count is {}",
                found, MAX_WIDTH_BORDER_WATER
            ),
            BorderViolation::HeightBorderWater { found } => write!(
                f,
                "water fields on the height of the border is {}, the maximal count is {}",
                found, MAX_HEIGHT_BORDER_WATER
            ),
        }
    }
}

/// Why a half-map was refused.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum HalfMapViolation {
    /// Sent before both players registered.
    #[error("player {sender} sent a half-map before all players registered ({registered} of 2)")]
    PlayersMissing {
        /// Sender.
        sender: PlayerToken,
        /// Players registered at the time.
        registered: usize,
    },

    /// Both half-maps are already in.
    #[error("two half-maps have already been sent, culprit was {sender}")]
    HalfMapsComplete {
        /// Sender.
        sender: PlayerToken,
    },

    /// Sender is not part of this game.
    #[error("player {sender} isn't registered for this game")]
    UnknownSender {
        /// Sender.
        sender: PlayerToken,
    },

    /// Sender was supposed to wait.
    #[error("player {sender} sent a half-map while it should wait")]
    NotYourTurn {
        /// Sender.
        sender: PlayerToken,
    },

    /// Sender already submitted.
    #[error("player {sender} has already sent a half-map")]
    AlreadySubmitted {
        /// Sender.
        sender: PlayerToken,
    },

    /// Wrong number of tiles.
    #[error("map size is invalid: current size {actual}, desired size is {}", HALF_MAP_TILES)]
    InvalidSize {
        /// Tiles submitted.
        actual: usize,
    },

    /// Tile outside the 8x4 grid.
    #[error("tile ({x}, {y}) lies outside the {}x{} half-map", HALF_MAP_WIDTH, HALF_MAP_HEIGHT)]
    OutOfBounds {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },

    /// Coordinate given twice (and so another one missing).
    #[error("tile ({x}, {y}) is given more than once")]
    DuplicateTile {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },

    /// No tile given for a coordinate.
    #[error("tile ({x}, {y}) is missing")]
    MissingTile {
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },

    /// One or more terrain quotas missed.
    #[error("{}", join(.0))]
    TerrainQuota(Vec<TerrainShortfall>),

    /// One or more border or fortress rules broken.
    #[error("{}", join(.0))]
    Border(Vec<BorderViolation>),

    /// Walkable tiles cut off from the rest.
    #[error("the half-map has islands inside it: {unreachable} walkable tiles unreachable")]
    Islands {
        /// Walkable tiles the flood fill did not reach.
        unreachable: usize,
    },

    /// Too close to the opponent's half-map.
    #[error("the two half-maps are too similar: {matches} identical positions, at most {} allowed", MAX_SIMILAR_TILES)]
    TooSimilar {
        /// Identical positions.
        matches: usize,
    },
}

impl HalfMapViolation {
    /// Acting out of turn, as opposed to submitting a malformed board.
    pub fn is_turn_order(&self) -> bool {
        matches!(
            self,
            HalfMapViolation::PlayersMissing { .. }
                | HalfMapViolation::HalfMapsComplete { .. }
                | HalfMapViolation::UnknownSender { .. }
                | HalfMapViolation::NotYourTurn { .. }
                | HalfMapViolation::AlreadySubmitted { .. }
        )
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a submission and return its grid.
pub fn validate(
    half_map: &HalfMap,
    context: SubmissionContext<'_>,
) -> Result<HalfMapGrid, HalfMapViolation> {
    check_sender(&half_map.player_id, context)?;
    let grid = check_size(half_map)?;
    check_quantities(&grid)?;
    check_borders(&grid)?;
    check_reachability(&grid)?;
    for accepted in context.accepted {
        check_similarity(&grid, &accepted.grid)?;
    }
    Ok(grid)
}

fn check_sender(sender: &PlayerToken, context: SubmissionContext<'_>) -> Result<(), HalfMapViolation> {
    let player = context
        .players
        .iter()
        .find(|player| player.token() == sender)
        .ok_or_else(|| HalfMapViolation::UnknownSender { sender: sender.clone() })?;

    if context.players.len() != REQUIRED_PLAYERS {
        return Err(HalfMapViolation::PlayersMissing {
            sender: sender.clone(),
            registered: context.players.len(),
        });
    }
    if context.accepted.len() >= REQUIRED_PLAYERS {
        return Err(HalfMapViolation::HalfMapsComplete { sender: sender.clone() });
    }
    if player.turn_state() != TurnState::ShouldActNext {
        return Err(HalfMapViolation::NotYourTurn { sender: sender.clone() });
    }
    if player.has_submitted_half_map() {
        return Err(HalfMapViolation::AlreadySubmitted { sender: sender.clone() });
    }
    Ok(())
}

fn check_size(half_map: &HalfMap) -> Result<HalfMapGrid, HalfMapViolation> {
    if half_map.tiles.len() != HALF_MAP_TILES {
        return Err(HalfMapViolation::InvalidSize { actual: half_map.tiles.len() });
    }
    HalfMapGrid::from_tiles(&half_map.tiles).map_err(|err| match err {
        GridError::OutOfBounds { x, y } => HalfMapViolation::OutOfBounds { x, y },
        GridError::Duplicate { x, y } => HalfMapViolation::DuplicateTile { x, y },
        GridError::Missing { x, y } => HalfMapViolation::MissingTile { x, y },
    })
}

fn check_quantities(grid: &HalfMapGrid) -> Result<(), HalfMapViolation> {
    let quotas = [
        (Terrain::Mountain, MIN_MOUNTAINS),
        (Terrain::Water, MIN_WATER),
        (Terrain::Grass, MIN_GRASS),
    ];

    let shortfalls: Vec<TerrainShortfall> = quotas
        .iter()
        .map(|&(terrain, required)| TerrainShortfall {
            terrain,
            found: grid.count(terrain),
            required,
        })
        .filter(|shortfall| shortfall.found < shortfall.required)
        .collect();

    if shortfalls.is_empty() {
        Ok(())
    } else {
        Err(HalfMapViolation::TerrainQuota(shortfalls))
    }
}

fn check_borders(grid: &HalfMapGrid) -> Result<(), HalfMapViolation> {
    let mut width_border_water = 0;
    let mut height_border_water = 0;
    let mut fortresses = 0;

    for tile in grid.tiles() {
        if tile.fortress {
            fortresses += 1;
        }
        if tile.terrain != Terrain::Water {
            continue;
        }
        // Corners count towards both borders
        if tile.y == 0 || tile.y == HALF_MAP_HEIGHT - 1 {
            width_border_water += 1;
        }
        if tile.x == 0 || tile.x == HALF_MAP_WIDTH - 1 {
            height_border_water += 1;
        }
    }

    let mut violations = Vec::new();
    match fortresses {
        0 => violations.push(BorderViolation::MissingFortress),
        1 => {}
        count => violations.push(BorderViolation::MultipleFortresses { count }),
    }
    if width_border_water > MAX_WIDTH_BORDER_WATER {
        violations.push(BorderViolation::WidthBorderWater { found: width_border_water });
    }
    if height_border_water > MAX_HEIGHT_BORDER_WATER {
        violations.push(BorderViolation::HeightBorderWater { found: height_border_water });
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(HalfMapViolation::Border(violations))
    }
}

/// Flood fill over walkable tiles from the corner (0, 0).
///
/// A water corner moves the start to the first walkable tile in index order.
fn check_reachability(grid: &HalfMapGrid) -> Result<(), HalfMapViolation> {
    let tiles = grid.tiles();
    let Some(start) = tiles.iter().position(|tile| tile.terrain.is_walkable()) else {
        return Ok(());
    };

    let mut visited = [false; HALF_MAP_TILES];
    let mut stack = vec![start];
    visited[start] = true;

    while let Some(index) = stack.pop() {
        let x = index as u32 % HALF_MAP_WIDTH;
        let y = index as u32 / HALF_MAP_WIDTH;
        let neighbours = [
            (x.checked_sub(1), Some(y)),
            (Some(x + 1), Some(y)),
            (Some(x), y.checked_sub(1)),
            (Some(x), Some(y + 1)),
        ];

        for (nx, ny) in neighbours {
            let Some(next) = nx.zip(ny).and_then(|(nx, ny)| HalfMapGrid::index_of(nx, ny)) else {
                continue;
            };
            if !visited[next] && tiles[next].terrain.is_walkable() {
                visited[next] = true;
                stack.push(next);
            }
        }
    }

    let unreachable = tiles
        .iter()
        .zip(visited.iter())
        .filter(|(tile, seen)| tile.terrain.is_walkable() && !**seen)
        .count();

    if unreachable == 0 {
        Ok(())
    } else {
        Err(HalfMapViolation::Islands { unreachable })
    }
}

/// Positions where both grids carry the same terrain and fortress flag.
pub fn similarity(lhs: &HalfMapGrid, rhs: &HalfMapGrid) -> usize {
    lhs.tiles()
        .iter()
        .zip(rhs.tiles().iter())
        .filter(|(a, b)| a.terrain == b.terrain && a.fortress == b.fortress)
        .count()
}

fn check_similarity(grid: &HalfMapGrid, other: &HalfMapGrid) -> Result<(), HalfMapViolation> {
    let matches = similarity(grid, other);
    if matches > MAX_SIMILAR_TILES {
        Err(HalfMapViolation::TooSimilar { matches })
    } else {
        Ok(())
    }
}
