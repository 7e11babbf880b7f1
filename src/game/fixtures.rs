//! Half-map fixtures shared by the unit tests.
//!
//! Rows are written top to bottom, one character per tile:
//! `G` grass, `M` mountain, `W` water, `F` grass carrying the fortress.

use crate::core::ids::PlayerToken;
use crate::game::map::{HalfMap, HalfMapTile, Terrain};

/// A valid half-map: 16 grass, 12 mountain, 4 water, fortress at (0, 0).
pub const MAP_A: [&str; 4] = ["FMGMGMGM", "MGMGMGMG", "GWGMGWGM", "MGWGWGMG"];

/// A valid half-map sharing no position with [`MAP_A`], fortress at (1, 0).
pub const MAP_B: [&str; 4] = ["MFMGMGMG", "GMGWGWGM", "MGWGWGMG", "GMGMGMGM"];

/// Parse rows into a submission from `player_id`.
pub fn half_map(player_id: PlayerToken, rows: [&str; 4]) -> HalfMap {
    let mut tiles = Vec::with_capacity(32);
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            let (x, y) = (x as u32, y as u32);
            let tile = match c {
                'G' => HalfMapTile::new(x, y, Terrain::Grass),
                'M' => HalfMapTile::new(x, y, Terrain::Mountain),
                'W' => HalfMapTile::new(x, y, Terrain::Water),
                'F' => HalfMapTile::fortress(x, y, Terrain::Grass),
                other => panic!("unknown tile {:?}", other),
            };
            tiles.push(tile);
        }
    }
    HalfMap::new(player_id, tiles)
}
