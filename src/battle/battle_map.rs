//! Battle map: a dense 3-D grid of tiles
//!
//! Level 0 is solid floor by default, everything above is open air.
//! Occupancy is a snapshot written only at tick boundaries.

use serde::{Deserialize, Serialize};

use crate::battle::coords::TilePos;
use crate::battle::tile::{Occupant, Tile, DEFAULT_MOVEMENT_COST, IMPASSABLE};
use crate::core::types::Vec3;

static VOID_TILE: Tile = Tile::void(TilePos::new(-1, -1, -1));
static SKY_TILE: Tile = Tile::sky(TilePos::new(-1, -1, -1));

/// Which wall of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WallSide {
    /// Wall on the x-1 side
    Left,
    /// Wall on the y-1 side
    Right,
}

/// Tiles covered by a unit resting at `pos`
///
/// Large units occupy a 2x2 column whose anchor is the +x/+y corner.
pub fn footprint(pos: TilePos, large: bool) -> impl Iterator<Item = TilePos> {
    const SMALL: &[(i32, i32)] = &[(0, 0)];
    const LARGE: &[(i32, i32)] = &[(0, 0), (-1, 0), (0, -1), (-1, -1)];
    let offsets = if large { LARGE } else { SMALL };
    offsets.iter().map(move |&(dx, dy)| pos.offset(dx, dy, 0))
}

/// The full battle map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleMap {
    pub width: i32,
    pub depth: i32,
    pub levels: i32,
    tiles: Vec<Tile>,
}

impl BattleMap {
    /// Create a map with a walkable floor on level 0
    pub fn new(width: i32, depth: i32, levels: i32) -> Self {
        let width = width.max(1);
        let depth = depth.max(1);
        let levels = levels.max(1);
        let mut tiles = Vec::with_capacity((width * depth * levels) as usize);
        for z in 0..levels {
            for y in 0..depth {
                for x in 0..width {
                    let pos = TilePos::new(x, y, z);
                    tiles.push(if z == 0 { Tile::ground(pos) } else { Tile::air(pos) });
                }
            }
        }
        Self {
            width,
            depth,
            levels,
            tiles,
        }
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if !self.tile_is_valid(pos) {
            return None;
        }
        Some(((pos.z * self.depth + pos.y) * self.width + pos.x) as usize)
    }

    /// Check if coordinate is within map bounds
    pub fn tile_is_valid(&self, pos: TilePos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < self.width
            && pos.y < self.depth
            && pos.z < self.levels
    }

    pub fn get_tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn get_tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    /// Tile at `pos`, or a stand-in when off the map
    ///
    /// Above the top level is open sky; anything else off the map is
    /// an impassable void.
    pub fn tile_or_void(&self, pos: TilePos) -> &Tile {
        match self.get_tile(pos) {
            Some(tile) => tile,
            None if pos.z >= self.levels
                && self.tile_is_valid(TilePos::new(pos.x, pos.y, 0)) =>
            {
                &SKY_TILE
            }
            None => &VOID_TILE,
        }
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Cheapest entry cost of any tile on the map
    pub fn min_entry_cost(&self) -> u8 {
        self.tiles
            .iter()
            .map(|tile| tile.movement_cost_in)
            .min()
            .unwrap_or(DEFAULT_MOVEMENT_COST)
    }

    /// Something to stand on anywhere under the footprint
    pub fn can_stand(&self, pos: TilePos, large: bool) -> bool {
        footprint(pos, large).any(|p| self.tile_or_void(p).can_stand)
    }

    /// Footprint is enterable terrain with room for a body of `max_height`
    pub fn is_passable(&self, pos: TilePos, large: bool, max_height: f32) -> bool {
        footprint(pos, large).all(|p| {
            self.tile_is_valid(p) && self.tile_or_void(p).movement_cost_in != IMPASSABLE
        }) && self.head_fits(pos, large, max_height)
    }

    /// Body of `max_height` standing on the footprint stays clear of the level above
    pub fn head_fits(&self, pos: TilePos, large: bool, max_height: f32) -> bool {
        footprint(pos, large).all(|p| {
            let tile = self.tile_or_void(p);
            tile.height + max_height <= 1.0 || !self.tile_or_void(p.up()).solid_ground
        })
    }

    /// Where a unit stands when at rest on `pos`
    pub fn resting_position(&self, pos: TilePos, large: bool) -> Vec3 {
        if large {
            Vec3::new(pos.x as f32, pos.y as f32, pos.z as f32)
        } else {
            Vec3::new(pos.x as f32 + 0.5, pos.y as f32 + 0.5, pos.z as f32)
        }
    }

    pub fn has_exit(&self, pos: TilePos, large: bool) -> bool {
        footprint(pos, large).any(|p| self.tile_or_void(p).has_exit)
    }

    pub fn occupant_at(&self, pos: TilePos) -> Option<Occupant> {
        self.get_tile(pos).and_then(|t| t.occupant)
    }

    /// Replace the occupancy snapshot
    ///
    /// Large units fill their 2x2 footprint on two levels.
    pub fn commit_occupancy(&mut self, occupants: impl IntoIterator<Item = (TilePos, Occupant)>) {
        for tile in &mut self.tiles {
            tile.occupant = None;
        }
        for (pos, occupant) in occupants {
            let levels = if occupant.large { 2 } else { 1 };
            for dz in 0..levels {
                for p in footprint(pos.offset(0, 0, dz), occupant.large) {
                    if let Some(tile) = self.get_tile_mut(p) {
                        tile.occupant = Some(occupant);
                    }
                }
            }
        }
    }

    /// Open every closed door a step between `from` and `to` could sweep through
    pub fn open_doors_between(&mut self, from: TilePos, to: TilePos, large: bool) -> usize {
        let extra = if large { 1 } else { 0 };
        let mut opened = 0;
        for z in from.z.min(to.z)..=from.z.max(to.z) + extra {
            for y in from.y.min(to.y) - extra..=from.y.max(to.y) {
                for x in from.x.min(to.x) - extra..=from.x.max(to.x) {
                    if let Some(tile) = self.get_tile_mut(TilePos::new(x, y, z)) {
                        if tile.closed_door_left || tile.closed_door_right {
                            tile.closed_door_left = false;
                            tile.closed_door_right = false;
                            opened += 1;
                        }
                    }
                }
            }
        }
        opened
    }

    /// Set the entry cost of a tile
    pub fn set_movement_cost(&mut self, pos: TilePos, cost: u8) {
        if let Some(tile) = self.get_tile_mut(pos) {
            tile.movement_cost_in = cost;
        }
    }

    /// Place a wall with crossing cost `cost`, optionally a closed door
    pub fn set_wall(&mut self, pos: TilePos, side: WallSide, cost: u8, closed_door: bool) {
        if let Some(tile) = self.get_tile_mut(pos) {
            match side {
                WallSide::Left => {
                    tile.movement_cost_left = cost;
                    tile.closed_door_left = closed_door;
                }
                WallSide::Right => {
                    tile.movement_cost_right = cost;
                    tile.closed_door_right = closed_door;
                }
            }
        }
    }

    /// Put a walkable floor on a tile
    pub fn set_floor(&mut self, pos: TilePos) {
        if let Some(tile) = self.get_tile_mut(pos) {
            *tile = Tile {
                occupant: tile.occupant,
                ..Tile::ground(pos)
            };
        }
    }

    /// Remove the floor of a tile, leaving open air
    pub fn clear_floor(&mut self, pos: TilePos) {
        if let Some(tile) = self.get_tile_mut(pos) {
            *tile = Tile {
                occupant: tile.occupant,
                ..Tile::air(pos)
            };
        }
    }

    /// Set the obstruction height standing on a tile
    pub fn set_height(&mut self, pos: TilePos, height: f32) {
        if let Some(tile) = self.get_tile_mut(pos) {
            tile.height = height.clamp(0.0, 1.0);
        }
    }

    pub fn set_lift(&mut self, pos: TilePos, has_lift: bool) {
        if let Some(tile) = self.get_tile_mut(pos) {
            tile.has_lift = has_lift;
        }
    }

    pub fn set_exit(&mut self, pos: TilePos, has_exit: bool) {
        if let Some(tile) = self.get_tile_mut(pos) {
            tile.has_exit = has_exit;
        }
    }
}
