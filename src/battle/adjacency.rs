//! Tile adjacency: can a unit step from one tile to a neighbour, and at what cost
//!
//! The evaluator is a pure function of the map snapshot and the mover's
//! body. It is used both as the planner's edge oracle and to re-validate
//! each step right before a unit takes it.

use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use tracing::{error, trace};

use crate::battle::battle_map::{footprint, BattleMap};
use crate::battle::coords::TilePos;
use crate::battle::tile::{Tile, DEFAULT_MOVEMENT_COST, IMPASSABLE};
use crate::core::error::{Result, TacticalError};
use crate::core::types::{ForceId, UnitId};

/// Body attributes of the unit asking to move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoverProfile {
    pub id: UnitId,
    pub owner: ForceId,
    pub large: bool,
    pub can_fly: bool,
    /// Body height, normalized to a full tile
    pub max_height: f32,
}

/// Price of an admissible step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepCost {
    pub cost: f32,
    pub door_in_the_way: bool,
}

/// Planner heuristic: twice the longest axis plus the sum of all axes
///
/// Equals the cheapest route over tiles costing `DEFAULT_MOVEMENT_COST`, so
/// it never overestimates on such maps. Evaluators scale it by the map's
/// cheapest tile; free falls are not covered.
pub fn distance_static(from: TilePos, to: TilePos) -> f32 {
    let dx = (to.x - from.x).abs();
    let dy = (to.y - from.y).abs();
    let dz = (to.z - from.z).abs();
    ((dx.max(dy).max(dz) + dx + dy + dz) * 2) as f32
}

/// Cost multiplier for a step changing `axes` coordinates
pub fn cost_modifier(axes: u32) -> f32 {
    0.5 + 0.5 * axes as f32
}

/// Highest wall cost crossed and whether any of those walls is a closed door
#[derive(Debug, Clone, Copy, Default)]
struct Sweep {
    cost: u8,
    door: bool,
}

impl Sweep {
    fn enter(&mut self, tile: &Tile) {
        self.cost = self.cost.max(tile.movement_cost_in);
    }

    fn left(&mut self, tile: &Tile) {
        self.cost = self.cost.max(tile.movement_cost_left);
        self.door |= tile.closed_door_left;
    }

    fn right(&mut self, tile: &Tile) {
        self.cost = self.cost.max(tile.movement_cost_right);
        self.door |= tile.closed_door_right;
    }
}

fn floor_or_lift(tile: &Tile) -> bool {
    tile.solid_ground || tile.has_lift
}

pub struct TileAdjacencyEvaluator<'a> {
    map: &'a BattleMap,
    mover: MoverProfile,
    ascend_height: f32,
    distance_scale: OnceCell<f32>,
}

impl<'a> TileAdjacencyEvaluator<'a> {
    pub fn new(map: &'a BattleMap, mover: MoverProfile, ascend_height: f32) -> Self {
        Self {
            map,
            mover,
            ascend_height,
            distance_scale: OnceCell::new(),
        }
    }

    /// `distance_static` scaled down to the map's cheapest entry cost
    pub fn heuristic_distance(&self, from: TilePos, to: TilePos) -> f32 {
        let scale = *self.distance_scale.get_or_init(|| {
            f32::from(self.map.min_entry_cost()) / f32::from(DEFAULT_MOVEMENT_COST)
        });
        distance_static(from, to) * scale
    }

    pub fn map(&self) -> &'a BattleMap {
        self.map
    }

    pub fn mover(&self) -> &MoverProfile {
        &self.mover
    }

    /// Admissibility and cost of stepping from `from` to `to`
    ///
    /// Misuse (unknown tiles, a step onto itself) is logged and treated as
    /// not admissible.
    pub fn can_enter(
        &self,
        from: TilePos,
        to: TilePos,
        ignore_units: bool,
        demand_give_way: bool,
    ) -> Option<StepCost> {
        match self.try_enter(from, to, ignore_units, demand_give_way) {
            Ok(step) => step,
            Err(e) => {
                error!("Unit {:?} cannot evaluate step: {}", self.mover.id, e);
                None
            }
        }
    }

    fn tile(&self, x: i32, y: i32, z: i32) -> &'a Tile {
        self.map.tile_or_void(TilePos::new(x, y, z))
    }

    /// Like `can_enter`, but reports misuse as an error
    ///
    /// `Ok(None)` is a normal negative answer. With `demand_give_way`, small
    /// allied units in the way are disregarded since they can be asked to move.
    pub fn try_enter(
        &self,
        from: TilePos,
        to: TilePos,
        ignore_units: bool,
        demand_give_way: bool,
    ) -> Result<Option<StepCost>> {
        if from == to {
            return Err(TacticalError::SameTile(from));
        }
        if !self.map.tile_is_valid(from) {
            return Err(TacticalError::OffMap(from));
        }
        if !self.map.tile_is_valid(to) {
            return Err(TacticalError::OffMap(to));
        }

        let large = self.mover.large;
        let flying = self.mover.can_fly;
        let give_way_for = demand_give_way.then_some(self.mover.owner);
        let blocked = |tile: &Tile| {
            !ignore_units
                && tile
                    .blocking_unit(self.mover.id, true, give_way_for)
                    .is_some()
        };
        let to_tile = self.tile(to.x, to.y, to.z);

        let mut sweep = Sweep::default();

        // Destination footprint, including head level for large units
        if large {
            if to.x < 1 || to.y < 1 || to.z + 1 >= self.map.levels {
                return Ok(None);
            }
            let lower: Vec<&Tile> = footprint(to, true).map(|p| self.map.tile_or_void(p)).collect();
            let upper: Vec<&Tile> = footprint(to.up(), true)
                .map(|p| self.map.tile_or_void(p))
                .collect();
            if upper.iter().any(|t| t.solid_ground) {
                return Ok(None);
            }
            if lower.iter().chain(upper.iter()).any(|&t| blocked(t)) {
                return Ok(None);
            }
            for tile in lower.iter().chain(upper.iter()) {
                sweep.enter(tile);
            }
            // Walls inside the footprint: [to, x-1, y-1, x-1/y-1] per level
            sweep.left(lower[0]);
            sweep.right(lower[1]);
            sweep.left(lower[2]);
            sweep.left(upper[0]);
            sweep.right(upper[0]);
            sweep.right(upper[1]);
            sweep.left(upper[2]);
            sweep.door |= lower[0].closed_door_right;
        } else {
            if blocked(to_tile) {
                return Ok(None);
            }
            sweep.enter(to_tile);
        }
        if sweep.cost == IMPASSABLE {
            return Ok(None);
        }

        // Never pick a step that leaves a walker without a floor
        if !flying && !self.map.can_stand(to, large) {
            return Ok(None);
        }

        // Falling: straight down only, and free
        if !flying && !self.map.can_stand(from, large) {
            if from.x != to.x || from.y != to.y || to.z >= from.z {
                return Ok(None);
            }
            trace!("Unit {:?} falling {:?} -> {:?}", self.mover.id, from, to);
            return Ok(Some(StepCost {
                cost: 0.0,
                door_in_the_way: false,
            }));
        }

        // Leaving a lift sideways while going down
        if to.z < from.z
            && (from.x != to.x || from.y != to.y)
            && footprint(from, large).any(|p| self.map.tile_or_void(p).has_lift)
        {
            return Ok(None);
        }

        if to.z > from.z && !self.can_ascend(from, to) {
            return Ok(None);
        }

        if !self.map.head_fits(to, large, self.mover.max_height) {
            return Ok(None);
        }

        let z = from.z.max(to.z);
        let going_down = from.z > to.z;
        let swept = if large {
            self.sweep_large(from, to, z, going_down, &blocked, &mut sweep)
                && self.sweep_columns(from, to, z, going_down, &blocked, &mut sweep)
        } else {
            self.sweep_small(from, to, z, going_down, &blocked, &mut sweep)
        };
        if !swept || sweep.cost == IMPASSABLE {
            return Ok(None);
        }

        let cost = sweep.cost as f32 * cost_modifier(from.changed_axes(&to));
        trace!(
            "Unit {:?} step {:?} -> {:?} costs {}",
            self.mover.id,
            from,
            to,
            cost
        );
        Ok(Some(StepCost {
            cost,
            door_in_the_way: sweep.door,
        }))
    }

    fn can_ascend(&self, from: TilePos, to: TilePos) -> bool {
        let large = self.mover.large;
        let high_enough =
            footprint(from, large).any(|p| self.map.tile_or_void(p).height >= self.ascend_height);
        let from_lift = footprint(from, large).any(|p| self.map.tile_or_void(p).has_lift);
        let to_lift = footprint(to, large).any(|p| self.map.tile_or_void(p).has_lift);
        let straight_up = from.x == to.x && from.y == to.y;

        if !(high_enough && !to_lift) && !(from_lift && to_lift && straight_up) {
            // Only flyers get up any other way, and only into open air
            if !self.mover.can_fly || self.map.can_stand(to, large) {
                return false;
            }
        }

        // Head bump on departure
        let head_level = if large { 2 } else { 1 };
        !footprint(from, large).any(|p| {
            self.map
                .tile_or_void(p.offset(0, 0, head_level))
                .solid_ground
        })
    }

    fn sweep_small(
        &self,
        from: TilePos,
        to: TilePos,
        z: i32,
        going_down: bool,
        blocked: &dyn Fn(&Tile) -> bool,
        sweep: &mut Sweep,
    ) -> bool {
        let (min_x, max_x) = (from.x.min(to.x), from.x.max(to.x));
        let (min_y, max_y) = (from.y.min(to.y), from.y.max(to.y));

        if from.x != to.x && from.y != to.y {
            let top_left = self.tile(min_x, min_y, z);
            let top_right = self.tile(max_x, min_y, z);
            let bottom_left = self.tile(min_x, max_y, z);
            let bottom_right = self.tile(max_x, max_y, z);

            sweep.left(top_right);
            sweep.right(bottom_left);
            sweep.left(bottom_right);
            sweep.right(bottom_right);

            // Corners of the diagonal must be clear
            let corners = if from.x - to.x == from.y - to.y {
                [bottom_left, top_right]
            } else {
                [top_left, bottom_right]
            };
            if corners.iter().any(|&t| t.is_impassable() || blocked(t)) {
                return false;
            }

            if going_down {
                // Every tile of the square except the destination column
                let east = to.x > from.x;
                let south = to.y > from.y;
                if !(east && south) && floor_or_lift(top_left) {
                    return false;
                }
                if !(!east && south) && floor_or_lift(top_right) {
                    return false;
                }
                if !(east && !south) && floor_or_lift(bottom_left) {
                    return false;
                }
                if !(!east && !south) && floor_or_lift(bottom_right) {
                    return false;
                }
            }
        } else if from.x != to.x || from.y != to.y {
            let bottom_right = self.tile(max_x, max_y, z);
            if from.x != to.x {
                sweep.left(bottom_right);
            } else {
                sweep.right(bottom_right);
            }
            if going_down && floor_or_lift(self.tile(to.x, to.y, to.z + 1)) {
                return false;
            }
        } else if going_down && self.tile(from.x, from.y, from.z).solid_ground {
            return false;
        }
        true
    }

    /// Every column of a large footprint crosses what a small body would
    ///
    /// The trailing column sweeps walls inside the origin footprint that the
    /// destination-side sweep never sees.
    fn sweep_columns(
        &self,
        from: TilePos,
        to: TilePos,
        z: i32,
        going_down: bool,
        blocked: &dyn Fn(&Tile) -> bool,
        sweep: &mut Sweep,
    ) -> bool {
        footprint(from, true)
            .zip(footprint(to, true))
            .all(|(a, b)| self.sweep_small(a, b, z, going_down, blocked, sweep))
    }

    fn sweep_large(
        &self,
        from: TilePos,
        to: TilePos,
        z: i32,
        going_down: bool,
        blocked: &dyn Fn(&Tile) -> bool,
        sweep: &mut Sweep,
    ) -> bool {
        let mx = from.x.max(to.x);
        let my = from.y.max(to.y);
        let head = to.z + 2;
        let at = |x: i32, y: i32, z: i32| self.tile(x, y, z);
        let lifts_above_destination = || {
            footprint(to.up(), true).any(|p| self.map.tile_or_void(p).has_lift)
        };

        if from.x != to.x && from.y != to.y {
            if from.x - to.x == from.y - to.y {
                // South-east or north-west
                let levels = [z, z + 1].map(|level| {
                    (
                        at(mx, my - 2, level),
                        at(mx, my - 1, level),
                        at(mx - 2, my, level),
                        at(mx - 1, my, level),
                    )
                });
                for &(right_top, right_bottom, bottom_left, bottom_right) in &levels {
                    sweep.left(right_top);
                    sweep.right(right_bottom);
                    sweep.right(bottom_left);
                    sweep.left(bottom_right);
                }
                let corners = [levels[0].2, levels[0].0, levels[1].2, levels[1].0];
                if corners.iter().any(|&t| t.is_impassable() || blocked(t)) {
                    return false;
                }
                if going_down {
                    let (right_top, right_bottom, bottom_left, bottom_right) = levels[1];
                    let clear = if to.x > from.x {
                        ![
                            at(to.x, to.y, head),
                            right_bottom,
                            bottom_right,
                            right_top,
                            bottom_left,
                        ]
                        .iter()
                        .any(|&t| floor_or_lift(t))
                    } else {
                        ![
                            at(to.x - 1, to.y, head),
                            at(to.x - 1, to.y - 1, head),
                            at(to.x, to.y - 1, head),
                            right_top,
                            bottom_left,
                        ]
                        .iter()
                        .any(|&t| floor_or_lift(t))
                            && !lifts_above_destination()
                    };
                    if !clear {
                        return false;
                    }
                }
            } else {
                // North-east or south-west
                let levels = [z, z + 1].map(|level| {
                    (
                        at(mx - 2, my - 2, level),
                        at(mx - 1, my - 2, level),
                        at(mx - 2, my - 1, level),
                        at(mx, my, level),
                    )
                });
                for &(_, top, left, bottom_right) in &levels {
                    sweep.left(top);
                    sweep.right(left);
                    sweep.left(bottom_right);
                    sweep.right(bottom_right);
                }
                let corners = [levels[0].0, levels[0].3, levels[1].0, levels[1].3];
                if corners.iter().any(|&t| t.is_impassable() || blocked(t)) {
                    return false;
                }
                if going_down {
                    let (top_left, top, left, bottom_right) = levels[1];
                    let above = if to.x > from.x {
                        [at(to.x, to.y, head), at(to.x, to.y - 1, head), top_left, top, bottom_right]
                    } else {
                        [at(to.x - 1, to.y, head), at(to.x, to.y, head), top_left, left, bottom_right]
                    };
                    if above.iter().any(|&t| floor_or_lift(t)) || lifts_above_destination() {
                        return false;
                    }
                }
            }
        } else if from.x != to.x {
            let top = [at(to.x, to.y - 1, z), at(to.x, to.y - 1, z + 1)];
            let bottom = [at(to.x, to.y, z), at(to.x, to.y, z + 1)];
            for tile in top.iter().chain(bottom.iter()) {
                sweep.left(tile);
            }
            if going_down {
                let above = [
                    top[1],
                    bottom[1],
                    at(to.x - 1, to.y - 1, head),
                    at(to.x - 1, to.y, head),
                ];
                if above.iter().any(|&t| floor_or_lift(t)) || lifts_above_destination() {
                    return false;
                }
            }
        } else if from.y != to.y {
            let left = [at(to.x - 1, to.y, z), at(to.x - 1, to.y, z + 1)];
            let right = [at(to.x, to.y, z), at(to.x, to.y, z + 1)];
            for tile in left.iter().chain(right.iter()) {
                sweep.right(tile);
            }
            if going_down {
                let above = [
                    left[1],
                    right[1],
                    at(to.x - 1, to.y - 1, head),
                    at(to.x, to.y - 1, head),
                ];
                if above.iter().any(|&t| floor_or_lift(t)) || lifts_above_destination() {
                    return false;
                }
            }
        } else if going_down
            && footprint(from, true).any(|p| self.map.tile_or_void(p).solid_ground)
        {
            return false;
        }
        true
    }
}
