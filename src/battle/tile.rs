//! A single cell of the 3-D battle grid
//!
//! Walls are stored on the tile that owns them: the left wall sits on the
//! x-1 side of a tile, the right wall on its y-1 side.

use serde::{Deserialize, Serialize};

use crate::battle::coords::TilePos;
use crate::core::types::{ForceId, UnitId};

/// Movement cost that can never be paid
pub const IMPASSABLE: u8 = 255;

/// Entry cost of plain open ground
pub const DEFAULT_MOVEMENT_COST: u8 = 4;

/// Unit recorded as resting on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub unit: UnitId,
    pub owner: ForceId,
    pub large: bool,
    /// Moving units are present but not static
    pub moving: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub position: TilePos,
    pub movement_cost_in: u8,
    pub movement_cost_left: u8,
    pub movement_cost_right: u8,
    pub closed_door_left: bool,
    pub closed_door_right: bool,
    pub solid_ground: bool,
    pub has_lift: bool,
    pub can_stand: bool,
    /// Obstruction height, normalized to a full tile
    pub height: f32,
    /// Units finishing a retreat order here leave the battle
    pub has_exit: bool,
    #[serde(skip)]
    pub occupant: Option<Occupant>,
}

impl Tile {
    /// Walkable floor
    pub fn ground(position: TilePos) -> Self {
        Self {
            position,
            movement_cost_in: DEFAULT_MOVEMENT_COST,
            movement_cost_left: 0,
            movement_cost_right: 0,
            closed_door_left: false,
            closed_door_right: false,
            solid_ground: true,
            has_lift: false,
            can_stand: true,
            height: 0.0,
            has_exit: false,
            occupant: None,
        }
    }

    /// Empty air; passable but nothing to stand on
    pub fn air(position: TilePos) -> Self {
        Self {
            solid_ground: false,
            can_stand: false,
            ..Self::ground(position)
        }
    }

    /// Stand-in for coordinates beside the map
    pub const fn void(position: TilePos) -> Self {
        Self {
            position,
            movement_cost_in: IMPASSABLE,
            movement_cost_left: IMPASSABLE,
            movement_cost_right: IMPASSABLE,
            closed_door_left: false,
            closed_door_right: false,
            solid_ground: true,
            has_lift: false,
            can_stand: false,
            height: 0.0,
            has_exit: false,
            occupant: None,
        }
    }

    /// Stand-in for coordinates above the top level
    pub const fn sky(position: TilePos) -> Self {
        Self {
            position,
            movement_cost_in: 0,
            movement_cost_left: 0,
            movement_cost_right: 0,
            closed_door_left: false,
            closed_door_right: false,
            solid_ground: false,
            has_lift: false,
            can_stand: false,
            height: 0.0,
            has_exit: false,
            occupant: None,
        }
    }

    pub fn is_impassable(&self) -> bool {
        self.movement_cost_in == IMPASSABLE
    }

    /// Unit resting here that blocks `mover`
    ///
    /// With `static_only`, moving units are ignored. Small units owned by
    /// `give_way_for` are ignored too, since they can be asked to yield.
    pub fn blocking_unit(
        &self,
        mover: UnitId,
        static_only: bool,
        give_way_for: Option<ForceId>,
    ) -> Option<Occupant> {
        let occupant = self.occupant?;
        if occupant.unit == mover || (static_only && occupant.moving) {
            return None;
        }
        if give_way_for == Some(occupant.owner) && !occupant.large {
            return None;
        }
        Some(occupant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn occupant(unit: u32, owner: u32, large: bool) -> Occupant {
        Occupant {
            unit: UnitId(unit),
            owner: ForceId(owner),
            large,
            moving: false,
        }
    }

    #[test]
    fn test_ground_defaults() {
        let tile = Tile::ground(TilePos::new(1, 2, 0));
        assert!(tile.can_stand);
        assert!(tile.solid_ground);
        assert_eq!(tile.movement_cost_in, DEFAULT_MOVEMENT_COST);
        assert!(!tile.is_impassable());
    }

    #[test]
    fn test_air_has_no_floor() {
        let tile = Tile::air(TilePos::new(1, 2, 1));
        assert!(!tile.can_stand);
        assert!(!tile.solid_ground);
    }

    #[test]
    fn test_void_is_impassable() {
        assert!(Tile::void(TilePos::new(-1, 0, 0)).is_impassable());
        assert!(!Tile::sky(TilePos::new(0, 0, 9)).is_impassable());
    }

    #[test]
    fn test_blocking_unit_skips_self() {
        let mut tile = Tile::ground(TilePos::default());
        tile.occupant = Some(occupant(1, 0, false));
        assert!(tile.blocking_unit(UnitId(1), true, None).is_none());
        assert!(tile.blocking_unit(UnitId(2), true, None).is_some());
    }

    #[test]
    fn test_blocking_unit_give_way() {
        let mut tile = Tile::ground(TilePos::default());
        tile.occupant = Some(occupant(1, 0, false));
        // Small ally can be asked to yield
        assert!(tile.blocking_unit(UnitId(2), true, Some(ForceId(0))).is_none());
        // Enemy cannot
        assert!(tile.blocking_unit(UnitId(2), true, Some(ForceId(1))).is_some());

        tile.occupant = Some(occupant(1, 0, true));
        assert!(tile.blocking_unit(UnitId(2), true, Some(ForceId(0))).is_some());
    }

    #[test]
    fn test_moving_units_not_static() {
        let mut tile = Tile::ground(TilePos::default());
        tile.occupant = Some(Occupant {
            moving: true,
            ..occupant(1, 0, false)
        });
        assert!(tile.blocking_unit(UnitId(2), true, None).is_none());
        assert!(tile.blocking_unit(UnitId(2), false, None).is_some());
    }
}
