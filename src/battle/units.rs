//! Battle units: body capabilities, live state, and mission queue
//!
//! `UnitState` is everything a mission may read or change about its own
//! unit. Other units are only reached through messages.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::battle::adjacency::MoverProfile;
use crate::battle::battle_map::BattleMap;
use crate::battle::constants::{DEFAULT_BODY_HEIGHT, DEFAULT_TIME_UNITS};
use crate::battle::coords::{Facing, TilePos};
use crate::battle::items::Inventory;
use crate::battle::ledger::TimeUnitAccount;
use crate::battle::mission_queue::MissionQueue;
use crate::battle::stance::BodyState;
use crate::core::types::{ForceId, UnitId, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Vitality {
    #[default]
    Active,
    Unconscious,
    Dead,
}

/// How a unit prefers to travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementMode {
    #[default]
    Walking,
    Running,
    Prone,
}

/// What the unit's legs are doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MovementState {
    #[default]
    None,
    Normal,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeClass {
    #[default]
    Small,
    /// 2x2 tiles, two levels tall
    Large,
}

/// Capabilities fixed by a unit's body type and equipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyProfile {
    pub max_height: f32,
    pub allowed_body_states: Vec<BodyState>,
    pub allowed_facings: Vec<Facing>,
    pub can_fly: bool,
    pub can_run: bool,
    pub size: SizeClass,
}

impl BodyProfile {
    /// Human-sized walker
    pub fn soldier() -> Self {
        Self {
            max_height: DEFAULT_BODY_HEIGHT,
            allowed_body_states: vec![
                BodyState::Standing,
                BodyState::Kneeling,
                BodyState::Prone,
                BodyState::Throwing,
            ],
            allowed_facings: Facing::ALL.to_vec(),
            can_fly: false,
            can_run: true,
            size: SizeClass::Small,
        }
    }

    /// Soldier in a flying suit
    pub fn flyer() -> Self {
        let mut profile = Self::soldier();
        profile.allowed_body_states.push(BodyState::Flying);
        profile.can_fly = true;
        profile
    }

    /// 2x2 walker that cannot crouch
    pub fn large() -> Self {
        Self {
            max_height: 1.0,
            allowed_body_states: vec![BodyState::Standing],
            allowed_facings: Facing::ALL.to_vec(),
            can_fly: false,
            can_run: false,
            size: SizeClass::Large,
        }
    }

    pub fn is_large(&self) -> bool {
        self.size == SizeClass::Large
    }

    pub fn is_body_state_allowed(&self, state: BodyState) -> bool {
        self.allowed_body_states.contains(&state)
    }

    pub fn is_facing_allowed(&self, facing: Facing) -> bool {
        self.allowed_facings.contains(&facing)
    }
}

/// Maximum values a unit regenerates toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitStats {
    pub time_units: u32,
}

impl Default for UnitStats {
    fn default() -> Self {
        Self {
            time_units: DEFAULT_TIME_UNITS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitState {
    pub id: UnitId,
    pub owner: ForceId,
    pub profile: BodyProfile,
    pub stats: UnitStats,
    pub time_units: u32,

    pub position: Vec3,
    pub goal_position: Vec3,
    pub at_goal: bool,
    pub falling: bool,

    pub facing: Facing,
    pub goal_facing: Facing,
    pub current_body_state: BodyState,
    pub target_body_state: BodyState,

    pub movement_mode: MovementMode,
    pub movement_state: MovementState,
    pub vitality: Vitality,
    pub inventory: Inventory,
    pub retreated: bool,
}

impl UnitState {
    pub fn new(id: UnitId, owner: ForceId, profile: BodyProfile, position: Vec3) -> Self {
        let stats = UnitStats::default();
        let body = if profile.is_body_state_allowed(BodyState::Standing) {
            BodyState::Standing
        } else {
            BodyState::best_resting(false, |s| profile.is_body_state_allowed(s))
                .unwrap_or_default()
        };
        Self {
            id,
            owner,
            profile,
            stats,
            time_units: stats.time_units,
            position,
            goal_position: position,
            at_goal: true,
            falling: false,
            facing: Facing::North,
            goal_facing: Facing::North,
            current_body_state: body,
            target_body_state: body,
            movement_mode: MovementMode::Walking,
            movement_state: MovementState::None,
            vitality: Vitality::Active,
            inventory: Inventory::new(),
            retreated: false,
        }
    }

    pub fn with_stats(mut self, stats: UnitStats) -> Self {
        self.stats = stats;
        self.time_units = stats.time_units;
        self
    }

    pub fn is_large(&self) -> bool {
        self.profile.is_large()
    }

    pub fn can_fly(&self) -> bool {
        self.profile.can_fly
    }

    /// Conscious, alive and still on the battlefield
    pub fn can_move(&self) -> bool {
        self.vitality == Vitality::Active && !self.retreated
    }

    pub fn is_unconscious(&self) -> bool {
        self.vitality == Vitality::Unconscious
    }

    pub fn is_dead(&self) -> bool {
        self.vitality == Vitality::Dead
    }

    /// Tile the unit is in right now
    pub fn tile(&self) -> TilePos {
        TilePos::containing(self.position)
    }

    /// Tile the unit is heading to (its current tile when at rest)
    pub fn goal_tile(&self) -> TilePos {
        TilePos::containing(self.goal_position)
    }

    pub fn is_body_state_allowed(&self, state: BodyState) -> bool {
        self.profile.is_body_state_allowed(state)
    }

    pub fn is_facing_allowed(&self, facing: Facing) -> bool {
        self.profile.is_facing_allowed(facing)
    }

    /// Allowed facing closest to the direction of `to` from the current tile
    pub fn facing_toward_tile(&self, to: TilePos) -> Facing {
        let from = self.tile();
        Facing::toward(
            Vec3::new(from.x as f32, from.y as f32, from.z as f32),
            Vec3::new(to.x as f32, to.y as f32, to.z as f32),
            self.facing,
            |f| self.is_facing_allowed(f),
        )
    }

    /// One allowed rotation step toward `target`
    pub fn facing_step(&self, target: Facing) -> Facing {
        self.facing
            .step_toward(target, |f| self.is_facing_allowed(f))
    }

    /// Regain TU, capped at the maximum
    pub fn regen(&mut self, amount: u32) {
        self.time_units = (self.time_units + amount).min(self.stats.time_units);
    }

    /// Place the unit and stop any movement in progress
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.reset_goal();
    }

    pub fn reset_goal(&mut self) {
        self.goal_position = self.position;
        self.at_goal = true;
    }

    pub fn set_body_state(&mut self, state: BodyState) {
        self.current_body_state = state;
        self.target_body_state = state;
    }

    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
        self.goal_facing = facing;
    }

    pub fn set_movement_state(&mut self, state: MovementState) {
        self.movement_state = state;
    }

    /// Whether the unit could lie prone on `pos` facing `facing`
    ///
    /// A prone body also covers the tile behind it, which must be free
    /// and offer something to lie on.
    pub fn can_prone(&self, map: &BattleMap, pos: TilePos, facing: Facing) -> bool {
        if self.is_large() || !self.is_body_state_allowed(BodyState::Prone) {
            return false;
        }
        if !map.can_stand(pos, false) {
            return false;
        }
        let behind = pos.step(facing.opposite());
        match map.get_tile(behind) {
            Some(tile) => {
                tile.can_stand
                    && !tile.is_impassable()
                    && tile.blocking_unit(self.id, false, None).is_none()
            }
            None => false,
        }
    }

    pub fn mover_profile(&self) -> MoverProfile {
        MoverProfile {
            id: self.id,
            owner: self.owner,
            large: self.is_large(),
            can_fly: self.can_fly(),
            max_height: self.profile.max_height,
        }
    }

    /// Switch the legs into the gait matching mode and posture
    pub fn make_agent_move(&mut self) {
        if self.movement_mode == MovementMode::Running
            && self.current_body_state != BodyState::Prone
        {
            self.set_movement_state(MovementState::Running);
        } else if self.current_body_state != BodyState::Kneeling
            && self.current_body_state != BodyState::Throwing
        {
            self.set_movement_state(MovementState::Normal);
        } else {
            error!(
                "Unit {:?} asked to move while {}",
                self.id, self.current_body_state
            );
        }
    }

    /// Leave the battle through an exit
    pub fn retreat(&mut self) {
        self.retreated = true;
        self.set_movement_state(MovementState::None);
    }
}

impl TimeUnitAccount for UnitState {
    fn time_units(&self) -> u32 {
        self.time_units
    }

    fn try_spend_time_units(&mut self, cost: u32) -> bool {
        if cost > self.time_units {
            return false;
        }
        self.time_units -= cost;
        true
    }
}

/// A unit on the battlefield together with its queued intentions
#[derive(Debug, Clone)]
pub struct BattleUnit {
    pub state: UnitState,
    pub missions: MissionQueue,
}

impl BattleUnit {
    pub fn new(state: UnitState) -> Self {
        Self {
            state,
            missions: MissionQueue::new(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.state.id
    }

    /// Not moving, turning or changing posture, and nothing left to do
    pub fn is_idle(&self) -> bool {
        self.missions.is_empty()
            && self.state.at_goal
            && !self.state.falling
            && self.state.facing == self.state.goal_facing
            && self.state.current_body_state == self.state.target_body_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn soldier_at(x: f32, y: f32) -> UnitState {
        UnitState::new(
            UnitId(0),
            ForceId(0),
            BodyProfile::soldier(),
            Vec3::new(x, y, 0.0),
        )
    }

    #[test]
    fn test_new_unit_at_rest() {
        let unit = soldier_at(5.5, 5.5);
        assert!(unit.at_goal);
        assert_eq!(unit.tile(), TilePos::new(5, 5, 0));
        assert_eq!(unit.time_units, DEFAULT_TIME_UNITS);
        assert_eq!(unit.current_body_state, BodyState::Standing);
    }

    #[test]
    fn test_large_unit_starts_standing() {
        let unit = UnitState::new(UnitId(1), ForceId(0), BodyProfile::large(), Vec3::default());
        assert!(unit.is_large());
        assert_eq!(unit.current_body_state, BodyState::Standing);
    }

    #[test]
    fn test_spend_never_negative() {
        let mut unit = soldier_at(0.5, 0.5).with_stats(UnitStats { time_units: 5 });
        assert!(!unit.try_spend_time_units(6));
        assert_eq!(unit.time_units, 5);
        assert!(unit.try_spend_time_units(5));
        assert_eq!(unit.time_units, 0);
    }

    #[test]
    fn test_regen_capped() {
        let mut unit = soldier_at(0.5, 0.5).with_stats(UnitStats { time_units: 10 });
        unit.time_units = 8;
        unit.regen(5);
        assert_eq!(unit.time_units, 10);
    }

    #[test]
    fn test_facing_toward_tile() {
        let unit = soldier_at(5.5, 5.5);
        assert_eq!(unit.facing_toward_tile(TilePos::new(6, 5, 0)), Facing::East);
        assert_eq!(unit.facing_toward_tile(TilePos::new(4, 4, 0)), Facing::NorthWest);
    }

    #[test]
    fn test_can_prone_needs_room_behind() {
        let mut map = BattleMap::new(10, 10, 1);
        let unit = soldier_at(5.5, 5.5);
        let pos = TilePos::new(5, 5, 0);
        assert!(unit.can_prone(&map, pos, Facing::North));

        // Facing north, the legs lie on the tile to the south
        map.clear_floor(TilePos::new(5, 6, 0));
        assert!(!unit.can_prone(&map, pos, Facing::North));
        assert!(unit.can_prone(&map, pos, Facing::South));

        // Off the map behind
        assert!(!unit.can_prone(&map, TilePos::new(0, 0, 0), Facing::East));
    }

    #[test]
    fn test_make_agent_move() {
        let mut unit = soldier_at(0.5, 0.5);
        unit.movement_mode = MovementMode::Running;
        unit.make_agent_move();
        assert_eq!(unit.movement_state, MovementState::Running);

        unit.set_movement_state(MovementState::None);
        unit.set_body_state(BodyState::Prone);
        unit.make_agent_move();
        assert_eq!(unit.movement_state, MovementState::Normal);

        unit.set_movement_state(MovementState::None);
        unit.set_body_state(BodyState::Kneeling);
        unit.make_agent_move();
        assert_eq!(unit.movement_state, MovementState::None);
    }

    #[test]
    fn test_retreat() {
        let mut unit = soldier_at(0.5, 0.5);
        assert!(unit.can_move());
        unit.retreat();
        assert!(!unit.can_move());
    }
}
