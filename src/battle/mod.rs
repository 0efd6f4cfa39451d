//! Battle system - unit movement and actions on a 3-D tile grid
//!
//! Units carry a queue of missions. Each tick the simulation asks the front
//! mission for at most one change (posture, facing or position), paid for in
//! time units. Step legality comes from the adjacency evaluator; routes from
//! a pluggable path planner.

pub mod adjacency;
pub mod battle_map;
pub mod constants;
pub mod coords;
pub mod give_way;
pub mod items;
pub mod ledger;
pub mod mission;
pub mod mission_queue;
pub mod pathfinding;
pub mod simulation;
pub mod stance;
pub mod tile;
pub mod units;

// Re-exports for convenient access
pub use adjacency::{cost_modifier, distance_static, MoverProfile, StepCost, TileAdjacencyEvaluator};
pub use battle_map::{footprint, BattleMap, WallSide};
pub use constants::*;
pub use coords::{Facing, TilePos};
pub use give_way::{GiveWayRequest, GiveWayResponse};
pub use items::{
    AudioService, BattleItems, Equipment, EquipmentKind, Inventory, ItemService, SoundCue,
    SoundEvent, SoundLog, ThrowVelocity, WorldItem,
};
pub use ledger::{ResourceLedger, SpendOutcome, TimeUnitAccount};
pub use mission::{GotoOptions, GotoState, Mission, MissionKind};
pub use mission_queue::{DoorRequest, MissionContext, MissionQueue};
pub use pathfinding::{path_cost, AStarPlanner, MoveCostOracle, PathPlanner, PathResult};
pub use simulation::{
    BattleEvent, BattleEventType, BattleSimulation, BattleSummary, UnitSummary,
};
pub use stance::{body_state_change_cost, next_transition_hop, throw_cost, BodyState};
pub use tile::{Occupant, Tile, DEFAULT_MOVEMENT_COST, IMPASSABLE};
pub use units::{
    BattleUnit, BodyProfile, MovementMode, MovementState, SizeClass, UnitState, UnitStats,
    Vitality,
};
