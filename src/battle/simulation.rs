//! Single-threaded tick loop driving every unit's mission queue
//!
//! Each tick every unit, in spawn order, settles what it was told last tick
//! (posture, facing, a slice of travel), regains TU, advances its mission
//! queue and is then asked for at most one new change. Give-way requests are
//! delivered to the blocker right away. Door openings and the occupancy
//! snapshot used by every evaluator are committed at the end of the tick.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::battle::battle_map::{footprint, BattleMap};
use crate::battle::constants::MAX_BATTLE_TICKS;
use crate::battle::coords::{Facing, TilePos};
use crate::battle::give_way::{self, GiveWayRequest, GiveWayResponse};
use crate::battle::items::{BattleItems, SoundLog};
use crate::battle::mission::{GotoOptions, Mission};
use crate::battle::mission_queue::{DoorRequest, MissionContext};
use crate::battle::pathfinding::{AStarPlanner, PathPlanner};
use crate::battle::stance::BodyState;
use crate::battle::tile::Occupant;
use crate::battle::units::{BattleUnit, BodyProfile, MovementState, UnitState};
use crate::core::config::MovementConfig;
use crate::core::error::{Result, TacticalError};
use crate::core::types::{ForceId, Tick, UnitId, Vec3};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleEvent {
    pub tick: Tick,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    UnitSpawned {
        unit_id: UnitId,
    },
    GiveWayRequested {
        requester: UnitId,
        blocker: UnitId,
        response: GiveWayResponse,
    },
    DoorsOpened {
        from: TilePos,
        to: TilePos,
        count: usize,
    },
    UnitFell {
        unit_id: UnitId,
    },
    UnitRetreated {
        unit_id: UnitId,
    },
}

/// What happened to one unit during its part of a tick
#[derive(Debug, Default)]
struct UnitTickReport {
    started_falling: bool,
    retreated: bool,
}

/// Snapshot of a unit for reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSummary {
    pub id: UnitId,
    pub owner: ForceId,
    pub position: Vec3,
    pub facing: Facing,
    pub body_state: BodyState,
    pub time_units: u32,
    pub idle: bool,
    pub retreated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSummary {
    pub tick: Tick,
    pub units: Vec<UnitSummary>,
    pub items_in_world: usize,
    pub events: Vec<BattleEvent>,
}

pub struct BattleSimulation {
    pub map: BattleMap,
    pub config: MovementConfig,
    pub items: BattleItems,
    pub sounds: SoundLog,
    pub tick: Tick,
    pub battle_log: Vec<BattleEvent>,
    units: Vec<BattleUnit>,
    planner: Box<dyn PathPlanner>,
    door_requests: Vec<DoorRequest>,
}

impl BattleSimulation {
    pub fn new(map: BattleMap, config: MovementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            map,
            items: BattleItems::new(config.throw),
            config,
            sounds: SoundLog::default(),
            tick: 0,
            battle_log: Vec::new(),
            units: Vec::new(),
            planner: Box::new(AStarPlanner),
            door_requests: Vec::new(),
        })
    }

    /// Replace the default A* planner
    pub fn with_planner(mut self, planner: Box<dyn PathPlanner>) -> Self {
        self.planner = planner;
        self
    }

    /// Place a new unit at rest on `tile`
    pub fn spawn_unit(
        &mut self,
        owner: ForceId,
        profile: BodyProfile,
        tile: TilePos,
    ) -> Result<UnitId> {
        let large = profile.is_large();
        if let Some(off) = footprint(tile, large).find(|&pos| !self.map.tile_is_valid(pos)) {
            return Err(TacticalError::OffMap(off));
        }
        let id = UnitId::new(self.units.len() as u32);
        let position = self.map.resting_position(tile, large);
        self.units
            .push(BattleUnit::new(UnitState::new(id, owner, profile, position)));
        self.log_event(
            BattleEventType::UnitSpawned { unit_id: id },
            format!("Unit {:?} deployed at {:?}", id, tile),
        );
        self.commit_occupancy();
        Ok(id)
    }

    pub fn units(&self) -> &[BattleUnit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Result<&BattleUnit> {
        self.units
            .get(id.index())
            .ok_or(TacticalError::UnitNotFound(id))
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Result<&mut BattleUnit> {
        self.units
            .get_mut(id.index())
            .ok_or(TacticalError::UnitNotFound(id))
    }

    /// Queue a mission for a unit
    pub fn order(&mut self, id: UnitId, mission: Mission) -> Result<()> {
        let (_, requests) = self
            .with_unit_context(id.index(), |unit, ctx| {
                unit.missions.enqueue(mission, &mut unit.state, ctx);
            })
            .ok_or(TacticalError::UnitNotFound(id))?;
        self.deliver_give_way(requests);
        Ok(())
    }

    /// Queue a move to `target` with the configured give-way behaviour
    pub fn order_move(&mut self, id: UnitId, target: TilePos) -> Result<()> {
        let options = GotoOptions::from_config(&self.config);
        let mission = Mission::goto_location(&self.unit(id)?.state, target, options);
        self.order(id, mission)
    }

    /// Restore every unit's TU to its maximum
    pub fn begin_turn(&mut self) {
        for unit in &mut self.units {
            unit.state.time_units = unit.state.stats.time_units;
        }
    }

    pub fn all_idle(&self) -> bool {
        self.units
            .iter()
            .all(|unit| !unit.state.can_move() || unit.is_idle())
    }

    /// Advance the battle by one tick
    pub fn step(&mut self) {
        self.tick += 1;
        for index in 0..self.units.len() {
            let Some((report, requests)) = self.with_unit_context(index, step_unit) else {
                continue;
            };
            let id = UnitId::new(index as u32);
            if report.started_falling {
                self.log_event(
                    BattleEventType::UnitFell { unit_id: id },
                    format!("Unit {:?} lost its footing", id),
                );
            }
            if report.retreated {
                self.log_event(
                    BattleEventType::UnitRetreated { unit_id: id },
                    format!("Unit {:?} left the battlefield", id),
                );
            }
            self.deliver_give_way(requests);
        }

        for door in std::mem::take(&mut self.door_requests) {
            let count = self.map.open_doors_between(door.from, door.to, door.large);
            if count > 0 {
                self.log_event(
                    BattleEventType::DoorsOpened {
                        from: door.from,
                        to: door.to,
                        count,
                    },
                    format!("{} door(s) opened between {:?} and {:?}", count, door.from, door.to),
                );
            }
        }
        self.commit_occupancy();
    }

    /// Step until every unit is idle or `max_ticks` have passed; returns ticks run
    pub fn run_until_idle(&mut self, max_ticks: Tick) -> Tick {
        let limit = max_ticks.min(MAX_BATTLE_TICKS);
        let start = self.tick;
        while self.tick - start < limit && !self.all_idle() {
            self.step();
        }
        let ran = self.tick - start;
        if !self.all_idle() {
            info!("Battle still busy after {} ticks", ran);
        }
        ran
    }

    pub fn summary(&self) -> BattleSummary {
        BattleSummary {
            tick: self.tick,
            units: self
                .units
                .iter()
                .map(|unit| UnitSummary {
                    id: unit.id(),
                    owner: unit.state.owner,
                    position: unit.state.position,
                    facing: unit.state.facing,
                    body_state: unit.state.current_body_state,
                    time_units: unit.state.time_units,
                    idle: unit.is_idle(),
                    retreated: unit.state.retreated,
                })
                .collect(),
            items_in_world: self.items.items.len(),
            events: self.battle_log.clone(),
        }
    }

    pub fn log_event(&mut self, event_type: BattleEventType, description: String) {
        self.battle_log.push(BattleEvent {
            tick: self.tick,
            event_type,
            description,
        });
    }

    /// Run `f` on one unit with a mission context over the rest of the battle
    fn with_unit_context<R>(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut BattleUnit, &mut MissionContext<'_>) -> R,
    ) -> Option<(R, Vec<GiveWayRequest>)> {
        let unit = self.units.get_mut(index)?;
        let mut ctx = MissionContext::new(
            &self.map,
            &self.config,
            self.planner.as_ref(),
            &mut self.items,
            &mut self.sounds,
        );
        let result = f(unit, &mut ctx);
        self.door_requests.extend(ctx.take_door_requests());
        let requests = ctx.take_give_way_requests();
        Some((result, requests))
    }

    fn deliver_give_way(&mut self, requests: Vec<GiveWayRequest>) {
        let mut queue: VecDeque<GiveWayRequest> = requests.into();
        while let Some(request) = queue.pop_front() {
            let outcome = self.with_unit_context(request.blocker.index(), |blocker, ctx| {
                give_way::respond(blocker, ctx, &request)
            });
            let Some((response, nested)) = outcome else {
                warn!("Give-way request for unknown unit {:?}", request.blocker);
                continue;
            };
            queue.extend(nested);
            self.log_event(
                BattleEventType::GiveWayRequested {
                    requester: request.requester,
                    blocker: request.blocker,
                    response,
                },
                format!(
                    "Unit {:?} asked {:?} to give way: {:?}",
                    request.requester, request.blocker, response
                ),
            );
        }
    }

    /// Rebuild the occupancy snapshot from every unit still on the field
    fn commit_occupancy(&mut self) {
        let occupants = self
            .units
            .iter()
            .filter(|unit| !unit.state.retreated)
            .map(|unit| {
                (
                    unit.state.tile(),
                    Occupant {
                        unit: unit.id(),
                        owner: unit.state.owner,
                        large: unit.state.is_large(),
                        moving: !unit.state.at_goal,
                    },
                )
            });
        self.map.commit_occupancy(occupants);
    }
}

/// One unit's share of a tick
fn step_unit(unit: &mut BattleUnit, ctx: &mut MissionContext<'_>) -> UnitTickReport {
    let BattleUnit { state, missions } = unit;
    let mut report = UnitTickReport::default();
    if !state.can_move() {
        return report;
    }

    report.started_falling = settle(state, ctx.map, ctx.config);
    state.regen(ctx.config.time_unit_regen_per_tick);
    missions.tick(state, ctx, 1);

    if state.current_body_state == state.target_body_state {
        if let Some(body) = missions.next_body_state(state, ctx) {
            state.target_body_state = body;
        } else if state.facing == state.goal_facing {
            if let Some(facing) = missions.next_facing(state, ctx) {
                state.goal_facing = facing;
            } else if state.at_goal && !state.falling {
                if let Some(dest) = missions.next_destination(state, ctx) {
                    state.goal_position = dest;
                    state.at_goal = false;
                }
            }
        }
    }

    report.retreated = state.retreated;
    report
}

/// Apply last tick's posture and facing, travel toward the goal, and fall
///
/// Returns true when the unit starts falling.
fn settle(state: &mut UnitState, map: &BattleMap, config: &MovementConfig) -> bool {
    state.current_body_state = state.target_body_state;
    state.facing = state.goal_facing;

    if !state.at_goal {
        let speed = match state.movement_state {
            MovementState::Running => config.movement_speed * 2.0,
            _ => config.movement_speed,
        };
        let offset = state.goal_position - state.position;
        if offset.length() <= speed {
            state.position = state.goal_position;
            state.at_goal = true;
        } else {
            state.position = state.position + offset.normalize() * speed;
        }
    }

    if !state.at_goal {
        return false;
    }
    let tile = state.tile();
    let large = state.is_large();
    let unsupported = state.current_body_state != BodyState::Flying
        && tile.z > 0
        && !map.can_stand(tile, large);
    if unsupported {
        let started = !state.falling;
        if started {
            debug!("Unit {:?} falls from {:?}", state.id, tile);
        }
        state.falling = true;
        state.goal_position = map.resting_position(tile.down(), large);
        state.at_goal = false;
        started
    } else {
        state.falling = false;
        false
    }
}
