//! Unit missions: the queued intentions a unit works through tick by tick
//!
//! A mission never moves, turns or re-postures the unit by itself. Each tick
//! the simulation asks the front mission, in order, for a new body state, a
//! new facing and a new destination; at most one of them changes per tick.
//! Missions reach the rest of the world only through [`MissionContext`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, error, info, trace};

use crate::battle::adjacency::StepCost;
use crate::battle::battle_map::footprint;
use crate::battle::constants::{DROP_HEIGHT, TELEPORT_SOUND_GAIN};
use crate::battle::coords::{Facing, TilePos};
use crate::battle::give_way::GiveWayRequest;
use crate::battle::items::{EquipmentKind, ItemService, SoundCue, ThrowVelocity};
use crate::battle::ledger::{ResourceLedger, SpendOutcome};
use crate::battle::mission_queue::MissionContext;
use crate::battle::pathfinding::PathResult;
use crate::battle::stance::{body_state_change_cost, next_transition_hop, BodyState};
use crate::battle::units::{MovementMode, MovementState, UnitState};
use crate::core::config::MovementConfig;
use crate::core::types::{ItemId, Vec3};

/// How a GotoLocation behaves when the way is contested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GotoOptions {
    /// Plan through small allies, asking them to move aside
    pub demand_give_way: bool,
    /// Drop path nodes the unit can cut across
    pub allow_skip_nodes: bool,
    /// Give-way requests left before the route is replanned
    pub give_way_attempts: u32,
    /// Leave the battle on arrival if the destination has an exit
    pub allow_running_away: bool,
}

impl GotoOptions {
    pub fn from_config(config: &MovementConfig) -> Self {
        Self {
            demand_give_way: true,
            allow_skip_nodes: config.allow_skip_nodes,
            give_way_attempts: config.give_way_attempts,
            allow_running_away: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GotoState {
    pub target: TilePos,
    /// Planned route; the front is the tile the unit stands on
    pub path: VecDeque<TilePos>,
    pub options: GotoOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MissionKind {
    GotoLocation(GotoState),
    Turn,
    ChangeBodyState,
    /// Finish the step already in flight
    ReachGoal,
    ThrowItem {
        item: Option<ItemId>,
        target: TilePos,
        velocity: ThrowVelocity,
    },
    DropItem {
        item: Option<ItemId>,
    },
    Teleport {
        item: Option<ItemId>,
        target: TilePos,
    },
    /// Wait until the unit holds at least this many TU
    AcquireTu {
        time_units: u32,
    },
    Snooze {
        remaining: u32,
    },
    /// Retires at once so the mission behind it is started again
    RestartNextMission,
}

/// State shared by every kind of mission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MissionCore {
    target_facing: Facing,
    target_body_state: BodyState,
    require_goal: bool,
    free_turn: bool,
    cancelled: bool,
    ledger: ResourceLedger,
}

impl MissionCore {
    /// Pay `cost` through the ledger; false means "not this tick"
    fn spend(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
        cost: u32,
        cancel_on_failure: bool,
    ) -> bool {
        match self.ledger.spend(unit, cost, cancel_on_failure) {
            SpendOutcome::Paid => true,
            SpendOutcome::Deferred(needed) => {
                trace!("Unit {:?} waits for {} TU", unit.id, needed);
                ctx.add_mission(Mission::acquire_time_units(needed));
                false
            }
            SpendOutcome::Cancelled => {
                info!(
                    "Unit {:?} cannot afford {} TU (has {}), cancelling",
                    unit.id, cost, unit.time_units
                );
                self.cancelled = true;
                false
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub kind: MissionKind,
    core: MissionCore,
}

/// Where a thrown item leaves the unit's hand
fn throw_origin(unit: &UnitState) -> Vec3 {
    unit.position + Vec3::new(0.0, 0.0, unit.profile.max_height)
}

impl Mission {
    fn new(kind: MissionKind, target_facing: Facing, target_body_state: BodyState) -> Self {
        Self {
            kind,
            core: MissionCore {
                target_facing,
                target_body_state,
                require_goal: true,
                free_turn: false,
                cancelled: false,
                ledger: ResourceLedger::new(),
            },
        }
    }

    fn bare(kind: MissionKind) -> Self {
        Self::new(kind, Facing::default(), BodyState::default())
    }

    pub fn goto_location(unit: &UnitState, target: TilePos, options: GotoOptions) -> Self {
        Self::new(
            MissionKind::GotoLocation(GotoState {
                target,
                path: VecDeque::new(),
                options,
            }),
            unit.goal_facing,
            unit.target_body_state,
        )
    }

    /// Face `facing`, one step per tick
    pub fn turn(unit: &UnitState, facing: Facing, free: bool, require_goal: bool) -> Self {
        let mut mission = Self::new(MissionKind::Turn, facing, unit.target_body_state);
        mission.core.free_turn = free;
        mission.core.require_goal = require_goal;
        mission
    }

    /// Face the tile `target` from the unit's current tile
    pub fn turn_toward(unit: &UnitState, target: TilePos, free: bool, require_goal: bool) -> Self {
        Self::turn(unit, unit.facing_toward_tile(target), free, require_goal)
    }

    pub fn change_body_state(unit: &UnitState, state: BodyState) -> Self {
        Self::new(MissionKind::ChangeBodyState, unit.goal_facing, state)
    }

    pub fn reach_goal(unit: &UnitState) -> Self {
        let mut mission = Self::new(
            MissionKind::ReachGoal,
            unit.goal_facing,
            unit.target_body_state,
        );
        mission.core.require_goal = false;
        mission
    }

    /// Throw `item` at `target`; None if the unit lacks the item or the target is out of reach
    pub fn throw_item(
        unit: &UnitState,
        item: ItemId,
        target: TilePos,
        items: &dyn ItemService,
    ) -> Option<Self> {
        if !unit.inventory.contains(item) {
            error!("Unit {:?} has no item {:?} to throw", unit.id, item);
            return None;
        }
        let Some(velocity) = items.throw_velocity(throw_origin(unit), target) else {
            info!("Unit {:?} cannot throw that far ({:?})", unit.id, target);
            return None;
        };
        Some(Self::new(
            MissionKind::ThrowItem {
                item: Some(item),
                target,
                velocity,
            },
            unit.facing_toward_tile(target),
            BodyState::Throwing,
        ))
    }

    pub fn drop_item(item: ItemId) -> Self {
        Self::bare(MissionKind::DropItem { item: Some(item) })
    }

    pub fn teleport(item: ItemId, target: TilePos) -> Self {
        Self::bare(MissionKind::Teleport {
            item: Some(item),
            target,
        })
    }

    pub fn acquire_time_units(time_units: u32) -> Self {
        Self::bare(MissionKind::AcquireTu { time_units })
    }

    pub fn snooze(ticks: u32) -> Self {
        Self::bare(MissionKind::Snooze { remaining: ticks })
    }

    pub fn restart_next_mission() -> Self {
        Self::bare(MissionKind::RestartNextMission)
    }

    pub fn is_cancelled(&self) -> bool {
        self.core.cancelled
    }

    /// Abandon the mission; it reports finished from now on
    pub fn cancel(&mut self) {
        self.core.cancelled = true;
    }

    pub fn target_facing(&self) -> Facing {
        self.core.target_facing
    }

    pub fn target_body_state(&self) -> BodyState {
        self.core.target_body_state
    }

    /// TU already paid for an action still to come
    pub fn prepaid(&self) -> u32 {
        self.core.ledger.prepaid()
    }

    /// Remaining planned route of a GotoLocation
    pub fn path(&self) -> Option<&VecDeque<TilePos>> {
        match &self.kind {
            MissionKind::GotoLocation(goto) => Some(&goto.path),
            _ => None,
        }
    }

    /// Called when the mission reaches the front of its queue
    pub fn start(&mut self, unit: &mut UnitState, ctx: &mut MissionContext<'_>) {
        debug!("Unit {:?} mission \"{}\" starting", unit.id, self);
        let core = &mut self.core;

        match &mut self.kind {
            MissionKind::Teleport { item, target } => {
                start_teleport(core, item, *target, unit, ctx);
            }
            MissionKind::ThrowItem { item, target, .. } => {
                match item {
                    Some(id) if unit.inventory.contains(*id) => {}
                    _ => {
                        error!("Unit {:?} lost the item it was to throw", unit.id);
                        core.cancelled = true;
                        return;
                    }
                }
                if ctx.config.allow_instant_throws {
                    unit.set_body_state(BodyState::Standing);
                    let facing = unit.facing_toward_tile(*target);
                    unit.set_facing(facing);
                }
            }
            MissionKind::DropItem { item } => {
                let Some(id) = item.take() else {
                    error!("Unit {:?} drop mission has no item", unit.id);
                    return;
                };
                match unit.inventory.remove(id) {
                    Some(equipment) => {
                        let at = unit.position + Vec3::new(0.0, 0.0, DROP_HEIGHT);
                        ctx.items.spawn_falling(equipment, at);
                    }
                    None => error!("Unit {:?} has no item {:?} to drop", unit.id, id),
                }
            }
            MissionKind::GotoLocation(goto) => {
                core.target_body_state = unit.target_body_state;
                core.target_facing = unit.goal_facing;
                revalidate_path(goto, unit, ctx);
                if goto.path.is_empty() {
                    set_path_to(goto, core, unit, ctx);
                }
            }
            MissionKind::Turn | MissionKind::ReachGoal => {
                core.target_body_state = unit.target_body_state;
            }
            MissionKind::ChangeBodyState
            | MissionKind::AcquireTu { .. }
            | MissionKind::Snooze { .. }
            | MissionKind::RestartNextMission => {}
        }
    }

    /// Per-tick bookkeeping; `finished` is set once, right before the mission retires
    pub fn update(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
        ticks: u32,
        finished: bool,
    ) {
        let core = &mut self.core;
        match &mut self.kind {
            MissionKind::GotoLocation(goto) => {
                if finished {
                    unit.set_movement_state(MovementState::None);
                    if goto.options.allow_running_away
                        && ctx.map.has_exit(unit.tile(), unit.is_large())
                    {
                        info!("Unit {:?} ran away from the battle", unit.id);
                        unit.retreat();
                    }
                } else if unit.movement_state != MovementState::None {
                    unit.make_agent_move();
                }
            }
            MissionKind::Snooze { remaining } => {
                *remaining = remaining.saturating_sub(ticks);
            }
            MissionKind::ThrowItem {
                item,
                target,
                velocity,
            } => {
                if item.is_some()
                    && unit.current_body_state == BodyState::Throwing
                    && unit.target_body_state == BodyState::Throwing
                {
                    if let Some(equipment) = item.take().and_then(|id| unit.inventory.remove(id)) {
                        ctx.items
                            .spawn_thrown(equipment, throw_origin(unit), *target, *velocity);
                    } else {
                        error!("Unit {:?} lost the item mid-throw", unit.id);
                    }
                    core.target_body_state = BodyState::Standing;
                }
            }
            MissionKind::ReachGoal => {
                if finished {
                    unit.set_movement_state(MovementState::None);
                } else if unit.facing == unit.goal_facing
                    && unit.facing == core.target_facing
                    && unit.current_body_state == unit.target_body_state
                    && unit.current_body_state == core.target_body_state
                {
                    unit.make_agent_move();
                }
            }
            MissionKind::Turn
            | MissionKind::ChangeBodyState
            | MissionKind::DropItem { .. }
            | MissionKind::Teleport { .. }
            | MissionKind::AcquireTu { .. }
            | MissionKind::RestartNextMission => {}
        }
    }

    pub fn is_finished(&self, unit: &UnitState) -> bool {
        if self.core.cancelled {
            return true;
        }
        match &self.kind {
            MissionKind::AcquireTu { time_units } => unit.time_units >= *time_units,
            MissionKind::ReachGoal => unit.at_goal || unit.falling,
            MissionKind::GotoLocation(goto) => {
                goto.path.is_empty() || unit.is_dead() || unit.is_unconscious()
            }
            MissionKind::Snooze { remaining } => *remaining == 0,
            MissionKind::ChangeBodyState => {
                unit.current_body_state == self.core.target_body_state
            }
            MissionKind::ThrowItem { item, .. } => {
                item.is_none() && unit.current_body_state == BodyState::Standing
            }
            MissionKind::Turn => unit.facing == self.core.target_facing,
            MissionKind::RestartNextMission => true,
            MissionKind::Teleport { item, .. } | MissionKind::DropItem { item } => {
                if let Some(id) = item {
                    error!("Unit {:?} item {:?} still held at finish", unit.id, id);
                }
                true
            }
        }
    }

    /// Next position to travel to, once facing and posture are settled
    pub fn next_destination(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) -> Option<Vec3> {
        let core = &mut self.core;
        if core.cancelled {
            return None;
        }
        if unit.facing != unit.goal_facing || unit.current_body_state != unit.target_body_state {
            return None;
        }
        if unit.facing != core.target_facing
            || unit.current_body_state != core.target_body_state
        {
            return None;
        }
        match &mut self.kind {
            MissionKind::GotoLocation(goto) => advance_along_path(goto, core, unit, ctx),
            _ => None,
        }
    }

    /// Next facing step, once posture is settled
    pub fn next_facing(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) -> Option<Facing> {
        if self.core.cancelled || unit.current_body_state != unit.target_body_state {
            return None;
        }
        let throwing = matches!(self.kind, MissionKind::ThrowItem { .. });
        if unit.current_body_state != self.core.target_body_state
            && !(throwing && unit.current_body_state == BodyState::Standing)
        {
            return None;
        }
        match self.kind {
            MissionKind::Turn
            | MissionKind::ThrowItem { .. }
            | MissionKind::GotoLocation(_)
            | MissionKind::ReachGoal => advance_facing(&mut self.core, unit, ctx),
            _ => None,
        }
    }

    /// Next body state to move into
    pub fn next_body_state(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) -> Option<BodyState> {
        if self.core.cancelled {
            return None;
        }
        // A standing thrower turns to face the target before winding up
        if matches!(self.kind, MissionKind::ThrowItem { .. })
            && unit.current_body_state == BodyState::Standing
            && (unit.facing != unit.goal_facing || unit.facing != self.core.target_facing)
        {
            return None;
        }
        let target = self.core.target_body_state;
        match self.kind {
            MissionKind::Turn
            | MissionKind::ThrowItem { .. }
            | MissionKind::ChangeBodyState
            | MissionKind::GotoLocation(_) => {
                let cancel_on_failure = !matches!(self.kind, MissionKind::GotoLocation(_));
                advance_body_state(&mut self.core, target, false, cancel_on_failure, unit, ctx)
            }
            MissionKind::ReachGoal => {
                advance_body_state(&mut self.core, target, true, true, unit, ctx)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MissionKind::GotoLocation(goto) => write!(
                f,
                "GotoLocation {} {} {}",
                goto.target.x, goto.target.y, goto.target.z
            ),
            MissionKind::Turn => write!(f, "Turn {:?}", self.core.target_facing),
            MissionKind::ChangeBodyState => {
                write!(f, "ChangeBodyState {}", self.core.target_body_state)
            }
            MissionKind::ReachGoal => write!(f, "ReachGoal"),
            MissionKind::ThrowItem { item, target, .. } => {
                write!(f, "ThrowItem {:?} at {:?}", item, target)
            }
            MissionKind::DropItem { item } => write!(f, "DropItem {:?}", item),
            MissionKind::Teleport { target, .. } => write!(f, "Teleport to {:?}", target),
            MissionKind::AcquireTu { time_units } => write!(f, "AcquireTU {}", time_units),
            MissionKind::Snooze { remaining } => write!(f, "Snooze for {} ticks", remaining),
            MissionKind::RestartNextMission => write!(f, "RestartNextMission"),
        }
    }
}

fn start_teleport(
    core: &mut MissionCore,
    item: &mut Option<ItemId>,
    target: TilePos,
    unit: &mut UnitState,
    ctx: &mut MissionContext<'_>,
) {
    let Some(id) = *item else {
        error!("Unit {:?} teleport mission has no item", unit.id);
        return;
    };
    let map = ctx.map;
    let large = unit.is_large();

    let can_stand = map.can_stand(target, large);
    let occupied = footprint(target, large)
        .any(|pos| map.occupant_at(pos).is_some_and(|o| o.unit != unit.id));
    if !map.is_passable(target, large, unit.profile.max_height)
        || occupied
        || (!unit.can_fly() && !can_stand)
    {
        info!("Unit {:?} cannot teleport to {:?}", unit.id, target);
        core.cancelled = true;
        return;
    }

    match unit.inventory.get(id) {
        Some(equipment) if equipment.kind != EquipmentKind::Teleporter => {
            error!("Unit {:?} tried to teleport using {}", unit.id, equipment.name);
            core.cancelled = true;
            return;
        }
        Some(equipment) if !equipment.is_fully_loaded() => {
            info!("Unit {:?} teleporter is not charged", unit.id);
            core.cancelled = true;
            return;
        }
        Some(_) => {}
        None => {
            error!("Unit {:?} has no teleporter {:?}", unit.id, id);
            core.cancelled = true;
            return;
        }
    }

    let cost = unit.stats.time_units * ctx.config.teleport_cost_percent / 100;
    if !core.spend(unit, ctx, cost, true) {
        return;
    }

    if let Some(equipment) = unit.inventory.get_mut(id) {
        equipment.ammo = 0;
    }
    *item = None;
    ctx.request_clear();

    unit.set_position(map.resting_position(target, large));
    match BodyState::best_resting(can_stand, |s| unit.is_body_state_allowed(s)) {
        Some(state) => unit.set_body_state(state),
        None => error!("Unit {:?} has no posture to rest in", unit.id),
    }
    unit.set_movement_state(MovementState::None);
    unit.falling = false;
    ctx.audio
        .play(SoundCue::Teleport, unit.position, TELEPORT_SOUND_GAIN);
    debug!("Unit {:?} teleported to {:?}", unit.id, target);
}

/// Keep a previously planned route only if the unit can still start on it
fn revalidate_path(goto: &mut GotoState, unit: &UnitState, ctx: &MissionContext<'_>) {
    let Some(&first) = goto.path.front() else {
        return;
    };
    let here = unit.tile();
    if here == first {
        return;
    }
    let evaluator = ctx.evaluator(unit);
    if here.is_adjacent(&first) && evaluator.can_enter(here, first, false, true).is_some() {
        goto.path.push_front(here);
    } else {
        goto.path.clear();
    }
}

fn set_path_to(
    goto: &mut GotoState,
    core: &mut MissionCore,
    unit: &UnitState,
    ctx: &MissionContext<'_>,
) {
    let map = ctx.map;
    let large = unit.is_large();
    let mut target = goto.target;
    loop {
        if !unit.can_move() || !map.is_passable(target, large, unit.profile.max_height) {
            info!("Unit {:?} cannot move to {:?}", unit.id, target);
            core.cancelled = true;
            return;
        }
        if unit.can_fly() || map.can_stand(target, large) {
            break;
        }
        if target.z == 0 {
            info!("Unit {:?} found no ground below {:?}", unit.id, goto.target);
            core.cancelled = true;
            return;
        }
        target = target.down();
    }

    let start = unit.goal_tile();
    let evaluator = ctx.evaluator(unit);
    let result = ctx.planner.find_shortest_path(
        start,
        target,
        ctx.config.path_iteration_budget,
        &evaluator,
        goto.options.demand_give_way,
    );
    if result == PathResult::Empty && start != target {
        info!("Unit {:?} has no path from {:?} to {:?}", unit.id, start, target);
        core.cancelled = true;
        return;
    }
    if !result.is_complete() {
        debug!("Unit {:?} only found a partial path to {:?}", unit.id, target);
    }

    goto.path.clear();
    goto.path.push_back(start);
    goto.path.extend(result.into_tiles());
    if let Some(&last) = goto.path.back() {
        goto.target = last;
    }
}

fn advance_along_path(
    goto: &mut GotoState,
    core: &mut MissionCore,
    unit: &mut UnitState,
    ctx: &mut MissionContext<'_>,
) -> Option<Vec3> {
    if unit.is_unconscious() || unit.is_dead() || goto.path.is_empty() {
        return None;
    }
    if goto.path.len() == 1 {
        goto.path.clear();
        return None;
    }

    core.target_body_state = unit.target_body_state;
    core.target_facing = unit.goal_facing;
    core.require_goal = true;
    core.free_turn = false;

    let map = ctx.map;
    let large = unit.is_large();
    let here = unit.tile();
    let evaluator = ctx.evaluator(unit);

    let mut pos = goto.path[1];
    let mut step = StepCost::default();
    if here != pos {
        let checked = if here.is_adjacent(&pos) {
            evaluator.can_enter(here, pos, false, true)
        } else {
            None
        };
        match checked {
            Some(s) => step = s,
            None => {
                debug!("Unit {:?} path blocked at {:?}, replanning", unit.id, pos);
                goto.path.clear();
                ctx.add_mission(Mission::restart_next_mission());
                return None;
            }
        }
    }

    while goto.path.len() > 2 {
        let after = goto.path[2];
        let shortcut = if after == here {
            Some(StepCost::default())
        } else if goto.options.allow_skip_nodes && here.is_adjacent(&after) {
            evaluator.can_enter(here, after, false, false)
        } else {
            None
        };
        let Some(s) = shortcut else {
            break;
        };
        trace!("Unit {:?} skips path node {:?}", unit.id, pos);
        goto.path.pop_front();
        pos = goto.path[1];
        step = s;
    }

    let next_facing = unit.facing_toward_tile(pos);
    if next_facing == unit.facing {
        let mut adjust_posture = true;
        if unit.movement_mode == MovementMode::Prone {
            if unit.current_body_state == BodyState::Prone {
                if unit.can_prone(map, pos, unit.facing) {
                    adjust_posture = false;
                }
            } else if unit.can_prone(map, here, unit.facing)
                && unit.can_prone(map, pos, unit.facing)
            {
                core.target_body_state = BodyState::Prone;
                return None;
            }
        }
        if adjust_posture {
            let both_stand = map.can_stand(here, large) && map.can_stand(pos, large);
            let desired = match unit.current_body_state {
                BodyState::Flying if both_stand => BodyState::Standing,
                BodyState::Standing if !both_stand => BodyState::Flying,
                BodyState::Flying | BodyState::Standing => unit.current_body_state,
                _ if both_stand => BodyState::Standing,
                _ => BodyState::Flying,
            };
            if desired != unit.current_body_state && unit.is_body_state_allowed(desired) {
                core.target_body_state = desired;
                return None;
            }
        }
    }

    if let Some(blocker) = map
        .get_tile(pos)
        .and_then(|tile| tile.blocking_unit(unit.id, false, None))
    {
        unit.set_movement_state(MovementState::None);
        let patient = goto.options.give_way_attempts > 0;
        goto.options.give_way_attempts = goto.options.give_way_attempts.saturating_sub(1);
        if patient && blocker.owner == unit.owner && !blocker.large && !large {
            debug!(
                "Unit {:?} asks {:?} to give way at {:?}",
                unit.id, blocker.unit, pos
            );
            ctx.request_give_way(GiveWayRequest {
                requester: unit.id,
                blocker: blocker.unit,
                requester_path: goto.path.iter().copied().collect(),
                blocked_tile: pos,
            });
            ctx.add_mission(Mission::snooze(ctx.config.give_way_snooze_ticks));
        } else {
            debug!(
                "Unit {:?} gives up waiting for {:?}, replanning",
                unit.id, blocker.unit
            );
            goto.path.clear();
            goto.options.demand_give_way = false;
            ctx.add_mission(Mission::restart_next_mission());
        }
        return None;
    }

    if step.door_in_the_way {
        ctx.request_door(here, pos, large);
        ctx.add_mission(Mission::snooze(ctx.config.door_snooze_ticks));
        return None;
    }

    let mut cost = step.cost;
    if unit.profile.can_run && unit.movement_mode == MovementMode::Running {
        cost /= ctx.config.running_cost_divisor;
    }
    if unit.current_body_state == BodyState::Prone {
        cost *= ctx.config.prone_cost_multiplier;
    }
    let cost = cost as u32;
    if !core.spend(unit, ctx, cost, false) {
        return None;
    }

    if next_facing != unit.facing {
        core.target_facing = next_facing;
        core.ledger.prepay(cost);
        core.free_turn = true;
        if unit.current_body_state == BodyState::Prone {
            core.target_body_state = BodyState::Kneeling;
        }
        return None;
    }

    goto.path.pop_front();
    unit.make_agent_move();
    Some(map.resting_position(pos, large))
}

fn advance_facing(
    core: &mut MissionCore,
    unit: &mut UnitState,
    ctx: &mut MissionContext<'_>,
) -> Option<Facing> {
    if unit.facing == core.target_facing {
        return None;
    }
    if !unit.at_goal && core.require_goal {
        ctx.add_mission(Mission::reach_goal(unit));
        return None;
    }
    if unit.current_body_state == BodyState::Prone {
        core.target_body_state = BodyState::Kneeling;
        return None;
    }
    if core.target_body_state == BodyState::Throwing {
        let cost = body_state_change_cost(
            unit.current_body_state,
            BodyState::Throwing,
            unit.stats.time_units,
            ctx.config.throw_cost_percent,
        );
        if !core.spend(unit, ctx, cost, true) {
            return None;
        }
        core.ledger.prepay(cost);
    }
    let dest = unit.facing_step(core.target_facing);
    let cost = if core.free_turn {
        0
    } else {
        ctx.config.turn_cost
    };
    if !core.spend(unit, ctx, cost, true) {
        return None;
    }
    Some(dest)
}

fn advance_body_state(
    core: &mut MissionCore,
    target: BodyState,
    free: bool,
    cancel_on_failure: bool,
    unit: &mut UnitState,
    ctx: &mut MissionContext<'_>,
) -> Option<BodyState> {
    if target == unit.target_body_state {
        return None;
    }
    if unit.current_body_state != unit.target_body_state {
        error!(
            "Unit {:?} still changing posture ({} -> {})",
            unit.id, unit.current_body_state, unit.target_body_state
        );
        unit.set_body_state(unit.target_body_state);
    }
    let hop = next_transition_hop(unit.current_body_state, target, |s| {
        unit.is_body_state_allowed(s)
    });
    if hop == unit.target_body_state {
        return None;
    }
    if !unit.is_body_state_allowed(hop) {
        error!("Unit {:?} cannot take posture {}", unit.id, hop);
        core.cancelled = true;
        return None;
    }
    let cost = if free {
        0
    } else {
        body_state_change_cost(
            unit.target_body_state,
            hop,
            unit.stats.time_units,
            ctx.config.throw_cost_percent,
        )
    };
    if !core.spend(unit, ctx, cost, cancel_on_failure) {
        return None;
    }
    Some(hop)
}
