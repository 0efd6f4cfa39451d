//! A unit's mission queue and the context missions run in
//!
//! Missions never touch other units or the world directly. Whatever they
//! want done is recorded on the [`MissionContext`]: new missions for the
//! same unit are applied by the queue as soon as the call returns,
//! cross-unit requests and door openings are collected by the simulation.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::battle::adjacency::TileAdjacencyEvaluator;
use crate::battle::battle_map::BattleMap;
use crate::battle::coords::{Facing, TilePos};
use crate::battle::give_way::GiveWayRequest;
use crate::battle::items::{AudioService, ItemService};
use crate::battle::mission::Mission;
use crate::battle::pathfinding::PathPlanner;
use crate::battle::stance::BodyState;
use crate::battle::units::UnitState;
use crate::core::config::MovementConfig;
use crate::core::types::Vec3;

/// Missions retired in one pass before the queue assumes a start loop
const MAX_RETIRED_PER_PASS: usize = 64;

/// Closed door a unit wants opened between two tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorRequest {
    pub from: TilePos,
    pub to: TilePos,
    pub large: bool,
}

/// Everything a mission may consult or ask for while it runs
pub struct MissionContext<'a> {
    pub map: &'a BattleMap,
    pub config: &'a MovementConfig,
    pub planner: &'a dyn PathPlanner,
    pub items: &'a mut dyn ItemService,
    pub audio: &'a mut dyn AudioService,
    pending: Vec<Mission>,
    clear_requested: bool,
    give_way_requests: Vec<GiveWayRequest>,
    door_requests: Vec<DoorRequest>,
}

impl<'a> MissionContext<'a> {
    pub fn new(
        map: &'a BattleMap,
        config: &'a MovementConfig,
        planner: &'a dyn PathPlanner,
        items: &'a mut dyn ItemService,
        audio: &'a mut dyn AudioService,
    ) -> Self {
        Self {
            map,
            config,
            planner,
            items,
            audio,
            pending: Vec::new(),
            clear_requested: false,
            give_way_requests: Vec::new(),
            door_requests: Vec::new(),
        }
    }

    /// Step evaluator for `unit` against the current occupancy snapshot
    pub fn evaluator(&self, unit: &UnitState) -> TileAdjacencyEvaluator<'a> {
        TileAdjacencyEvaluator::new(self.map, unit.mover_profile(), self.config.ascend_height)
    }

    /// Put a mission in front of the current one and start it
    pub fn add_mission(&mut self, mission: Mission) {
        self.pending.push(mission);
    }

    /// Drop every mission of the unit
    pub fn request_clear(&mut self) {
        self.clear_requested = true;
    }

    pub fn request_give_way(&mut self, request: GiveWayRequest) {
        self.give_way_requests.push(request);
    }

    pub fn request_door(&mut self, from: TilePos, to: TilePos, large: bool) {
        self.door_requests.push(DoorRequest { from, to, large });
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty() || self.clear_requested
    }

    pub fn take_pending(&mut self) -> Vec<Mission> {
        std::mem::take(&mut self.pending)
    }

    pub fn take_clear_request(&mut self) -> bool {
        std::mem::take(&mut self.clear_requested)
    }

    pub fn take_give_way_requests(&mut self) -> Vec<GiveWayRequest> {
        std::mem::take(&mut self.give_way_requests)
    }

    pub fn take_door_requests(&mut self) -> Vec<DoorRequest> {
        std::mem::take(&mut self.door_requests)
    }
}

/// Ordered missions of one unit; only the front one is active
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MissionQueue {
    missions: VecDeque<Mission>,
}

impl MissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn front(&self) -> Option<&Mission> {
        self.missions.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mission> {
        self.missions.iter()
    }

    /// Append a mission; it starts right away if nothing else is queued
    pub fn enqueue(&mut self, mission: Mission, unit: &mut UnitState, ctx: &mut MissionContext<'_>) {
        self.missions.push_back(mission);
        if self.missions.len() == 1 {
            self.start_front(unit, ctx);
            self.absorb(unit, ctx);
            self.retire_finished(unit, ctx);
        }
    }

    /// Put a mission in front of the current one and start it
    pub fn push_front(
        &mut self,
        mission: Mission,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) {
        self.missions.push_front(mission);
        self.start_front(unit, ctx);
        self.absorb(unit, ctx);
    }

    pub fn clear(&mut self) {
        self.missions.clear();
    }

    pub fn is_current_mission_finished(&self, unit: &UnitState) -> bool {
        self.missions
            .front()
            .is_some_and(|mission| mission.is_finished(unit))
    }

    /// Advance the front mission by `ticks`, then retire whatever has finished
    pub fn tick(&mut self, unit: &mut UnitState, ctx: &mut MissionContext<'_>, ticks: u32) {
        if let Some(mission) = self.missions.front_mut() {
            mission.update(unit, ctx, ticks, false);
        }
        self.absorb(unit, ctx);
        self.retire_finished(unit, ctx);
    }

    pub fn next_destination(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) -> Option<Vec3> {
        let dest = self
            .missions
            .front_mut()
            .and_then(|mission| mission.next_destination(unit, ctx));
        self.absorb(unit, ctx);
        dest
    }

    pub fn next_facing(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) -> Option<Facing> {
        let facing = self
            .missions
            .front_mut()
            .and_then(|mission| mission.next_facing(unit, ctx));
        self.absorb(unit, ctx);
        facing
    }

    pub fn next_body_state(
        &mut self,
        unit: &mut UnitState,
        ctx: &mut MissionContext<'_>,
    ) -> Option<BodyState> {
        let state = self
            .missions
            .front_mut()
            .and_then(|mission| mission.next_body_state(unit, ctx));
        self.absorb(unit, ctx);
        state
    }

    fn start_front(&mut self, unit: &mut UnitState, ctx: &mut MissionContext<'_>) {
        if let Some(mission) = self.missions.front_mut() {
            mission.start(unit, ctx);
        }
    }

    /// Apply the queue edits missions asked for, in the order they asked
    ///
    /// Each added mission goes to the front and starts immediately; anything
    /// its start adds is handled before the next one.
    fn absorb(&mut self, unit: &mut UnitState, ctx: &mut MissionContext<'_>) {
        let mut incoming: VecDeque<Mission> = ctx.take_pending().into();
        loop {
            if ctx.take_clear_request() {
                debug!("Unit {:?} mission queue cleared", unit.id);
                self.missions.clear();
            }
            let Some(mission) = incoming.pop_front() else {
                break;
            };
            self.missions.push_front(mission);
            self.start_front(unit, ctx);
            for added in ctx.take_pending().into_iter().rev() {
                incoming.push_front(added);
            }
        }
    }

    /// Retire finished missions from the front, starting each new front mission
    fn retire_finished(&mut self, unit: &mut UnitState, ctx: &mut MissionContext<'_>) {
        for _ in 0..MAX_RETIRED_PER_PASS {
            match self.missions.front_mut() {
                Some(mission) if mission.is_finished(unit) => {
                    mission.update(unit, ctx, 0, true);
                }
                _ => return,
            }
            if let Some(done) = self.missions.pop_front() {
                debug!("Unit {:?} mission \"{}\" finished", unit.id, done);
            }
            if ctx.has_pending() {
                self.absorb(unit, ctx);
            } else {
                self.start_front(unit, ctx);
                self.absorb(unit, ctx);
            }
        }
        warn!(
            "Unit {:?} retired {} missions in one pass, deferring the rest",
            unit.id, MAX_RETIRED_PER_PASS
        );
    }
}
