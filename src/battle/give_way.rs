//! Allied units stepping aside for each other
//!
//! A moving unit that finds a small ally parked on its next tile asks it to
//! give way, then snoozes. The ally, if idle, steps to a free neighbouring
//! tile off the requester's route, waits there, and walks back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::coords::{Facing, TilePos};
use crate::battle::mission::{GotoOptions, Mission};
use crate::battle::mission_queue::MissionContext;
use crate::battle::units::BattleUnit;
use crate::core::types::UnitId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiveWayRequest {
    pub requester: UnitId,
    pub blocker: UnitId,
    /// Remaining route of the requester, which the blocker must keep off
    pub requester_path: Vec<TilePos>,
    pub blocked_tile: TilePos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GiveWayResponse {
    /// Stepping aside to this tile
    Vacating(TilePos),
    /// Has missions of its own
    Busy,
    /// Cannot move, too large, or nowhere to go
    NoRoom,
}

/// Answer a give-way request, queueing vacate, wait and return missions on success
pub fn respond(
    unit: &mut BattleUnit,
    ctx: &mut MissionContext<'_>,
    request: &GiveWayRequest,
) -> GiveWayResponse {
    let state = &unit.state;
    if !unit.missions.is_empty() || !state.at_goal {
        return GiveWayResponse::Busy;
    }
    if !state.can_move() || state.is_large() {
        return GiveWayResponse::NoRoom;
    }

    let here = state.tile();
    let evaluator = ctx.evaluator(state);
    let aside = Facing::ALL.into_iter().map(|f| here.step(f)).find(|&pos| {
        ctx.map.tile_is_valid(pos)
            && !request.requester_path.contains(&pos)
            && evaluator.can_enter(here, pos, false, false).is_some()
    });
    let Some(aside) = aside else {
        debug!(
            "Unit {:?} has no room to give way to {:?}",
            state.id, request.requester
        );
        return GiveWayResponse::NoRoom;
    };

    debug!(
        "Unit {:?} gives way to {:?}, stepping to {:?}",
        state.id, request.requester, aside
    );
    let vacate = GotoOptions {
        demand_give_way: false,
        give_way_attempts: 0,
        ..GotoOptions::from_config(ctx.config)
    };
    let back = GotoOptions::from_config(ctx.config);
    let come_back = Mission::goto_location(&unit.state, here, back);
    let step_aside = Mission::goto_location(&unit.state, aside, vacate);
    let wait = Mission::snooze(ctx.config.give_way_return_ticks);

    unit.missions.push_front(come_back, &mut unit.state, ctx);
    unit.missions.push_front(wait, &mut unit.state, ctx);
    unit.missions.push_front(step_aside, &mut unit.state, ctx);
    GiveWayResponse::Vacating(aside)
}
