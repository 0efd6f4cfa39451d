//! Body states and how units move between them
//!
//! Some transitions are not direct: a prone unit kneels before it stands,
//! and only a standing unit can take off or throw.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::battle::constants::{MAX_TRANSITION_HOPS, STANCE_CHANGE_COST};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyState {
    #[default]
    Standing,
    Kneeling,
    Prone,
    Flying,
    Throwing,
}

impl BodyState {
    pub const ALL: [BodyState; 5] = [
        BodyState::Standing,
        BodyState::Kneeling,
        BodyState::Prone,
        BodyState::Flying,
        BodyState::Throwing,
    ];

    /// Posture to settle in after being placed somewhere new
    pub fn best_resting(can_stand: bool, allowed: impl Fn(BodyState) -> bool) -> Option<BodyState> {
        let first = if can_stand {
            BodyState::Standing
        } else {
            BodyState::Flying
        };
        [first, BodyState::Flying, BodyState::Kneeling, BodyState::Prone]
            .into_iter()
            .find(|&state| allowed(state))
    }
}

impl fmt::Display for BodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BodyState::Standing => "Standing",
            BodyState::Kneeling => "Kneeling",
            BodyState::Prone => "Prone",
            BodyState::Flying => "Flying",
            BodyState::Throwing => "Throwing",
        };
        write!(f, "{}", name)
    }
}

/// Intermediate state to pass through when asked to reach `target`, if any
fn required_hop(
    current: BodyState,
    target: BodyState,
    allowed: &impl Fn(BodyState) -> bool,
) -> Option<BodyState> {
    use BodyState::*;
    if target == Flying && current != Standing {
        return Some(Standing);
    }
    if target != Standing && current == Flying && allowed(Standing) {
        return Some(Standing);
    }
    if target != Kneeling && current == Prone && allowed(Kneeling) {
        return Some(Kneeling);
    }
    if target == Prone && current != Kneeling && allowed(Kneeling) {
        return Some(Kneeling);
    }
    if target == Throwing && current != Standing {
        return Some(Standing);
    }
    None
}

/// First state actually entered on the way from `current` to `target`
pub fn next_transition_hop(
    current: BodyState,
    target: BodyState,
    allowed: impl Fn(BodyState) -> bool,
) -> BodyState {
    let mut next = target;
    for _ in 0..MAX_TRANSITION_HOPS {
        match required_hop(current, next, &allowed) {
            Some(hop) => next = hop,
            None => break,
        }
    }
    next
}

/// TU needed for a unit with `max_time_units` to go directly from `from` to `to`
pub fn body_state_change_cost(
    from: BodyState,
    to: BodyState,
    max_time_units: u32,
    throw_cost_percent: u32,
) -> u32 {
    use BodyState::*;
    match (to, from) {
        (Flying | Standing, Kneeling) => STANCE_CHANGE_COST,
        (Flying | Standing, Prone) => STANCE_CHANGE_COST * 2,
        (Kneeling, Prone | Standing | Flying) => STANCE_CHANGE_COST,
        (Prone, Kneeling | Standing | Flying) => STANCE_CHANGE_COST,
        (Throwing, _) => throw_cost(max_time_units, throw_cost_percent),
        _ => 0,
    }
}

pub fn throw_cost(max_time_units: u32, throw_cost_percent: u32) -> u32 {
    max_time_units * throw_cost_percent / 100
}
