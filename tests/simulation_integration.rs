//! Multi-unit battles: give-way negotiation, doors, retreat and TU bookkeeping

use battlescape::battle::*;
use battlescape::core::config::MovementConfig;
use battlescape::core::types::{ForceId, UnitId};

fn open_field(give_way_attempts: u32) -> BattleSimulation {
    let config = MovementConfig {
        movement_speed: 1.0,
        time_unit_regen_per_tick: 0,
        give_way_attempts,
        ..MovementConfig::default()
    };
    BattleSimulation::new(BattleMap::new(14, 14, 3), config).unwrap()
}

fn spawn(sim: &mut BattleSimulation, owner: u32, x: i32, y: i32) -> UnitId {
    sim.spawn_unit(ForceId(owner), BodyProfile::soldier(), TilePos::new(x, y, 0))
        .unwrap()
}

fn give_way_responses(sim: &BattleSimulation) -> Vec<GiveWayResponse> {
    sim.battle_log
        .iter()
        .filter_map(|event| match event.event_type {
            BattleEventType::GiveWayRequested { response, .. } => Some(response),
            _ => None,
        })
        .collect()
}

#[test]
fn test_single_step_east() {
    let mut sim = open_field(20);
    let id = spawn(&mut sim, 0, 5, 5);
    sim.unit_mut(id).unwrap().state.set_facing(Facing::East);
    sim.order_move(id, TilePos::new(6, 5, 0)).unwrap();
    sim.run_until_idle(20);

    let state = &sim.unit(id).unwrap().state;
    assert_eq!(state.position, battlescape::core::types::Vec3::new(6.5, 5.5, 0.0));
    assert_eq!(state.facing, Facing::East);
    assert_eq!(state.time_units, 60 - 4);
    assert!(sim.unit(id).unwrap().is_idle());
}

#[test]
fn test_busy_ally_is_asked_then_walked_around() {
    let mut sim = open_field(2);
    let mover = spawn(&mut sim, 0, 3, 5);
    let blocker = spawn(&mut sim, 0, 5, 5);
    sim.unit_mut(mover).unwrap().state.set_facing(Facing::East);
    sim.order(blocker, Mission::snooze(1000)).unwrap();
    sim.order_move(mover, TilePos::new(7, 5, 0)).unwrap();

    for _ in 0..200 {
        sim.step();
    }

    assert_eq!(
        give_way_responses(&sim),
        vec![GiveWayResponse::Busy, GiveWayResponse::Busy]
    );
    assert_eq!(sim.unit(mover).unwrap().state.tile(), TilePos::new(7, 5, 0));
    assert_eq!(sim.unit(blocker).unwrap().state.tile(), TilePos::new(5, 5, 0));
}

#[test]
fn test_idle_ally_steps_aside_and_returns() {
    let mut sim = open_field(20);
    let mover = spawn(&mut sim, 0, 3, 5);
    let blocker = spawn(&mut sim, 0, 5, 5);
    sim.unit_mut(mover).unwrap().state.set_facing(Facing::East);
    sim.order_move(mover, TilePos::new(7, 5, 0)).unwrap();

    let ticks = sim.run_until_idle(500);
    assert!(ticks < 500);

    let responses = give_way_responses(&sim);
    assert!(matches!(responses.first(), Some(GiveWayResponse::Vacating(_))));
    assert_eq!(sim.unit(mover).unwrap().state.tile(), TilePos::new(7, 5, 0));
    assert_eq!(sim.unit(blocker).unwrap().state.tile(), TilePos::new(5, 5, 0));
}

#[test]
fn test_enemy_in_the_way_is_never_asked() {
    let mut sim = open_field(20);
    let mover = spawn(&mut sim, 0, 3, 5);
    spawn(&mut sim, 1, 5, 5);
    sim.unit_mut(mover).unwrap().state.set_facing(Facing::East);
    sim.order_move(mover, TilePos::new(7, 5, 0)).unwrap();
    sim.run_until_idle(200);

    assert!(give_way_responses(&sim).is_empty());
    assert_eq!(sim.unit(mover).unwrap().state.tile(), TilePos::new(7, 5, 0));
}

#[test]
fn test_running_away_through_exit() {
    let mut sim = open_field(20);
    let exit = TilePos::new(13, 5, 0);
    sim.map.set_exit(exit, true);
    let id = spawn(&mut sim, 0, 10, 5);

    let options = GotoOptions {
        allow_running_away: true,
        ..GotoOptions::from_config(&sim.config)
    };
    let mission = Mission::goto_location(&sim.unit(id).unwrap().state, exit, options);
    sim.order(id, mission).unwrap();
    sim.run_until_idle(200);

    let unit = sim.unit(id).unwrap();
    assert!(unit.state.retreated);
    assert!(!unit.state.can_move());
    assert!(sim.map.occupant_at(exit).is_none());
    assert!(sim
        .battle_log
        .iter()
        .any(|e| e.event_type == BattleEventType::UnitRetreated { unit_id: id }));
}

#[test]
fn test_exit_without_permission_keeps_unit() {
    let mut sim = open_field(20);
    let exit = TilePos::new(13, 5, 0);
    sim.map.set_exit(exit, true);
    let id = spawn(&mut sim, 0, 10, 5);
    sim.order_move(id, exit).unwrap();
    sim.run_until_idle(200);

    let unit = sim.unit(id).unwrap();
    assert!(!unit.state.retreated);
    assert_eq!(sim.map.occupant_at(exit).map(|o| o.unit), Some(id));
}

#[test]
fn test_time_units_never_exceed_maximum() {
    let config = MovementConfig {
        time_unit_regen_per_tick: 3,
        ..MovementConfig::default()
    };
    let mut sim = BattleSimulation::new(BattleMap::new(14, 14, 3), config).unwrap();
    let a = spawn(&mut sim, 0, 1, 1);
    let b = spawn(&mut sim, 0, 12, 12);
    sim.order_move(a, TilePos::new(12, 1, 0)).unwrap();
    sim.order_move(b, TilePos::new(1, 12, 0)).unwrap();

    for _ in 0..400 {
        sim.step();
        for unit in sim.units() {
            assert!(unit.state.time_units <= unit.state.stats.time_units);
        }
    }
    assert!(sim.all_idle());
}

/// Step until `id` is idle, recording each tile it heads for and the
/// remaining route length while a goto leads its queue
fn walk(sim: &mut BattleSimulation, id: UnitId, max_ticks: u32) -> (Vec<TilePos>, Vec<usize>) {
    let start = sim.unit(id).unwrap().state.tile();
    let mut visited = vec![start];
    let mut remaining = Vec::new();
    for _ in 0..max_ticks {
        sim.step();
        let unit = sim.unit(id).unwrap();
        let heading = TilePos::containing(unit.state.goal_position);
        if visited.last() != Some(&heading) {
            visited.push(heading);
        }
        if let Some(path) = unit.missions.front().and_then(|m| m.path()) {
            remaining.push(path.len());
        }
        if unit.is_idle() {
            break;
        }
    }
    (visited, remaining)
}

fn route_cost(sim: &BattleSimulation, id: UnitId, visited: &[TilePos]) -> f32 {
    let state = &sim.unit(id).unwrap().state;
    let oracle =
        TileAdjacencyEvaluator::new(&sim.map, state.mover_profile(), sim.config.ascend_height);
    path_cost(&oracle, visited[0], &visited[1..]).unwrap()
}

#[test]
fn test_spent_time_units_match_route_cost() {
    let mut sim = open_field(20);
    let id = spawn(&mut sim, 0, 2, 2);
    sim.unit_mut(id).unwrap().state.set_facing(Facing::East);
    sim.order_move(id, TilePos::new(6, 2, 0)).unwrap();

    let (visited, _) = walk(&mut sim, id, 100);
    assert_eq!(visited.last(), Some(&TilePos::new(6, 2, 0)));
    let spent = 60 - sim.unit(id).unwrap().state.time_units;
    assert_eq!(spent as f32, route_cost(&sim, id, &visited));
}

#[test]
fn test_bent_route_charges_steps_and_paid_turns_only() {
    let mut sim = open_field(20);
    // Wall off a straight diagonal so the route bends
    for y in 0..5 {
        sim.map.set_movement_cost(TilePos::new(6, y, 0), IMPASSABLE);
    }
    let id = spawn(&mut sim, 0, 2, 2);
    let state = sim.unit(id).unwrap().state.clone();

    // Four paid facing steps, then a move whose own turns are prepaid
    sim.order(id, Mission::turn(&state, Facing::South, false, true))
        .unwrap();
    sim.order_move(id, TilePos::new(8, 3, 0)).unwrap();

    let (visited, remaining) = walk(&mut sim, id, 300);
    let unit = sim.unit(id).unwrap();
    assert_eq!(unit.state.tile(), TilePos::new(8, 3, 0));
    assert!(unit.is_idle());

    // Route has both diagonal and straight legs
    let steps: Vec<u32> = visited
        .windows(2)
        .map(|pair| pair[0].changed_axes(&pair[1]))
        .collect();
    assert!(steps.contains(&1));
    assert!(steps.contains(&2));

    let spent = 60 - unit.state.time_units;
    let turns_paid = 4 * sim.config.turn_cost;
    assert_eq!(spent as f32, route_cost(&sim, id, &visited) + turns_paid as f32);

    // Remaining route only ever shrinks when nothing forces a replan
    assert!(!remaining.is_empty());
    assert!(remaining.windows(2).all(|pair| pair[1] <= pair[0]));
}

#[test]
fn test_flyer_climb_charges_vertical_steps() {
    let mut sim = open_field(20);
    let id = sim
        .spawn_unit(ForceId(0), BodyProfile::flyer(), TilePos::new(2, 2, 0))
        .unwrap();
    sim.unit_mut(id).unwrap().state.set_facing(Facing::East);
    sim.order_move(id, TilePos::new(5, 2, 2)).unwrap();

    let (visited, remaining) = walk(&mut sim, id, 300);
    let unit = sim.unit(id).unwrap();
    assert_eq!(unit.state.tile(), TilePos::new(5, 2, 2));
    assert_eq!(unit.state.current_body_state, BodyState::Flying);
    assert!(visited.windows(2).any(|pair| pair[0].z != pair[1].z));

    let spent = 60 - unit.state.time_units;
    assert_eq!(spent as f32, route_cost(&sim, id, &visited));
    assert!(remaining.windows(2).all(|pair| pair[1] <= pair[0]));
}

#[test]
fn test_summary_reports_every_unit() {
    let mut sim = open_field(20);
    spawn(&mut sim, 0, 1, 1);
    spawn(&mut sim, 1, 10, 10);
    let summary = sim.summary();
    assert_eq!(summary.units.len(), 2);
    assert!(summary.units.iter().all(|u| u.idle && u.time_units == 60));
    assert_eq!(
        summary
            .events
            .iter()
            .filter(|e| matches!(e.event_type, BattleEventType::UnitSpawned { .. }))
            .count(),
        2
    );
}
