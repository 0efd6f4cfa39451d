//! Mission lifecycles driven through the battle tick loop

use battlescape::battle::*;
use battlescape::core::config::MovementConfig;
use battlescape::core::types::{ForceId, ItemId, UnitId, Vec3};

fn battle() -> BattleSimulation {
    let config = MovementConfig {
        movement_speed: 1.0,
        time_unit_regen_per_tick: 0,
        ..MovementConfig::default()
    };
    BattleSimulation::new(BattleMap::new(16, 16, 3), config).unwrap()
}

fn spawn(sim: &mut BattleSimulation, x: i32, y: i32) -> UnitId {
    sim.spawn_unit(ForceId(0), BodyProfile::soldier(), TilePos::new(x, y, 0))
        .unwrap()
}

#[test]
fn test_turn_pays_per_step() {
    let mut sim = battle();
    let id = spawn(&mut sim, 5, 5);
    let mission = Mission::turn(&sim.unit(id).unwrap().state, Facing::South, false, true);
    sim.order(id, mission).unwrap();
    sim.run_until_idle(50);

    let state = &sim.unit(id).unwrap().state;
    assert_eq!(state.facing, Facing::South);
    assert_eq!(state.time_units, 60 - 4);
}

#[test]
fn test_stand_up_from_prone_goes_through_kneeling() {
    let mut sim = battle();
    let id = spawn(&mut sim, 5, 5);
    sim.unit_mut(id).unwrap().state.set_body_state(BodyState::Prone);

    let mission = Mission::change_body_state(&sim.unit(id).unwrap().state, BodyState::Standing);
    sim.order(id, mission).unwrap();

    sim.step();
    assert_eq!(
        sim.unit(id).unwrap().state.target_body_state,
        BodyState::Kneeling
    );
    sim.run_until_idle(50);

    let state = &sim.unit(id).unwrap().state;
    assert_eq!(state.current_body_state, BodyState::Standing);
    assert_eq!(state.time_units, 60 - 2 * STANCE_CHANGE_COST);
}

#[test]
fn test_queued_missions_run_in_order() {
    let mut sim = battle();
    let id = spawn(&mut sim, 5, 5);
    let state = sim.unit(id).unwrap().state.clone();
    sim.order(id, Mission::turn(&state, Facing::East, false, true))
        .unwrap();
    sim.order(id, Mission::change_body_state(&state, BodyState::Kneeling))
        .unwrap();
    assert_eq!(sim.unit(id).unwrap().missions.len(), 2);

    sim.step();
    // Still turning, posture untouched
    let state = &sim.unit(id).unwrap().state;
    assert_eq!(state.current_body_state, BodyState::Standing);
    assert_ne!(state.goal_facing, Facing::North);

    sim.run_until_idle(50);
    let state = &sim.unit(id).unwrap().state;
    assert_eq!(state.facing, Facing::East);
    assert_eq!(state.current_body_state, BodyState::Kneeling);
    assert_eq!(state.time_units, 60 - 2 - STANCE_CHANGE_COST);
}

#[test]
fn test_goto_impassable_target_is_dropped() {
    let mut sim = battle();
    sim.map.set_movement_cost(TilePos::new(9, 9, 0), IMPASSABLE);
    let id = spawn(&mut sim, 5, 5);
    sim.order_move(id, TilePos::new(9, 9, 0)).unwrap();

    let unit = sim.unit(id).unwrap();
    assert!(unit.missions.is_empty());
    assert!(unit.is_idle());
    assert_eq!(unit.state.time_units, 60);
}

#[test]
fn test_goto_into_air_lands_below() {
    let mut sim = battle();
    let id = spawn(&mut sim, 5, 5);
    sim.order_move(id, TilePos::new(5, 8, 2)).unwrap();

    let goto = sim.unit(id).unwrap().missions.front().unwrap();
    assert!(matches!(&goto.kind, MissionKind::GotoLocation(g) if g.target == TilePos::new(5, 8, 0)));

    sim.run_until_idle(100);
    assert_eq!(sim.unit(id).unwrap().state.tile(), TilePos::new(5, 8, 0));
}

#[test]
fn test_throw_releases_item_and_recovers() {
    let mut sim = battle();
    let id = spawn(&mut sim, 5, 9);
    sim.unit_mut(id)
        .unwrap()
        .state
        .inventory
        .equip(Equipment::grenade(ItemId(3)));

    let target = TilePos::new(5, 4, 0);
    let mission = Mission::throw_item(&sim.unit(id).unwrap().state, ItemId(3), target, &sim.items)
        .unwrap();
    sim.order(id, mission).unwrap();
    sim.run_until_idle(50);

    let state = &sim.unit(id).unwrap().state;
    assert!(state.inventory.is_empty());
    assert_eq!(state.current_body_state, BodyState::Standing);
    assert_eq!(state.time_units, 60 - throw_cost(60, 18));
    assert_eq!(sim.items.items.len(), 1);
    assert!(!sim.items.items[0].falling);
}

#[test]
fn test_throw_out_of_range_is_refused() {
    let mut sim = battle();
    sim.items.throw.max_range = 3.0;
    let id = spawn(&mut sim, 1, 1);
    sim.unit_mut(id)
        .unwrap()
        .state
        .inventory
        .equip(Equipment::grenade(ItemId(3)));

    let state = &sim.unit(id).unwrap().state;
    assert!(Mission::throw_item(state, ItemId(3), TilePos::new(12, 12, 0), &sim.items).is_none());
    assert!(Mission::throw_item(state, ItemId(9), TilePos::new(2, 2, 0), &sim.items).is_none());
}

#[test]
fn test_drop_item_falls_from_hand() {
    let mut sim = battle();
    let id = spawn(&mut sim, 5, 5);
    sim.unit_mut(id)
        .unwrap()
        .state
        .inventory
        .equip(Equipment::grenade(ItemId(1)));
    sim.order(id, Mission::drop_item(ItemId(1))).unwrap();
    sim.run_until_idle(10);

    assert!(sim.unit(id).unwrap().state.inventory.is_empty());
    assert_eq!(sim.items.items.len(), 1);
    let dropped = &sim.items.items[0];
    assert!(dropped.falling);
    assert_eq!(dropped.position, Vec3::new(5.5, 5.5, DROP_HEIGHT));
}

#[test]
fn test_teleport_moves_and_clears_queue() {
    let mut sim = battle();
    let id = spawn(&mut sim, 2, 2);
    sim.unit_mut(id)
        .unwrap()
        .state
        .inventory
        .equip(Equipment::teleporter(ItemId(7)));

    let state = sim.unit(id).unwrap().state.clone();
    sim.order(id, Mission::snooze(5)).unwrap();
    sim.order(id, Mission::turn(&state, Facing::South, false, true))
        .unwrap();
    sim.unit_mut(id).unwrap().missions.clear();
    sim.order(id, Mission::teleport(ItemId(7), TilePos::new(10, 11, 0)))
        .unwrap();

    let unit = sim.unit(id).unwrap();
    assert!(unit.missions.is_empty());
    assert_eq!(unit.state.position, Vec3::new(10.5, 11.5, 0.0));
    assert_eq!(unit.state.time_units, 60 - 60 * 55 / 100);
    assert_eq!(unit.state.inventory.get(ItemId(7)).unwrap().ammo, 0);

    assert_eq!(sim.sounds.events.len(), 1);
    assert_eq!(sim.sounds.events[0].cue, SoundCue::Teleport);
    assert_eq!(sim.sounds.events[0].gain, TELEPORT_SOUND_GAIN);

    // Spent charge
    sim.order(id, Mission::teleport(ItemId(7), TilePos::new(2, 2, 0)))
        .unwrap();
    assert_eq!(
        sim.unit(id).unwrap().state.position,
        Vec3::new(10.5, 11.5, 0.0)
    );
}

#[test]
fn test_teleport_onto_occupied_tile_cancels() {
    let mut sim = battle();
    let id = spawn(&mut sim, 2, 2);
    spawn(&mut sim, 6, 6);
    sim.unit_mut(id)
        .unwrap()
        .state
        .inventory
        .equip(Equipment::teleporter(ItemId(7)));
    sim.order(id, Mission::teleport(ItemId(7), TilePos::new(6, 6, 0)))
        .unwrap();

    let unit = sim.unit(id).unwrap();
    assert_eq!(unit.state.tile(), TilePos::new(2, 2, 0));
    assert_eq!(unit.state.time_units, 60);
    assert!(unit.missions.is_empty());
}

#[test]
fn test_waits_for_time_units_then_moves() {
    let config = MovementConfig {
        movement_speed: 1.0,
        time_unit_regen_per_tick: 1,
        ..MovementConfig::default()
    };
    let mut sim = BattleSimulation::new(BattleMap::new(16, 16, 3), config).unwrap();
    let id = spawn(&mut sim, 5, 5);
    sim.unit_mut(id).unwrap().state.time_units = 0;
    sim.order_move(id, TilePos::new(5, 4, 0)).unwrap();

    sim.step();
    assert!(sim
        .unit(id)
        .unwrap()
        .missions
        .iter()
        .any(|m| matches!(m.kind, MissionKind::AcquireTu { .. })));

    sim.run_until_idle(100);
    assert_eq!(sim.unit(id).unwrap().state.tile(), TilePos::new(5, 4, 0));
}
