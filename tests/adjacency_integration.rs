//! Step admissibility and path planning over shared battle maps

use battlescape::battle::*;
use battlescape::core::types::{ForceId, UnitId};

fn soldier(id: u32) -> MoverProfile {
    MoverProfile {
        id: UnitId(id),
        owner: ForceId(0),
        large: false,
        can_fly: false,
        max_height: DEFAULT_BODY_HEIGHT,
    }
}

fn flyer(id: u32) -> MoverProfile {
    MoverProfile {
        can_fly: true,
        ..soldier(id)
    }
}

fn evaluator(map: &BattleMap, mover: MoverProfile) -> TileAdjacencyEvaluator<'_> {
    TileAdjacencyEvaluator::new(map, mover, 0.675)
}

fn park(map: &mut BattleMap, pos: TilePos, unit: u32, owner: u32) {
    map.commit_occupancy([(
        pos,
        Occupant {
            unit: UnitId(unit),
            owner: ForceId(owner),
            large: false,
            moving: false,
        },
    )]);
}

#[test]
fn test_open_step_costs_base() {
    let map = BattleMap::new(12, 12, 2);
    let step = evaluator(&map, soldier(0))
        .can_enter(TilePos::new(5, 5, 0), TilePos::new(6, 5, 0), false, false)
        .unwrap();
    assert_eq!(step.cost, 4.0);
    assert!(!step.door_in_the_way);
}

#[test]
fn test_cost_grows_with_changed_axes() {
    let map = BattleMap::new(12, 12, 3);
    let walker = evaluator(&map, soldier(0));
    let from = TilePos::new(5, 5, 0);
    assert_eq!(walker.can_enter(from, TilePos::new(5, 6, 0), false, false).unwrap().cost, 4.0);
    assert_eq!(walker.can_enter(from, TilePos::new(6, 6, 0), false, false).unwrap().cost, 6.0);

    let flying = evaluator(&map, flyer(0));
    assert_eq!(flying.can_enter(from, TilePos::new(6, 6, 1), false, false).unwrap().cost, 8.0);
}

#[test]
fn test_planner_routes_around_impassable_tile() {
    let mut map = BattleMap::new(12, 12, 2);
    map.set_movement_cost(TilePos::new(6, 5, 0), IMPASSABLE);
    let oracle = evaluator(&map, soldier(0));

    let start = TilePos::new(5, 5, 0);
    let goal = TilePos::new(8, 5, 0);
    let result = AStarPlanner.find_shortest_path(start, goal, 1000, &oracle, false);
    assert!(result.is_complete());
    assert_eq!(result.tiles().last(), Some(&goal));
    assert!(!result.tiles().contains(&TilePos::new(6, 5, 0)));

    let cost = path_cost(&oracle, start, result.tiles()).unwrap();
    assert!(cost > 12.0);
}

#[test]
fn test_planner_reports_partial_route_when_walled_in() {
    let mut map = BattleMap::new(12, 12, 2);
    let goal = TilePos::new(8, 5, 0);
    for facing in Facing::ALL {
        map.set_movement_cost(goal.step(facing), IMPASSABLE);
    }
    let oracle = evaluator(&map, soldier(0));
    let result = AStarPlanner.find_shortest_path(TilePos::new(2, 5, 0), goal, 5000, &oracle, false);
    assert!(!result.is_complete());
    assert!(!result.tiles().contains(&goal));
}

#[test]
fn test_falling_is_free_and_straight_down() {
    let map = BattleMap::new(12, 12, 3);
    let walker = evaluator(&map, soldier(0));
    let air = TilePos::new(4, 4, 1);

    let fall = walker.can_enter(air, TilePos::new(4, 4, 0), false, false).unwrap();
    assert_eq!(fall.cost, 0.0);
    assert!(walker.can_enter(air, TilePos::new(5, 4, 0), false, false).is_none());
    assert!(walker.can_enter(air, TilePos::new(5, 4, 1), false, false).is_none());
}

#[test]
fn test_closed_door_reported_not_blocking() {
    let mut map = BattleMap::new(12, 12, 2);
    map.set_wall(TilePos::new(6, 5, 0), WallSide::Left, 4, true);
    let step = evaluator(&map, soldier(0))
        .can_enter(TilePos::new(5, 5, 0), TilePos::new(6, 5, 0), false, false)
        .unwrap();
    assert!(step.door_in_the_way);

    map.open_doors_between(TilePos::new(5, 5, 0), TilePos::new(6, 5, 0), false);
    let step = evaluator(&map, soldier(0))
        .can_enter(TilePos::new(5, 5, 0), TilePos::new(6, 5, 0), false, false)
        .unwrap();
    assert!(!step.door_in_the_way);
}

#[test]
fn test_allies_can_be_asked_to_give_way() {
    let mut map = BattleMap::new(12, 12, 2);
    let from = TilePos::new(5, 5, 0);
    let to = TilePos::new(6, 5, 0);
    park(&mut map, to, 1, 0);

    let walker = evaluator(&map, soldier(0));
    assert!(walker.can_enter(from, to, false, false).is_none());
    assert!(walker.can_enter(from, to, false, true).is_some());
    assert!(walker.can_enter(from, to, true, false).is_some());
}

#[test]
fn test_enemies_never_give_way() {
    let mut map = BattleMap::new(12, 12, 2);
    let from = TilePos::new(5, 5, 0);
    let to = TilePos::new(6, 5, 0);
    park(&mut map, to, 1, 1);

    let walker = evaluator(&map, soldier(0));
    assert!(walker.can_enter(from, to, false, true).is_none());
    assert!(walker.can_enter(from, to, true, false).is_some());
}

#[test]
fn test_large_unit_needs_whole_footprint() {
    let mut map = BattleMap::new(12, 12, 3);
    let large = MoverProfile {
        large: true,
        ..soldier(0)
    };
    let from = TilePos::new(5, 5, 0);
    let to = TilePos::new(6, 5, 0);
    assert!(evaluator(&map, large).can_enter(from, to, false, false).is_some());

    // Only the far corner of the destination footprint is blocked
    map.set_movement_cost(TilePos::new(6, 4, 0), IMPASSABLE);
    assert!(evaluator(&map, large).can_enter(from, to, false, false).is_none());
    assert!(evaluator(&map, soldier(0)).can_enter(from, to, false, false).is_some());
}
