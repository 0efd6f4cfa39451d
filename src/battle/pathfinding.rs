//! Path planning for battle maps
//!
//! Planners treat the adjacency evaluator as an opaque edge oracle, so the
//! same search serves walkers, flyers and large units.

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::battle::adjacency::{distance_static, TileAdjacencyEvaluator};
use crate::battle::coords::TilePos;

/// Admissibility and cost of single steps, as seen by a planner
pub trait MoveCostOracle {
    fn is_valid(&self, pos: TilePos) -> bool;

    /// Cost of stepping between two adjacent tiles, None if not admissible
    fn step_cost(&self, from: TilePos, to: TilePos, demand_give_way: bool) -> Option<f32>;

    /// Admissible estimate of the cost between two tiles
    fn distance(&self, from: TilePos, to: TilePos) -> f32 {
        distance_static(from, to)
    }
}

impl MoveCostOracle for TileAdjacencyEvaluator<'_> {
    fn is_valid(&self, pos: TilePos) -> bool {
        self.map().tile_is_valid(pos)
    }

    fn step_cost(&self, from: TilePos, to: TilePos, demand_give_way: bool) -> Option<f32> {
        self.can_enter(from, to, false, demand_give_way)
            .map(|step| step.cost)
    }

    fn distance(&self, from: TilePos, to: TilePos) -> f32 {
        self.heuristic_distance(from, to)
    }
}

/// Outcome of a planning request
///
/// Paths exclude the start tile and end with the tile reached.
#[derive(Debug, Clone, PartialEq)]
pub enum PathResult {
    /// Route to the goal
    Complete(Vec<TilePos>),
    /// Route to the explored tile closest to the goal
    Partial(Vec<TilePos>),
    /// No progress possible
    Empty,
}

impl PathResult {
    pub fn tiles(&self) -> &[TilePos] {
        match self {
            PathResult::Complete(path) | PathResult::Partial(path) => path,
            PathResult::Empty => &[],
        }
    }

    pub fn into_tiles(self) -> Vec<TilePos> {
        match self {
            PathResult::Complete(path) | PathResult::Partial(path) => path,
            PathResult::Empty => Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PathResult::Complete(_))
    }
}

/// Shortest-path service consumed by movement missions
pub trait PathPlanner {
    fn find_shortest_path(
        &self,
        from: TilePos,
        to: TilePos,
        max_iterations: usize,
        oracle: &dyn MoveCostOracle,
        demand_give_way: bool,
    ) -> PathResult;
}

/// Node in the A* open set
#[derive(Debug, Clone)]
struct PathNode {
    pos: TilePos,
    f_cost: OrderedFloat<f32>, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .cmp(&self.f_cost)
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* over the 26-neighbourhood
#[derive(Debug, Clone, Copy, Default)]
pub struct AStarPlanner;

impl PathPlanner for AStarPlanner {
    fn find_shortest_path(
        &self,
        from: TilePos,
        to: TilePos,
        max_iterations: usize,
        oracle: &dyn MoveCostOracle,
        demand_give_way: bool,
    ) -> PathResult {
        if from == to {
            return PathResult::Complete(Vec::new());
        }
        if !oracle.is_valid(from) || !oracle.is_valid(to) {
            return PathResult::Empty;
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<TilePos, TilePos> = AHashMap::new();
        let mut g_scores: AHashMap<TilePos, f32> = AHashMap::new();

        g_scores.insert(from, 0.0);
        open_set.push(PathNode {
            pos: from,
            f_cost: OrderedFloat(oracle.distance(from, to)),
        });

        let mut closest = from;
        let mut closest_distance = oracle.distance(from, to);
        let mut iterations = 0;

        while let Some(current) = open_set.pop() {
            if current.pos == to {
                return PathResult::Complete(reconstruct_path(&came_from, from, to));
            }
            if iterations >= max_iterations {
                break;
            }
            iterations += 1;

            let current_g = *g_scores.get(&current.pos).unwrap_or(&f32::INFINITY);
            // Stale heap entry
            if current.f_cost.0 > current_g + oracle.distance(current.pos, to) {
                continue;
            }

            let remaining = oracle.distance(current.pos, to);
            if remaining < closest_distance {
                closest = current.pos;
                closest_distance = remaining;
            }

            for neighbor in current.pos.neighbors() {
                if !oracle.is_valid(neighbor) {
                    continue;
                }
                let Some(step) = oracle.step_cost(current.pos, neighbor, demand_give_way) else {
                    continue;
                };

                let tentative_g = current_g + step;
                let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.pos);
                    g_scores.insert(neighbor, tentative_g);

                    let f_cost = tentative_g + oracle.distance(neighbor, to);
                    open_set.push(PathNode {
                        pos: neighbor,
                        f_cost: OrderedFloat(f_cost),
                    });
                }
            }
        }

        if closest == from {
            PathResult::Empty
        } else {
            PathResult::Partial(reconstruct_path(&came_from, from, closest))
        }
    }
}

/// Reconstruct path from came_from map, excluding the start
fn reconstruct_path(
    came_from: &AHashMap<TilePos, TilePos>,
    start: TilePos,
    mut current: TilePos,
) -> Vec<TilePos> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Sum of step costs along `path` starting from `start`
///
/// None if any step is not admissible.
pub fn path_cost(oracle: &dyn MoveCostOracle, start: TilePos, path: &[TilePos]) -> Option<f32> {
    let mut total = 0.0;
    let mut previous = start;
    for &pos in path {
        total += oracle.step_cost(previous, pos, false)?;
        previous = pos;
    }
    Some(total)
}
