//! Tile coordinates and 8-way facing for the battle grid
//!
//! x grows east, y grows south, z grows up. Facing index 0 is north and
//! increases clockwise.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Integer tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn up(&self) -> Self {
        self.offset(0, 0, 1)
    }

    pub fn down(&self) -> Self {
        self.offset(0, 0, -1)
    }

    /// Tile containing a continuous position
    pub fn containing(position: Vec3) -> Self {
        Self::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        )
    }

    /// True when `other` is one of the 26 tiles around this one
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self != other
            && (self.x - other.x).abs() <= 1
            && (self.y - other.y).abs() <= 1
            && (self.z - other.z).abs() <= 1
    }

    /// Number of axes along which the two tiles differ
    pub fn changed_axes(&self, other: &Self) -> u32 {
        (self.x != other.x) as u32 + (self.y != other.y) as u32 + (self.z != other.z) as u32
    }

    /// All 26 neighbouring tile coordinates (unchecked against any map)
    pub fn neighbors(&self) -> impl Iterator<Item = TilePos> + '_ {
        (-1..=1).flat_map(move |dz| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).filter_map(move |dx| {
                    if dx == 0 && dy == 0 && dz == 0 {
                        None
                    } else {
                        Some(self.offset(dx, dy, dz))
                    }
                })
            })
        })
    }

    /// Neighbour on the same level in the given direction
    pub fn step(&self, facing: Facing) -> Self {
        let (dx, dy) = facing.vector();
        self.offset(dx, dy, 0)
    }
}

/// Eight compass directions a unit can face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Facing {
    #[default]
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Facing {
    /// All directions, clockwise from north
    pub const ALL: [Facing; 8] = [
        Facing::North,
        Facing::NorthEast,
        Facing::East,
        Facing::SouthEast,
        Facing::South,
        Facing::SouthWest,
        Facing::West,
        Facing::NorthWest,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 8]
    }

    /// Unit vector (dx, dy) for this direction
    pub fn vector(&self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::NorthEast => (1, -1),
            Facing::East => (1, 0),
            Facing::SouthEast => (1, 1),
            Facing::South => (0, 1),
            Facing::SouthWest => (-1, 1),
            Facing::West => (-1, 0),
            Facing::NorthWest => (-1, -1),
        }
    }

    pub fn from_vector(dx: i32, dy: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.vector() == (dx.signum(), dy.signum()))
    }

    pub fn clockwise(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    pub fn counter_clockwise(&self) -> Self {
        Self::from_index(self.index() + 7)
    }

    pub fn opposite(&self) -> Self {
        Self::from_index(self.index() + 4)
    }

    /// Allowed facing closest (by angle) to the direction from `from` to `to`
    ///
    /// Vertical-only or zero offsets keep `current`.
    pub fn toward(
        from: Vec3,
        to: Vec3,
        current: Facing,
        allowed: impl Fn(Facing) -> bool,
    ) -> Facing {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx == 0.0 && dy == 0.0 {
            return current;
        }
        let target = Vec3::new(dx, dy, 0.0).normalize();

        let mut closest_angle = f32::MAX;
        let mut closest = current;
        for facing in Self::ALL {
            let (fx, fy) = facing.vector();
            let candidate = Vec3::new(fx as f32, fy as f32, 0.0).normalize();
            let dot = (target.x * candidate.x + target.y * candidate.y).clamp(-1.0, 1.0);
            let angle = dot.acos();
            if angle < closest_angle && allowed(facing) {
                closest_angle = angle;
                closest = facing;
            }
        }
        closest
    }

    /// One rotation step from `self` toward `target` along the shorter arc
    ///
    /// Ties rotate counter-clockwise. Disallowed facings are skipped over.
    pub fn step_toward(&self, target: Facing, allowed: impl Fn(Facing) -> bool) -> Facing {
        if *self == target {
            return *self;
        }
        let current = self.index() as i32;
        let goal = target.index() as i32;
        let clockwise_distance = (goal - current).rem_euclid(8);
        let counter_clockwise_distance = (current - goal).rem_euclid(8);

        let mut dest = *self;
        for _ in 0..8 {
            dest = if clockwise_distance < counter_clockwise_distance {
                dest.clockwise()
            } else {
                dest.counter_clockwise()
            };
            if allowed(dest) {
                break;
            }
        }
        dest
    }
}
