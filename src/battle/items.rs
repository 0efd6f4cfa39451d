//! Equipment carried by units, and the item and audio services missions talk to
//!
//! Missions only ever name items by `ItemId`; the item itself stays in the
//! unit's inventory until a mission hands it to the world.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::coords::TilePos;
use crate::core::config::ThrowConfig;
use crate::core::types::{ItemId, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentKind {
    Teleporter,
    Grenade,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: ItemId,
    pub name: String,
    pub kind: EquipmentKind,
    pub ammo: u32,
    pub max_ammo: u32,
}

impl Equipment {
    /// New item with a full magazine
    pub fn new(id: ItemId, name: impl Into<String>, kind: EquipmentKind, max_ammo: u32) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            ammo: max_ammo,
            max_ammo,
        }
    }

    pub fn teleporter(id: ItemId) -> Self {
        Self::new(id, "Teleporter", EquipmentKind::Teleporter, 1)
    }

    pub fn grenade(id: ItemId) -> Self {
        Self::new(id, "Grenade", EquipmentKind::Grenade, 1)
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.ammo == self.max_ammo
    }
}

/// Items equipped by a single unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: Vec<Equipment>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equip(&mut self, item: Equipment) {
        self.items.push(item);
    }

    pub fn get(&self, id: ItemId) -> Option<&Equipment> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Equipment> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Unequip an item, handing ownership to the caller
    pub fn remove(&mut self, id: ItemId) -> Option<Equipment> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Equipment> {
        self.items.iter()
    }
}

/// Launch velocity of a throw: horizontal speed and initial vertical speed
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThrowVelocity {
    pub xy: f32,
    pub z: f32,
}

/// Item lying in or flying through the battlefield
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldItem {
    pub item: Equipment,
    pub position: Vec3,
    pub velocity: Vec3,
    pub falling: bool,
}

/// World-side handling of items leaving a unit's hands
pub trait ItemService {
    /// Velocity needed to land a throw from `from` on `target`, None if out of reach
    fn throw_velocity(&self, from: Vec3, target: TilePos) -> Option<ThrowVelocity>;

    fn spawn_falling(&mut self, item: Equipment, position: Vec3);

    fn spawn_thrown(&mut self, item: Equipment, from: Vec3, target: TilePos, velocity: ThrowVelocity);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    Teleport,
}

/// Fire-and-forget sound triggers
pub trait AudioService {
    fn play(&mut self, cue: SoundCue, position: Vec3, gain: f32);
}

fn target_point(target: TilePos) -> Vec3 {
    Vec3::new(
        target.x as f32 + 0.5,
        target.y as f32 + 0.5,
        target.z as f32,
    )
}

/// Items placed in the world during a battle
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BattleItems {
    pub throw: ThrowConfig,
    pub items: Vec<WorldItem>,
}

impl BattleItems {
    pub fn new(throw: ThrowConfig) -> Self {
        Self {
            throw,
            items: Vec::new(),
        }
    }
}

impl ItemService for BattleItems {
    fn throw_velocity(&self, from: Vec3, target: TilePos) -> Option<ThrowVelocity> {
        let to = target_point(target);
        let horizontal = Vec3::new(to.x - from.x, to.y - from.y, 0.0).length();
        if horizontal > self.throw.max_range {
            return None;
        }
        let flight_ticks = (horizontal / self.throw.speed).max(1.0);
        let rise = to.z - from.z;
        let z = (rise + 0.5 * self.throw.gravity * flight_ticks * flight_ticks) / flight_ticks;
        Some(ThrowVelocity {
            xy: self.throw.speed,
            z,
        })
    }

    fn spawn_falling(&mut self, item: Equipment, position: Vec3) {
        debug!("{} dropped at {:?}", item.name, position);
        self.items.push(WorldItem {
            item,
            position,
            velocity: Vec3::default(),
            falling: true,
        });
    }

    fn spawn_thrown(&mut self, item: Equipment, from: Vec3, target: TilePos, velocity: ThrowVelocity) {
        let to = target_point(target);
        let direction = Vec3::new(to.x - from.x, to.y - from.y, 0.0).normalize();
        debug!("{} thrown from {:?} toward {:?}", item.name, from, target);
        self.items.push(WorldItem {
            item,
            position: from,
            velocity: direction * velocity.xy + Vec3::new(0.0, 0.0, velocity.z),
            falling: false,
        });
    }
}

/// A sound that was triggered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub cue: SoundCue,
    pub position: Vec3,
    pub gain: f32,
}

/// Audio backend that only records what was played
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoundLog {
    pub events: Vec<SoundEvent>,
}

impl AudioService for SoundLog {
    fn play(&mut self, cue: SoundCue, position: Vec3, gain: f32) {
        self.events.push(SoundEvent {
            cue,
            position,
            gain,
        });
    }
}
