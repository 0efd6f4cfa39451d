//! Battle rule constants that are not meant to be tuned
//!
//! Tunable values live in `MovementConfig`.

// Body state changes (TU)
pub const STANCE_CHANGE_COST: u32 = 8;
pub const MAX_TRANSITION_HOPS: usize = 3;

// Units
pub const DEFAULT_TIME_UNITS: u32 = 60;
pub const DEFAULT_BODY_HEIGHT: f32 = 0.6;

// Audio
pub const TELEPORT_SOUND_GAIN: f32 = 0.25;

// Items spawn this far above the dropping unit
pub const DROP_HEIGHT: f32 = 0.5;

// Safety cap for headless runs
pub const MAX_BATTLE_TICKS: u64 = 6000;
