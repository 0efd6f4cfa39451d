//! Battlescape - movement and action resolution for turn-based tactical combat

pub mod battle;
pub mod core;
