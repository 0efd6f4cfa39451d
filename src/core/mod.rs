pub mod config;
pub mod error;
pub mod types;

pub use config::{MovementConfig, ThrowConfig};
pub use error::{Result, TacticalError};
