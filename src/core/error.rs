use thiserror::Error;

use crate::battle::coords::TilePos;
use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum TacticalError {
    #[error("Tile {0:?} is not on the map")]
    OffMap(TilePos),

    #[error("Step from {0:?} to itself")]
    SameTile(TilePos),

    #[error("Unit not found: {0:?}")]
    UnitNotFound(UnitId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TacticalError>;
