//! Error types for the spawn pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Instance limit reached - pool cannot take on another instance")]
    LimitReached,

    #[error("Handle is not currently spawned by this template pool")]
    NotSpawned,

    #[error("Handle is not held as spawned by any template pool in this group")]
    NotManaged,

    #[error("Handle is already despawned - double despawn rejected")]
    AlreadyDespawned,

    #[error("Template pool has already been preloaded")]
    AlreadyPreloaded,

    #[error("Preload target of {requested} conflicts with instance limit of {limit}")]
    PreloadLimitConflict { requested: usize, limit: usize },

    #[error("No template pool found for template '{0}'")]
    TemplateNotFound(String),

    #[error("Pool state corruption: {0}")]
    StateCorruption(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
