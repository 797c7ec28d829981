//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Obstacles kept in ascending x
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod danger;
pub mod generator;
pub mod particles;
pub mod state;
pub mod tick;

pub use collision::{Aabb, Contact};
pub use generator::{RandomSource, ScriptedSource};
pub use state::{
    GameEvent, GamePhase, GameState, Obstacle, ObstacleKind, ObstacleTag, Oscillation, Particle,
    Player,
};
pub use tick::{TickInput, jump, tick};
