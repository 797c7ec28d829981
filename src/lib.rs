//! Pulse Runner - A side-scrolling runner with a reactive soundtrack
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, obstacles, collisions, particles)
//! - `audio`: Lookahead music scheduler and one-shot cues
//! - `driver`: Fixed-step game loop tying the two together
//! - `view`: Read-only snapshot handed to the renderer
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences

pub mod audio;
pub mod driver;
pub mod settings;
pub mod sim;
pub mod tuning;
pub mod view;

pub use driver::GameLoop;
pub use settings::{QualityPreset, Settings};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (one tick per 60 Hz display frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Viewport width (world units)
    pub const VIEW_WIDTH: f32 = 800.0;
    /// Y of the ground surface (y grows downward)
    pub const GROUND_LEVEL: f32 = 380.0;

    /// Player defaults
    pub const PLAYER_SIZE: f32 = 40.0;
    /// Fixed screen-space x of the player's left edge
    pub const PLAYER_SCREEN_X: f32 = 120.0;
    pub const PLAYER_COLOR: u32 = 0x00_f0_ff;

    /// Physics defaults (per tick)
    pub const GRAVITY: f32 = 0.6;
    pub const JUMP_VELOCITY: f32 = -12.0;
    pub const INITIAL_SPEED: f32 = 6.0;
    pub const MAX_SPEED: f32 = 14.0;
    pub const SPEED_INCREMENT: f32 = 0.002;
    /// Degrees per tick while jumping
    pub const ROTATION_SPEED: f32 = 6.0;
    /// Fraction of the remaining angle closed per grounded tick
    pub const ROTATION_EASE: f32 = 0.4;
    /// Snap threshold in degrees
    pub const ROTATION_SNAP: f32 = 0.5;

    /// Score is one point per this many world units
    pub const SCORE_DIVISOR: f32 = 100.0;

    /// Obstacle generation
    pub const MIN_GAP: f32 = 400.0;
    pub const EXTRA_GAP_RANGE: f32 = 400.0;
    pub const SPIKE_SIZE: f32 = 40.0;
    pub const SPIKE_SPACING: f32 = 40.0;
    pub const BLOCK_WIDTH: f32 = 60.0;
    pub const PLATFORM_WIDTH: f32 = 120.0;
    pub const PLATFORM_HEIGHT: f32 = 20.0;
    pub const DRONE_WIDTH: f32 = 50.0;
    pub const DRONE_HEIGHT: f32 = 30.0;
    /// Obstacle clusters spawned on every reset
    pub const SEED_OBSTACLES: usize = 5;
    /// Trailing edge distance behind the scroll offset before despawn
    pub const DESPAWN_MARGIN: f32 = 200.0;

    /// Collision
    pub const PLAYER_INSET: f32 = 8.0;
    pub const OBSTACLE_INSET: f32 = 5.0;
    pub const BLOCK_LANDING_TOLERANCE: f32 = 15.0;
    pub const PLATFORM_LANDING_TOLERANCE: f32 = 20.0;

    /// Danger model: distance at which intensity reaches zero
    pub const DANGER_RANGE: f32 = 600.0;

    /// Camera shake
    pub const CRASH_SHAKE: f32 = 25.0;
    pub const SHAKE_DECAY: f32 = 0.9;
    pub const SHAKE_CUTOFF: f32 = 0.5;

    /// Particles
    pub const EXPLOSION_PARTICLES: usize = 30;
    pub const JUMP_PARTICLES: usize = 8;
    pub const PARTICLE_DECAY: f32 = 0.02;
    pub const MAX_PARTICLES: usize = 256;

    /// Music
    pub const BPM: f64 = 135.0;
    pub const STEPS_PER_BAR: u8 = 16;
    /// Scheduler wake-up cadence (ms)
    pub const SCHEDULER_INTERVAL_MS: u32 = 25;
    /// How far ahead of the audio clock notes are queued (s)
    pub const LOOKAHEAD_SECS: f64 = 0.1;
}

/// Duration of one sixteenth note at a given tempo
#[inline]
pub fn seconds_per_step(bpm: f64) -> f64 {
    60.0 / bpm / 4.0
}

/// Nearest multiple of 90 degrees
#[inline]
pub fn nearest_right_angle(degrees: f32) -> f32 {
    (degrees / 90.0).round() * 90.0
}
