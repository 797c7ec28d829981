//! Game state and core simulation types
//!
//! Everything the simulation owns lives here as plain data. The renderer and
//! the audio engine only ever read from it.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::tuning::Tuning;

/// Current phase of the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GamePhase {
    /// Title screen, nothing simulates
    #[default]
    Menu,
    /// External asset generation in progress, nothing simulates
    Generating,
    /// Active gameplay
    Playing,
    /// Run ended, state frozen for rendering
    GameOver,
    /// Game is paused
    Paused,
}

/// Vertical sinusoid around a baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    /// Baseline Y the obstacle oscillates around
    pub initial_y: f32,
    /// Radians per tick
    pub speed: f32,
    /// Peak displacement from the baseline
    pub range: f32,
}

impl Oscillation {
    /// Y at a given simulation frame
    #[inline]
    pub fn y_at(&self, frame: u64) -> f32 {
        self.initial_y + (frame as f32 * self.speed).sin() * self.range
    }
}

/// Obstacle variants
///
/// Moving variants carry their oscillation so the physics step never has to
/// handle a missing one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Spike,
    Block,
    Platform { osc: Oscillation },
    Drone { osc: Oscillation },
}

impl ObstacleKind {
    pub fn oscillation(&self) -> Option<&Oscillation> {
        match self {
            ObstacleKind::Platform { osc } | ObstacleKind::Drone { osc } => Some(osc),
            ObstacleKind::Spike | ObstacleKind::Block => None,
        }
    }

    /// Contact with this kind always ends the run
    pub fn is_lethal(&self) -> bool {
        matches!(self, ObstacleKind::Spike | ObstacleKind::Drone { .. })
    }

    /// How far below the top a falling player may be and still land on it
    pub fn landing_tolerance(&self) -> Option<f32> {
        match self {
            ObstacleKind::Block => Some(BLOCK_LANDING_TOLERANCE),
            ObstacleKind::Platform { .. } => Some(PLATFORM_LANDING_TOLERANCE),
            ObstacleKind::Spike | ObstacleKind::Drone { .. } => None,
        }
    }

    pub fn tag(&self) -> ObstacleTag {
        match self {
            ObstacleKind::Spike => ObstacleTag::Spike,
            ObstacleKind::Block => ObstacleTag::Block,
            ObstacleKind::Platform { .. } => ObstacleTag::Platform,
            ObstacleKind::Drone { .. } => ObstacleTag::Drone,
        }
    }
}

/// Data-free variant tag (for events and renderer lookups)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObstacleTag {
    Spike,
    Block,
    Platform,
    Drone,
}

/// An obstacle in world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: f32,
    /// Top edge
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }
}

/// The player avatar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Screen-space x of the left edge (the world scrolls past it)
    pub x: f32,
    /// Top edge
    pub y: f32,
    pub vy: f32,
    /// Degrees
    pub rotation: f32,
    pub is_dead: bool,
    pub is_jumping: bool,
    pub is_grounded: bool,
    pub width: f32,
    pub height: f32,
    pub color: u32,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            x: PLAYER_SCREEN_X,
            y: GROUND_LEVEL - PLAYER_SIZE,
            vy: 0.0,
            rotation: 0.0,
            is_dead: false,
            is_jumping: false,
            is_grounded: true,
            width: PLAYER_SIZE,
            height: PLAYER_SIZE,
            color: PLAYER_COLOR,
        }
    }
}

impl Player {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Center in screen space
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rest on a surface at `top`
    pub fn land_on(&mut self, top: f32) {
        self.y = top - self.height;
        self.vy = 0.0;
        self.is_grounded = true;
        self.is_jumping = false;
    }
}

/// A particle for visual effects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Screen space
    pub pos: Vec2,
    pub vel: Vec2,
    /// 0-1, decreases over time
    pub life: f32,
    pub color: u32,
    pub radius: f32,
}

/// Discrete things that happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Player-initiated jump took effect
    Jumped,
    /// Airborne player touched down on the ground or an obstacle top
    Landed,
    /// Run-ending collision
    Crashed { obstacle: ObstacleTag, at: Vec2 },
    /// Phase changed
    PhaseChanged { from: GamePhase, to: GamePhase },
}

/// Complete game state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// Obstacle and particle randomness (reseeded on reset)
    pub rng: Pcg32,
    pub tuning: Tuning,
    pub phase: GamePhase,
    pub player: Player,
    /// Ascending x
    pub obstacles: Vec<Obstacle>,
    pub particles: Vec<Particle>,
    /// Distance travelled this run
    pub scroll_offset: f32,
    pub speed: f32,
    pub score: u64,
    /// Best score this session (survives resets)
    pub best_score: u64,
    pub screen_shake: f32,
    /// Danger intensity computed on the last tick
    pub intensity: f32,
    /// Ticks simulated this run
    pub frame_count: u64,
    /// Cosmetic particle cap (from settings)
    pub max_particles: usize,
    /// Events since the last drain
    pub(crate) events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new game state (in the menu, with a seeded run ready)
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        let tuning = tuning.sanitized();
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            phase: GamePhase::Menu,
            player: Player::default(),
            obstacles: Vec::new(),
            particles: Vec::new(),
            scroll_offset: 0.0,
            speed: tuning.initial_speed,
            score: 0,
            best_score: 0,
            screen_shake: 0.0,
            intensity: 0.0,
            frame_count: 0,
            max_particles: MAX_PARTICLES,
            events: Vec::new(),
        };
        state.reset();
        state
    }

    /// Reinitialize the run: fresh player, no obstacles or particles, five seeded obstacle clusters
    ///
    /// Always reseeds from `self.seed`, so repeated resets produce the same run.
    pub fn reset(&mut self) {
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.player = Player::default();
        self.obstacles.clear();
        self.particles.clear();
        self.scroll_offset = 0.0;
        self.speed = self.tuning.initial_speed;
        self.score = 0;
        self.screen_shake = 0.0;
        self.intensity = 0.0;
        self.frame_count = 0;
        super::generator::seed_run(&mut self.obstacles, &mut self.rng);
        log::debug!("Run reset (seed {}, {} obstacles)", self.seed, self.obstacles.len());
    }

    /// Change the seed used by the next reset
    pub fn reseed(&mut self, seed: u64) {
        self.seed = seed;
    }

    /// World-space x of the player's left edge
    pub fn player_world_x(&self) -> f32 {
        self.scroll_offset + self.player.x
    }

    /// Screen-space x of an obstacle
    pub fn screen_x(&self, obstacle: &Obstacle) -> f32 {
        obstacle.x - self.scroll_offset
    }

    pub(crate) fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
