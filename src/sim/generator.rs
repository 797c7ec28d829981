//! Procedural obstacle generation
//!
//! Clusters are appended ahead of the scroll front, each one at least
//! [`MIN_GAP`] after the previous obstacle.

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::{Obstacle, ObstacleKind, Oscillation};
use crate::consts::*;

/// Uniform randomness used by the generator and particle spawns
pub trait RandomSource {
    /// Uniform value in [0, 1)
    fn next_unit(&mut self) -> f32;

    /// Uniform value in [0, span)
    fn up_to(&mut self, span: f32) -> f32 {
        self.next_unit() * span
    }

    /// Uniform value in [lo, hi)
    fn between(&mut self, lo: f32, hi: f32) -> f32 {
        lo + self.next_unit() * (hi - lo)
    }
}

impl RandomSource for Pcg32 {
    fn next_unit(&mut self) -> f32 {
        self.random::<f32>()
    }
}

/// Replays a fixed list of unit values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: Vec<f32>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(values: impl Into<Vec<f32>>) -> Self {
        let values = values.into();
        assert!(!values.is_empty(), "scripted source needs at least one value");
        Self { values, cursor: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f32 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v.clamp(0.0, 1.0 - f32::EPSILON)
    }
}

/// Append one obstacle cluster after `last_x`
///
/// Returns the number of obstacles added (1, or 2 for a double spike).
pub fn spawn_cluster<R: RandomSource + ?Sized>(
    obstacles: &mut Vec<Obstacle>,
    last_x: f32,
    rng: &mut R,
) -> usize {
    let x = last_x + MIN_GAP + rng.up_to(EXTRA_GAP_RANGE);
    let r = rng.next_unit();

    if r > 0.8 {
        let y = GROUND_LEVEL - 100.0 - rng.up_to(100.0);
        let osc = Oscillation {
            initial_y: y,
            speed: rng.between(0.05, 0.10),
            range: rng.between(50.0, 100.0),
        };
        obstacles.push(Obstacle {
            x,
            y,
            width: DRONE_WIDTH,
            height: DRONE_HEIGHT,
            kind: ObstacleKind::Drone { osc },
        });
        1
    } else if r > 0.6 {
        let y = GROUND_LEVEL - 80.0 - rng.up_to(60.0);
        let osc = Oscillation {
            initial_y: y,
            speed: 0.02,
            range: 30.0,
        };
        obstacles.push(Obstacle {
            x,
            y,
            width: PLATFORM_WIDTH,
            height: PLATFORM_HEIGHT,
            kind: ObstacleKind::Platform { osc },
        });
        1
    } else if r > 0.35 {
        let height = 60.0 + rng.up_to(60.0);
        obstacles.push(Obstacle {
            x,
            y: GROUND_LEVEL - height,
            width: BLOCK_WIDTH,
            height,
            kind: ObstacleKind::Block,
        });
        1
    } else {
        let count = if rng.next_unit() < 0.5 { 1 } else { 2 };
        for i in 0..count {
            obstacles.push(Obstacle {
                x: x + i as f32 * SPIKE_SPACING,
                y: GROUND_LEVEL - SPIKE_SIZE,
                width: SPIKE_SIZE,
                height: SPIKE_SIZE,
                kind: ObstacleKind::Spike,
            });
        }
        count
    }
}

/// X to place the next cluster after: the trailing obstacle, or the right edge of the view
pub fn last_x(obstacles: &[Obstacle], scroll_offset: f32) -> f32 {
    obstacles
        .last()
        .map(|o| o.x)
        .unwrap_or(scroll_offset + VIEW_WIDTH)
}

/// Keep at least one viewport of obstacles ahead of the player
///
/// Returns the number of obstacles added.
pub fn fill_window<R: RandomSource + ?Sized>(
    obstacles: &mut Vec<Obstacle>,
    scroll_offset: f32,
    player_world_x: f32,
    rng: &mut R,
) -> usize {
    let mut added = 0;
    loop {
        let needs_more = match obstacles.last() {
            Some(last) => last.x - player_world_x < VIEW_WIDTH,
            None => true,
        };
        if !needs_more {
            break;
        }
        let from = last_x(obstacles, scroll_offset);
        added += spawn_cluster(obstacles, from, rng);
    }
    added
}

/// Pre-seed a fresh run with [`SEED_OBSTACLES`] clusters
pub fn seed_run<R: RandomSource + ?Sized>(obstacles: &mut Vec<Obstacle>, rng: &mut R) {
    for _ in 0..SEED_OBSTACLES {
        let from = last_x(obstacles, 0.0);
        spawn_cluster(obstacles, from, rng);
    }
}

/// Drop leading obstacles whose trailing edge is [`DESPAWN_MARGIN`] behind the scroll offset
///
/// Returns the number removed.
pub fn despawn_passed(obstacles: &mut Vec<Obstacle>, scroll_offset: f32) -> usize {
    let passed = obstacles
        .iter()
        .take_while(|o| o.right() < scroll_offset - DESPAWN_MARGIN)
        .count();
    obstacles.drain(..passed);
    passed
}
