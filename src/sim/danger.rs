//! Danger model
//!
//! Maps proximity of the nearest upcoming obstacle to an intensity in [0, 1].

use super::state::Obstacle;
use crate::consts::DANGER_RANGE;

/// Forward distance from `player_world_x` to the nearest obstacle strictly ahead
pub fn nearest_obstacle_distance(obstacles: &[Obstacle], player_world_x: f32) -> Option<f32> {
    obstacles
        .iter()
        .map(|o| o.x - player_world_x)
        .filter(|d| *d > 0.0)
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

/// `clamp(1 - distance / 600, 0, 1)`; zero when nothing is ahead
pub fn intensity(nearest: Option<f32>) -> f32 {
    match nearest {
        Some(distance) => (1.0 - distance / DANGER_RANGE).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Intensity for the current obstacle layout
pub fn intensity_for(obstacles: &[Obstacle], player_world_x: f32) -> f32 {
    intensity(nearest_obstacle_distance(obstacles, player_world_x))
}
