//! Collision detection and response
//!
//! Axis-aligned boxes, shrunk by a fixed inset on both axes so grazing
//! contacts feel fair. Player and obstacles are compared in world space.

use super::state::{Obstacle, Player};
use crate::consts::{OBSTACLE_INSET, PLAYER_INSET};

/// Axis-aligned bounding box (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Aabb {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    /// Shrink by `inset` on every side
    pub fn inset(self, inset: f32) -> Self {
        Self {
            left: self.left + inset,
            top: self.top + inset,
            right: self.right - inset,
            bottom: self.bottom - inset,
        }
    }

    /// Strict overlap (touching edges do not collide)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }
}

/// Player hitbox at a world-space x
pub fn player_box(player: &Player, world_x: f32) -> Aabb {
    Aabb::new(world_x, player.y, player.width, player.height).inset(PLAYER_INSET)
}

pub fn obstacle_box(obstacle: &Obstacle) -> Aabb {
    Aabb::new(obstacle.x, obstacle.y, obstacle.width, obstacle.height).inset(OBSTACLE_INSET)
}

/// Outcome of touching an obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// Landed from above: rest the player on this top edge
    Landed { top: f32 },
    /// Run-ending hit
    Crash,
}

/// Resolve a player/obstacle pair
///
/// `prev_bottom` is the player's bottom edge before this tick's integration.
/// Landing is a swept test: falling feet that crossed a solid top this tick
/// (having started no deeper than the kind's tolerance) come to rest on it,
/// even before the inset boxes overlap. Any other overlap is a crash.
pub fn resolve(
    player: &Player,
    world_x: f32,
    prev_bottom: f32,
    obstacle: &Obstacle,
) -> Option<Contact> {
    let player_hitbox = player_box(player, world_x);
    let obstacle_hitbox = obstacle_box(obstacle);

    let horizontal = player_hitbox.left < obstacle_hitbox.right
        && player_hitbox.right > obstacle_hitbox.left;
    if !horizontal {
        return None;
    }

    if let Some(tolerance) = obstacle.kind.landing_tolerance() {
        let top = obstacle.top();
        if player.vy > 0.0 && prev_bottom <= top + tolerance && player.bottom() >= top {
            return Some(Contact::Landed { top });
        }
    }

    if player_hitbox.overlaps(&obstacle_hitbox) {
        Some(Contact::Crash)
    } else {
        None
    }
}
