//! Data-driven game balance
//!
//! Defaults come from [`crate::consts`]; any subset can be overridden from JSON.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Per-tick physics and pacing knobs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Downward acceleration added to vertical velocity each tick
    pub gravity: f32,
    /// Vertical velocity applied on jump (negative is up)
    pub jump_velocity: f32,
    /// Scroll speed at the start of a run
    pub initial_speed: f32,
    /// Scroll speed cap
    pub max_speed: f32,
    /// Speed added per tick until the cap
    pub speed_increment: f32,
    /// Degrees of rotation per airborne tick
    pub rotation_speed: f32,
    /// Life lost by each particle per tick
    pub particle_decay: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            jump_velocity: JUMP_VELOCITY,
            initial_speed: INITIAL_SPEED,
            max_speed: MAX_SPEED,
            speed_increment: SPEED_INCREMENT,
            rotation_speed: ROTATION_SPEED,
            particle_decay: PARTICLE_DECAY,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) tuning table
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::sanitized)
    }

    /// Pull values that would make speed fall back into range
    pub fn sanitized(mut self) -> Self {
        if self.speed_increment < 0.0 {
            log::warn!("Negative speed_increment {}, using 0", self.speed_increment);
            self.speed_increment = 0.0;
        }
        if self.initial_speed > self.max_speed {
            log::warn!(
                "initial_speed {} exceeds max_speed {}, clamping",
                self.initial_speed,
                self.max_speed
            );
            self.initial_speed = self.max_speed;
        }
        self
    }

    /// Parse a tuning table, falling back to defaults on malformed input
    pub fn from_json_or_default(json: &str) -> Self {
        match Self::from_json(json) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::warn!("Invalid tuning table ({e}), using defaults");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "gravity": 0.8, "max_speed": 20.0 }"#).unwrap();
        assert_eq!(tuning.gravity, 0.8);
        assert_eq!(tuning.max_speed, 20.0);
        assert_eq!(tuning.jump_velocity, JUMP_VELOCITY);
        assert_eq!(tuning.particle_decay, PARTICLE_DECAY);
    }

    #[test]
    fn test_speed_knobs_are_clamped() {
        let tuning = Tuning::from_json(
            r#"{ "initial_speed": 20.0, "max_speed": 14.0, "speed_increment": -0.1 }"#,
        )
        .unwrap();
        assert_eq!(tuning.initial_speed, 14.0);
        assert_eq!(tuning.speed_increment, 0.0);
        assert_eq!(Tuning::default().sanitized(), Tuning::default());
    }

    #[test]
    fn test_malformed_falls_back() {
        let tuning = Tuning::from_json_or_default("{ gravity: nope");
        assert_eq!(tuning, Tuning::default());
    }
}
