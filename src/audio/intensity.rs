//! Danger intensity hand-off and filter mapping

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Latest danger intensity, written by the simulation and read by the audio side
///
/// A single atomic scalar: the audio scheduler never sees entity state.
#[derive(Debug, Clone, Default)]
pub struct SharedIntensity(Arc<AtomicU32>);

impl SharedIntensity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, intensity: f32) {
        self.0
            .store(intensity.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Low-pass settings for a danger intensity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub cutoff_hz: f32,
    pub q: f32,
}

impl FilterParams {
    pub const MIN_CUTOFF: f32 = 200.0;
    pub const CUTOFF_SPAN: f32 = 9800.0;

    /// Quadratic cutoff curve, linear resonance
    pub fn for_intensity(intensity: f32) -> Self {
        let i = intensity.clamp(0.0, 1.0);
        Self {
            cutoff_hz: Self::MIN_CUTOFF + Self::CUTOFF_SPAN * i * i,
            q: 1.0 + 5.0 * i,
        }
    }
}
