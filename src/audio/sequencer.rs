//! 16-step pattern and transport cursor

use crate::consts::{BPM, STEPS_PER_BAR};
use crate::seconds_per_step;

/// Bass line in Hz, one entry per sixteenth (0 = rest)
pub const BASS_LINE: [f32; STEPS_PER_BAR as usize] = [
    55.0, 0.0, 55.0, 0.0, //
    0.0, 55.0, 0.0, 65.41, //
    55.0, 0.0, 55.0, 0.0, //
    0.0, 82.41, 73.42, 0.0,
];

/// Arp notes (A minor pentatonic, two octaves)
pub const ARP_NOTES: [f32; 8] = [440.0, 523.25, 587.33, 659.25, 783.99, 880.0, 1046.5, 1174.66];

/// Which voices sound on a step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepHits {
    pub kick: bool,
    pub snare: bool,
    /// Hi-hat volume, if it plays
    pub hihat: Option<f32>,
    /// Bass frequency, if it plays
    pub bass: Option<f32>,
    pub arp: bool,
}

pub const HIHAT_VOLUME: f32 = 0.1;
pub const HIHAT_ACCENT_VOLUME: f32 = 0.2;

/// Pattern rules for one step of the bar
pub fn hits_for_step(step: u8) -> StepHits {
    let step = step % STEPS_PER_BAR;
    let hihat = if step % 2 == 0 {
        Some(if step % 4 == 2 {
            HIHAT_ACCENT_VOLUME
        } else {
            HIHAT_VOLUME
        })
    } else {
        None
    };
    let bass = BASS_LINE[step as usize];
    StepHits {
        kick: step % 4 == 0,
        snare: step == 4 || step == 12,
        hihat,
        bass: (bass > 0.0).then_some(bass),
        arp: step % 3 == 0,
    }
}

/// Step cursor and the audio-clock time of the next step
#[derive(Debug, Clone, PartialEq)]
pub struct Sequencer {
    step: u8,
    next_step_time: f64,
    step_duration: f64,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(BPM)
    }
}

impl Sequencer {
    pub fn new(bpm: f64) -> Self {
        Self {
            step: 0,
            next_step_time: 0.0,
            step_duration: seconds_per_step(bpm),
        }
    }

    /// Rewind to step 0, first step due at `start_time`
    pub fn reset(&mut self, start_time: f64) {
        self.step = 0;
        self.next_step_time = start_time;
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn next_step_time(&self) -> f64 {
        self.next_step_time
    }

    pub fn step_duration(&self) -> f64 {
        self.step_duration
    }

    /// Move to the next sixteenth, wrapping after the last step of the bar
    pub fn advance(&mut self) {
        self.next_step_time += self.step_duration;
        self.step = (self.step + 1) % STEPS_PER_BAR;
    }
}
