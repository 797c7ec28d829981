//! Procedural soundtrack and sound effects
//!
//! Everything is synthesized from oscillators - no external files needed!
//!
//! Voice graph:
//!
//! ```text
//! kick/snare/hihat/bass/arp -> music bus -> low-pass (intensity) -> master -> out
//! jump/explosion cues --------------------------------------------> master
//! ```
//!
//! Audio is best effort: any backend failure drops the affected note or cue
//! and is logged at debug level. Gameplay never waits on or sees audio.

pub mod backend;
pub mod intensity;
pub mod recording;
pub mod scheduler;
pub mod sequencer;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use backend::{AudioBackend, AudioError, FilterKind, NodeId, Output, Param, Waveform};
pub use intensity::{FilterParams, SharedIntensity};
pub use recording::RecordingBackend;
pub use scheduler::{CancelToken, LookaheadScheduler, TaskStatus};
pub use sequencer::{ARP_NOTES, BASS_LINE, Sequencer, StepHits, hits_for_step};
#[cfg(target_arch = "wasm32")]
pub use web::WebAudioBackend;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::settings::Settings;

/// Time constant of the filter glide (s)
const INTENSITY_GLIDE: f64 = 0.1;
/// Length of the stop fade (s)
const FADE_OUT: f64 = 0.2;
/// Envelope floor (exponential ramps cannot reach zero)
const SILENT: f32 = 0.001;

/// Persistent nodes shared by all music voices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceGraph {
    pub master: NodeId,
    pub filter: NodeId,
    pub music_bus: NodeId,
}

/// One enveloped oscillator
#[derive(Debug, Clone, Copy)]
struct Voice {
    waveform: Waveform,
    freq: f32,
    /// Pitch sweep target over the decay
    freq_end: Option<f32>,
    peak: f32,
    decay: f64,
}

impl Voice {
    const fn new(waveform: Waveform, freq: f32, peak: f32, decay: f64) -> Self {
        Self {
            waveform,
            freq,
            freq_end: None,
            peak,
            decay,
        }
    }

    const fn sweep(mut self, freq_end: f32) -> Self {
        self.freq_end = Some(freq_end);
        self
    }
}

const KICK: Voice = Voice::new(Waveform::Sine, 150.0, 0.9, 0.4).sweep(40.0);
const SNARE_BODY: Voice = Voice::new(Waveform::Triangle, 220.0, 0.4, 0.12).sweep(160.0);
const SNARE_CRACK: Voice = Voice::new(Waveform::Square, 2800.0, 0.12, 0.08).sweep(1800.0);
const HIHAT_DECAY: f64 = 0.04;
const HIHAT_FREQ: f32 = 9000.0;
const BASS_PEAK: f32 = 0.35;
const ARP_PEAK: f32 = 0.12;
const ARP_DECAY: f64 = 0.09;

const JUMP_CUE: Voice = Voice::new(Waveform::Triangle, 300.0, 0.3, 0.15).sweep(700.0);
const EXPLOSION_BOOM: Voice = Voice::new(Waveform::Sawtooth, 100.0, 0.5, 0.4).sweep(30.0);
const EXPLOSION_CRACK: Voice = Voice::new(Waveform::Square, 1500.0, 0.2, 0.1);

/// Music scheduler, voice graph and one-shot cues over an [`AudioBackend`]
pub struct AudioEngine<B: AudioBackend> {
    backend: B,
    graph: Option<VoiceGraph>,
    scheduler: LookaheadScheduler,
    rng: Pcg32,
    shared: Option<SharedIntensity>,
    intensity: Option<f32>,
    master_volume: f32,
    music_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl<B: AudioBackend> AudioEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_seed(backend, 0x5eed_a4f)
    }

    /// `seed` drives the arp's note choice
    pub fn with_seed(mut backend: B, seed: u64) -> Self {
        let defaults = Settings::default();
        let graph = match build_graph(&mut backend, defaults.master_volume, defaults.music_volume)
        {
            Ok(graph) => Some(graph),
            Err(e) => {
                log::warn!("Audio graph unavailable ({e}) - audio disabled");
                None
            }
        };
        Self {
            backend,
            graph,
            scheduler: LookaheadScheduler::default(),
            rng: Pcg32::seed_from_u64(seed),
            shared: None,
            intensity: None,
            master_volume: defaults.master_volume,
            music_volume: defaults.music_volume,
            sfx_volume: defaults.sfx_volume,
            muted: false,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn voice_graph(&self) -> Option<VoiceGraph> {
        self.graph
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn sequencer(&self) -> &Sequencer {
        self.scheduler.sequencer()
    }

    /// Read intensity from a shared slot on every poll
    pub fn attach_intensity(&mut self, shared: SharedIntensity) {
        self.shared = Some(shared);
    }

    /// Start the transport at step 0
    ///
    /// Resumes a suspended context first. Returns the token the polling timer
    /// should watch; calling again while running changes nothing.
    pub fn start(&mut self) -> CancelToken {
        if self.scheduler.is_running() {
            return self.scheduler.start(self.backend.current_time());
        }
        if self.backend.is_suspended() {
            self.backend.resume();
        }
        let now = self.backend.current_time();
        if let Some(graph) = self.graph {
            let level = self.music_level();
            let restored = self
                .backend
                .cancel_scheduled(graph.music_bus, Param::Gain, now)
                .and_then(|_| self.backend.set_value_at(graph.music_bus, Param::Gain, level, now));
            if let Err(e) = restored {
                log::debug!("Could not restore music bus: {e}");
            }
        }
        log::info!("Music transport started");
        self.scheduler.start(now)
    }

    /// Halt the transport and fade the music out quickly
    pub fn stop(&mut self) {
        if !self.scheduler.is_running() {
            return;
        }
        self.scheduler.stop();
        if let Some(graph) = self.graph {
            let now = self.backend.current_time();
            let level = self.music_level();
            if let Err(e) = fade_out(&mut self.backend, graph.music_bus, level, now) {
                log::debug!("Music fade failed: {e}");
            }
        }
        log::info!("Music transport stopped");
    }

    /// One scheduler wake-up: apply the latest intensity, queue due steps
    pub fn poll(&mut self) -> TaskStatus {
        if let Some(latest) = self.shared.as_ref().map(SharedIntensity::load) {
            self.set_intensity(latest);
        }

        let now = self.backend.current_time();
        let mut due = Vec::new();
        let status = self.scheduler.poll(now, |step, at| due.push((step, at)));
        for (step, at) in due {
            self.play_step(step, at);
        }
        status
    }

    /// Glide the music filter toward the brightness for `intensity`
    pub fn set_intensity(&mut self, intensity: f32) {
        let intensity = intensity.clamp(0.0, 1.0);
        if self
            .intensity
            .is_some_and(|current| (current - intensity).abs() < 1e-3)
        {
            return;
        }
        self.intensity = Some(intensity);

        let Some(graph) = self.graph else { return };
        let params = FilterParams::for_intensity(intensity);
        let now = self.backend.current_time();
        let result = self
            .backend
            .set_target_at(graph.filter, Param::Frequency, params.cutoff_hz, now, INTENSITY_GLIDE)
            .and_then(|_| {
                self.backend
                    .set_target_at(graph.filter, Param::Q, params.q, now, INTENSITY_GLIDE)
            });
        if let Err(e) = result {
            log::debug!("Filter update dropped: {e}");
        }
    }

    /// Most recently applied intensity
    pub fn intensity(&self) -> f32 {
        self.intensity.unwrap_or(0.0)
    }

    /// Apply volume and mute preferences
    pub fn set_volumes(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.music_volume = settings.music_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;

        let Some(graph) = self.graph else { return };
        let now = self.backend.current_time();
        let master = if self.muted { 0.0 } else { self.master_volume };
        let mut result = self
            .backend
            .set_value_at(graph.master, Param::Gain, master, now);
        if self.scheduler.is_running() {
            let level = self.music_level();
            result = result.and_then(|_| {
                self.backend
                    .set_value_at(graph.music_bus, Param::Gain, level, now)
            });
        }
        if let Err(e) = result {
            log::debug!("Volume change dropped: {e}");
        }
    }

    /// Rising chirp, independent of the transport
    pub fn play_jump(&mut self) {
        self.play_cue("jump", &[JUMP_CUE]);
    }

    /// Low boom with a crack on top, independent of the transport
    pub fn play_explosion(&mut self) {
        self.play_cue("explosion", &[EXPLOSION_BOOM, EXPLOSION_CRACK]);
    }

    fn music_level(&self) -> f32 {
        self.music_volume.max(SILENT)
    }

    fn play_cue(&mut self, name: &str, voices: &[Voice]) {
        if self.muted || self.sfx_volume <= 0.0 {
            return;
        }
        if self.backend.is_suspended() {
            self.backend.resume();
        }
        let out = self
            .graph
            .map(|g| Output::Node(g.master))
            .unwrap_or(Output::Destination);
        let now = self.backend.current_time();
        for voice in voices {
            let voice = Voice {
                peak: voice.peak * self.sfx_volume,
                ..*voice
            };
            if let Err(e) = schedule_voice(&mut self.backend, voice, now, out) {
                log::debug!("Dropped {name} cue: {e}");
            }
        }
    }

    fn play_step(&mut self, step: u8, at: f64) {
        let Some(graph) = self.graph else { return };
        let out = Output::Node(graph.music_bus);
        let hits = hits_for_step(step);
        let step_duration = self.scheduler.sequencer().step_duration();

        let mut voices: Vec<(&str, Voice)> = Vec::with_capacity(6);
        if hits.kick {
            voices.push(("kick", KICK));
        }
        if hits.snare {
            voices.push(("snare", SNARE_BODY));
            voices.push(("snare", SNARE_CRACK));
        }
        if let Some(volume) = hits.hihat {
            voices.push((
                "hihat",
                Voice::new(Waveform::Square, HIHAT_FREQ, volume, HIHAT_DECAY),
            ));
        }
        if let Some(freq) = hits.bass {
            voices.push((
                "bass",
                Voice::new(Waveform::Sawtooth, freq, BASS_PEAK, step_duration * 0.9),
            ));
        }
        if hits.arp {
            let note = ARP_NOTES[self.rng.random_range(0..ARP_NOTES.len())];
            voices.push(("arp", Voice::new(Waveform::Square, note, ARP_PEAK, ARP_DECAY)));
        }

        for (name, voice) in voices {
            if let Err(e) = schedule_voice(&mut self.backend, voice, at, out) {
                log::debug!("Dropped {name} at step {step}: {e}");
            }
        }
    }
}

fn build_graph<B: AudioBackend>(
    backend: &mut B,
    master_volume: f32,
    music_volume: f32,
) -> Result<VoiceGraph, AudioError> {
    let now = backend.current_time();
    let master = backend.create_gain()?;
    let filter = backend.create_filter(FilterKind::LowPass)?;
    let music_bus = backend.create_gain()?;

    backend.connect(master, Output::Destination)?;
    backend.connect(filter, Output::Node(master))?;
    backend.connect(music_bus, Output::Node(filter))?;

    let closed = FilterParams::for_intensity(0.0);
    backend.set_value_at(master, Param::Gain, master_volume, now)?;
    backend.set_value_at(music_bus, Param::Gain, music_volume.max(SILENT), now)?;
    backend.set_value_at(filter, Param::Frequency, closed.cutoff_hz, now)?;
    backend.set_value_at(filter, Param::Q, closed.q, now)?;

    Ok(VoiceGraph {
        master,
        filter,
        music_bus,
    })
}

fn fade_out<B: AudioBackend>(
    backend: &mut B,
    node: NodeId,
    from_level: f32,
    now: f64,
) -> Result<(), AudioError> {
    backend.cancel_scheduled(node, Param::Gain, now)?;
    backend.set_value_at(node, Param::Gain, from_level, now)?;
    backend.exponential_ramp_to(node, Param::Gain, SILENT, now + FADE_OUT)
}

/// Allocate an oscillator + gain, envelope them, schedule start and stop
///
/// Both handles are released whether or not scheduling succeeds.
fn schedule_voice<B: AudioBackend>(
    backend: &mut B,
    voice: Voice,
    at: f64,
    out: Output,
) -> Result<(), AudioError> {
    let osc = backend.create_oscillator(voice.waveform)?;
    let gain = match backend.create_gain() {
        Ok(gain) => gain,
        Err(e) => {
            backend.release(osc);
            return Err(e);
        }
    };
    let result = envelope(backend, osc, gain, voice, at, out);
    backend.release(osc);
    backend.release(gain);
    result
}

fn envelope<B: AudioBackend>(
    backend: &mut B,
    osc: NodeId,
    gain: NodeId,
    voice: Voice,
    at: f64,
    out: Output,
) -> Result<(), AudioError> {
    backend.connect(osc, Output::Node(gain))?;
    backend.connect(gain, out)?;

    let end = at + voice.decay;
    backend.set_value_at(osc, Param::Frequency, voice.freq, at)?;
    if let Some(freq_end) = voice.freq_end {
        backend.exponential_ramp_to(osc, Param::Frequency, freq_end, end)?;
    }
    backend.set_value_at(gain, Param::Gain, voice.peak.max(SILENT), at)?;
    backend.exponential_ramp_to(gain, Param::Gain, SILENT, end)?;

    backend.start_at(osc, at)?;
    backend.stop_at(osc, end + 0.02)
}
