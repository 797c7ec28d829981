//! Fixed-step game loop
//!
//! Owns the simulation and the audio engine and is the only place the two
//! meet: it feeds the per-tick intensity into a [`SharedIntensity`] slot and
//! turns simulation events into cues and transport changes. The platform
//! layer calls [`GameLoop::frame`] from its display callback and
//! [`GameLoop::poll_audio`] from an independent timer.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::audio::{AudioBackend, AudioEngine, CancelToken, SharedIntensity, TaskStatus};
use crate::consts::{MAX_SUBSTEPS, SIM_DT};
use crate::settings::Settings;
use crate::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
use crate::tuning::Tuning;
use crate::view::FrameView;

/// Longest frame delta accepted (s); longer gaps are treated as a stall
const MAX_FRAME_DT: f32 = 0.1;

pub struct GameLoop<B: AudioBackend> {
    state: GameState,
    audio: AudioEngine<B>,
    settings: Settings,
    intensity: SharedIntensity,
    /// Seeds for successive runs
    seeds: Pcg32,
    accumulator: f32,
    input: TickInput,
    frame_token: Option<CancelToken>,
    /// Transport started but not yet handed to a polling timer
    audio_task: Option<CancelToken>,
}

impl<B: AudioBackend> GameLoop<B> {
    pub fn new(seed: u64, backend: B) -> Self {
        Self::with_config(seed, Tuning::default(), Settings::default(), backend)
    }

    pub fn with_config(seed: u64, tuning: Tuning, settings: Settings, backend: B) -> Self {
        let intensity = SharedIntensity::new();
        let mut audio = AudioEngine::with_seed(backend, seed);
        audio.attach_intensity(intensity.clone());

        let mut game = Self {
            state: GameState::with_tuning(seed, tuning),
            audio,
            settings: Settings::default(),
            intensity,
            seeds: Pcg32::seed_from_u64(seed),
            accumulator: 0.0,
            input: TickInput::default(),
            frame_token: None,
            audio_task: None,
        };
        game.apply_settings(settings);
        game
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct state access for scripted scenarios
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn audio(&self) -> &AudioEngine<B> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine<B> {
        &mut self.audio
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn intensity(&self) -> SharedIntensity {
        self.intensity.clone()
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView::new(&self.state)
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        self.state.max_particles = settings.max_particles();
        self.audio.set_volumes(&settings);
        self.settings = settings;
    }

    /// Begin accepting frames; returns the token the frame callback watches
    pub fn start(&mut self) -> CancelToken {
        if let Some(token) = self.frame_token.as_ref().filter(|t| !t.is_cancelled()) {
            return token.clone();
        }
        let token = CancelToken::new();
        self.frame_token = Some(token.clone());
        self.accumulator = 0.0;
        log::info!("Game loop started");
        token
    }

    /// Cancel the pending frame callback and silence the music
    pub fn stop(&mut self) {
        if let Some(token) = self.frame_token.take() {
            token.cancel();
            log::info!("Game loop stopped");
        }
        self.audio.stop();
        self.audio_task = None;
    }

    pub fn is_running(&self) -> bool {
        self.frame_token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Advance by a display frame of `dt` seconds; returns the ticks run
    pub fn frame(&mut self, dt: f32) -> u32 {
        if !self.is_running() {
            return 0;
        }
        self.accumulator += dt.clamp(0.0, MAX_FRAME_DT);

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.step();
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        if substeps == MAX_SUBSTEPS {
            // Drop the backlog rather than spiral
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        substeps
    }

    /// Run exactly one simulation tick with the pending input
    pub fn step(&mut self) -> Vec<GameEvent> {
        let input = self.input;
        tick(&mut self.state, &input);
        // Clear one-shot inputs after processing
        self.input = TickInput::default();

        self.intensity.publish(self.state.intensity);
        self.dispatch()
    }

    /// Jump while playing; start a run from the menu or game over screen
    pub fn press_jump(&mut self) {
        match self.state.phase {
            GamePhase::Playing => self.input.jump = true,
            GamePhase::Menu | GamePhase::GameOver => self.begin_run(),
            GamePhase::Generating | GamePhase::Paused => {}
        }
    }

    pub fn toggle_pause(&mut self) {
        self.input.pause = true;
    }

    /// Focus lost: pause a live run unless the player opted out
    pub fn on_blur(&mut self) {
        if self.settings.pause_on_blur && self.state.phase == GamePhase::Playing {
            self.request_phase(GamePhase::Paused);
            log::info!("Auto-paused (focus lost)");
        }
    }

    /// Start a fresh run; runs after the first get a new seed
    pub fn begin_run(&mut self) {
        if self.state.phase == GamePhase::GameOver || self.state.frame_count > 0 {
            let seed = self.seeds.random::<u64>();
            self.state.reseed(seed);
            self.state.reset();
            log::info!("Started new run with seed: {seed}");
        }
        self.request_phase(GamePhase::Playing);
    }

    pub fn request_phase(&mut self, target: GamePhase) -> Vec<GameEvent> {
        self.state.request_phase(target);
        self.dispatch()
    }

    /// Hand a newly started music transport to the polling timer
    pub fn take_audio_task(&mut self) -> Option<CancelToken> {
        self.audio_task.take()
    }

    /// Audio timer callback
    pub fn poll_audio(&mut self) -> TaskStatus {
        self.audio.poll()
    }

    fn dispatch(&mut self) -> Vec<GameEvent> {
        let events = self.state.drain_events();
        for event in &events {
            match event {
                GameEvent::Jumped => self.audio.play_jump(),
                GameEvent::Crashed { .. } => self.audio.play_explosion(),
                GameEvent::PhaseChanged {
                    to: GamePhase::Playing,
                    ..
                } => {
                    let already = self.audio.is_running();
                    let token = self.audio.start();
                    if !already {
                        self.audio_task = Some(token);
                    }
                }
                GameEvent::PhaseChanged { .. } => self.audio.stop(),
                GameEvent::Landed => {}
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RecordingBackend, Waveform};
    use crate::consts::*;
    use crate::sim::{Obstacle, ObstacleKind};

    fn game() -> GameLoop<RecordingBackend> {
        GameLoop::new(42, RecordingBackend::new())
    }

    fn spike_at(x: f32) -> Obstacle {
        Obstacle {
            x,
            y: GROUND_LEVEL - SPIKE_SIZE,
            width: SPIKE_SIZE,
            height: SPIKE_SIZE,
            kind: ObstacleKind::Spike,
        }
    }

    #[test]
    fn test_frames_need_start() {
        let mut game = game();
        assert_eq!(game.frame(SIM_DT), 0);
        game.start();
        assert_eq!(game.frame(SIM_DT * 1.01), 1);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut game = game();
        game.start();
        assert_eq!(game.frame(0.5), MAX_SUBSTEPS);
        // Backlog was dropped
        assert!(game.frame(0.0) <= 1);
    }

    #[test]
    fn test_stop_cancels_frame_token_and_music() {
        let mut game = game();
        let token = game.start();
        game.press_jump();
        assert!(game.audio().is_running());

        game.stop();
        assert!(token.is_cancelled());
        assert!(!game.audio().is_running());
        assert_eq!(game.frame(SIM_DT), 0);
    }

    #[test]
    fn test_first_press_starts_run_and_music() {
        let mut game = game();
        game.press_jump();
        assert_eq!(game.state().phase, GamePhase::Playing);
        assert!(game.audio().is_running());
        let task = game.take_audio_task().expect("transport handed to timer");
        assert!(!task.is_cancelled());
        assert_eq!(game.poll_audio(), TaskStatus::Pending);
        assert!(game.take_audio_task().is_none());
    }

    #[test]
    fn test_jump_press_plays_cue() {
        let mut game = game();
        game.press_jump();
        game.audio_mut().backend_mut().clear_commands();
        game.press_jump();
        let events = game.step();
        assert!(events.contains(&GameEvent::Jumped));
        assert!(
            game.audio()
                .backend()
                .started_oscillators()
                .iter()
                .any(|(_, w, _)| *w == Waveform::Triangle)
        );
        // Input is one-shot
        game.step();
        assert!(game.state().player.vy > JUMP_VELOCITY);
    }

    #[test]
    fn test_crash_stops_music_and_booms() {
        let mut game = game();
        game.press_jump();
        let pwx = game.state().player_world_x();
        game.state_mut().obstacles = vec![spike_at(pwx + 20.0), spike_at(pwx + 5000.0)];
        game.audio_mut().backend_mut().clear_commands();

        let events = game.step();
        assert!(events.iter().any(|e| matches!(e, GameEvent::Crashed { .. })));
        assert_eq!(game.state().phase, GamePhase::GameOver);
        assert!(!game.audio().is_running());
        assert!(
            game.audio()
                .backend()
                .started_oscillators()
                .iter()
                .any(|(_, w, _)| *w == Waveform::Sawtooth)
        );
    }

    #[test]
    fn test_restart_after_crash_uses_new_seed() {
        let mut game = game();
        game.press_jump();
        let first_seed = game.state().seed;
        let pwx = game.state().player_world_x();
        game.state_mut().obstacles = vec![spike_at(pwx + 20.0), spike_at(pwx + 5000.0)];
        game.step();

        game.press_jump();
        assert_eq!(game.state().phase, GamePhase::Playing);
        assert_ne!(game.state().seed, first_seed);
        assert!(!game.state().player.is_dead);
        assert_eq!(game.state().scroll_offset, 0.0);
        assert!(game.audio().is_running());
    }

    #[test]
    fn test_intensity_is_published_each_step() {
        let mut game = game();
        game.press_jump();
        let pwx = game.state().player_world_x();
        game.state_mut().obstacles = vec![spike_at(pwx + 300.0), spike_at(pwx + 5000.0)];
        game.step();
        let published = game.intensity().load();
        assert!(published > 0.0);
        assert_eq!(published, game.state().intensity);

        game.poll_audio();
        assert_eq!(game.audio().intensity(), published);
    }

    #[test]
    fn test_pause_toggle_and_blur() {
        let mut game = game();
        game.press_jump();
        game.toggle_pause();
        game.step();
        assert_eq!(game.state().phase, GamePhase::Paused);
        assert!(!game.audio().is_running());

        let scroll = game.state().scroll_offset;
        game.step();
        assert_eq!(game.state().scroll_offset, scroll);

        game.toggle_pause();
        game.step();
        assert_eq!(game.state().phase, GamePhase::Playing);
        assert!(game.audio().is_running());

        game.on_blur();
        assert_eq!(game.state().phase, GamePhase::Paused);
    }

    #[test]
    fn test_blur_respects_opt_out() {
        let mut game = game();
        game.apply_settings(Settings {
            pause_on_blur: false,
            ..Settings::default()
        });
        game.press_jump();
        game.on_blur();
        assert_eq!(game.state().phase, GamePhase::Playing);
        assert!(game.audio().is_running());
    }

    #[test]
    fn test_settings_cap_particles() {
        let mut game = game();
        game.apply_settings(Settings {
            particles: false,
            ..Settings::default()
        });
        game.press_jump();
        game.press_jump();
        game.step();
        assert!(game.state().particles.is_empty());
    }
}
