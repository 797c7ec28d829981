//! Pulse Runner entry point
//!
//! Web: display-driven frame loop plus a 25 ms audio timer.
//! Native: headless autopilot run for soak testing the simulation and scheduler.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{FocusEvent, KeyboardEvent, PointerEvent, TouchEvent};

    use pulse_runner::audio::{CancelToken, TaskStatus, WebAudioBackend};
    use pulse_runner::consts::*;
    use pulse_runner::{GameLoop, Settings, Tuning};

    /// Game instance plus the platform clock
    struct Game {
        game: GameLoop<WebAudioBackend>,
        last_time: f64,
    }

    impl Game {
        fn toggle_mute(&mut self) {
            let mut settings = self.game.settings().clone();
            settings.muted = !settings.muted;
            settings.save();
            log::info!("Muted: {}", settings.muted);
            self.game.apply_settings(settings);
        }

        fn update_hud(&self) {
            let view = self.game.view();
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            if let Some(el) = document.get_element_by_id("score") {
                el.set_text_content(Some(&view.score.to_string()));
            }
            if let Some(el) = document.get_element_by_id("best") {
                el.set_text_content(Some(&view.best_score.to_string()));
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Pulse Runner starting...");

        let seed = js_sys::Date::now() as u64;
        let game = GameLoop::with_config(seed, Tuning::default(), Settings::load(), WebAudioBackend::new());
        let game = Rc::new(RefCell::new(Game {
            game,
            last_time: 0.0,
        }));

        let frames = game.borrow_mut().game.start();
        setup_input_handlers(game.clone());
        request_animation_frame(game, frames);

        log::info!("Pulse Runner running!");
    }

    /// Apply an input, then hand any newly started music to its timer
    fn with_input(game: &Rc<RefCell<Game>>, apply: impl FnOnce(&mut Game)) {
        let task = {
            let mut g = game.borrow_mut();
            apply(&mut g);
            g.game.take_audio_task()
        };
        if let Some(token) = task {
            audio_tick(game.clone(), token);
        }
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                match event.key().as_str() {
                    " " | "ArrowUp" | "w" | "W" => {
                        event.prevent_default();
                        with_input(&game, |g| g.game.press_jump());
                    }
                    "Escape" | "p" | "P" => with_input(&game, |g| g.game.toggle_pause()),
                    "m" | "M" => game.borrow_mut().toggle_mute(),
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Mouse / pen
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                with_input(&game, |g| g.game.press_jump());
            });
            let _ = window
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                with_input(&game, |g| g.game.press_jump());
            });
            let _ = window
                .add_event_listener_with_callback("touchstart", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Window blur (click outside, tab switch)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: FocusEvent| {
                game.borrow_mut().game.on_blur();
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>, frames: CancelToken) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, frames, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, frames: CancelToken, time: f64) {
        if frames.is_cancelled() {
            log::info!("Frame loop cancelled");
            return;
        }

        let task = {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.game.frame(dt);
            g.update_hud();
            g.game.take_audio_task()
        };
        if let Some(token) = task {
            audio_tick(game.clone(), token);
        }

        request_animation_frame(game, frames);
    }

    /// Poll the music scheduler now and every interval until its token is cancelled
    fn audio_tick(game: Rc<RefCell<Game>>, token: CancelToken) {
        if token.is_cancelled() {
            return;
        }
        if game.borrow_mut().game.poll_audio() == TaskStatus::Cancelled {
            return;
        }

        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move || audio_tick(game, token));
        let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            SCHEDULER_INTERVAL_MS as i32,
        );
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use clap::Parser;

    use pulse_runner::audio::{AudioBackend, RecordingBackend};
    use pulse_runner::consts::*;
    use pulse_runner::sim::{GamePhase, GameState, ObstacleKind};
    use pulse_runner::{GameLoop, QualityPreset, Settings, Tuning};

    /// Headless autopilot: plays the game without a display or sound device
    #[derive(Debug, Parser)]
    #[command(name = "pulse-runner", version, about)]
    pub struct Args {
        /// Run seed (defaults to a fixed seed for reproducible runs)
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Simulation ticks to run (60 per second)
        #[arg(long, default_value_t = 60 * 60)]
        ticks: u64,
        /// JSON tuning table overriding the default balance
        #[arg(long)]
        tuning: Option<PathBuf>,
        /// Quality preset (low, medium, high)
        #[arg(long, default_value = "medium")]
        quality: String,
        /// Debug logging
        #[arg(short, long)]
        pub verbose: bool,
    }

    /// Jump when a ground hazard is about to reach the player
    fn should_jump(state: &GameState) -> bool {
        let front = state.player_world_x() + state.player.width;
        state
            .obstacles
            .iter()
            .find(|o| o.right() > state.player_world_x())
            .is_some_and(|o| {
                matches!(o.kind, ObstacleKind::Spike | ObstacleKind::Block)
                    && o.x - front < state.speed * 6.0
            })
    }

    pub fn run(args: Args) {
        let tuning = match &args.tuning {
            Some(path) => match std::fs::read_to_string(path) {
                Ok(json) => Tuning::from_json_or_default(&json),
                Err(e) => {
                    log::warn!("Could not read {}: {e}", path.display());
                    Tuning::default()
                }
            },
            None => Tuning::default(),
        };
        let quality = QualityPreset::from_str(&args.quality).unwrap_or_else(|| {
            log::warn!("Unknown quality {:?}, using medium", args.quality);
            QualityPreset::Medium
        });

        let mut game = GameLoop::with_config(
            args.seed,
            tuning,
            Settings::from_preset(quality),
            RecordingBackend::new(),
        );
        game.start();
        game.press_jump();

        let interval = SCHEDULER_INTERVAL_MS as f64 / 1000.0;
        let mut next_poll = 0.0;
        let mut runs = 1u32;
        let mut notes = 0usize;

        for _ in 0..args.ticks {
            if game.state().phase == GamePhase::GameOver {
                log::info!("Run {runs} over at score {}", game.state().score);
                runs += 1;
                game.press_jump();
            } else if should_jump(game.state()) {
                game.press_jump();
            }
            game.step();

            // Audio clock follows simulated time
            game.audio_mut().backend_mut().advance(SIM_DT as f64);
            while game.audio().backend().current_time() >= next_poll {
                game.poll_audio();
                next_poll += interval;
            }
            let backend = game.audio_mut().backend_mut();
            notes += backend.started_oscillators().len();
            backend.clear_commands();
        }

        game.stop();
        let state = game.state();
        println!(
            "{} ticks, {runs} runs, best score {}, current score {}, {notes} voices scheduled",
            args.ticks,
            state.best_score.max(state.score),
            state.score
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    let args = headless::Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::info!("Pulse Runner (headless) starting...");
    headless::run(args);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
