//! Fixed timestep simulation tick
//!
//! Core game loop that advances the simulation deterministically. One call
//! per display frame; constants are per-tick.

use glam::Vec2;

use super::collision::{self, Contact};
use super::state::{GameEvent, GamePhase, GameState, ObstacleTag};
use super::{danger, generator, particles};
use crate::consts::*;
use crate::nearest_right_angle;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Jump pressed (keyboard, pointer or touch)
    pub jump: bool,
    /// Pause toggle
    pub pause: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    if input.pause {
        match state.phase {
            GamePhase::Playing => {
                state.request_phase(GamePhase::Paused);
                return;
            }
            GamePhase::Paused => state.request_phase(GamePhase::Playing),
            _ => {}
        }
    }

    // Shake is run state and keeps settling on the game over screen
    decay_shake(state);

    if state.phase != GamePhase::Playing {
        return;
    }

    if input.jump {
        jump(state);
    }

    state.frame_count += 1;
    let tuning = state.tuning;
    let prev_bottom = state.player.bottom();

    // 1. Integrate
    state.player.vy += tuning.gravity;
    state.player.y += state.player.vy;
    let was_grounded = state.player.is_grounded;
    state.player.is_grounded = false;

    // 2. Scroll, score, speed ramp
    state.scroll_offset += state.speed;
    state.score = (state.scroll_offset / SCORE_DIVISOR).floor() as u64;
    state.speed = (state.speed + tuning.speed_increment).min(tuning.max_speed);

    // 3. Ground
    if state.player.bottom() >= GROUND_LEVEL {
        state.player.land_on(GROUND_LEVEL);
    }

    // 4. Keep the obstacle window full
    let removed = generator::despawn_passed(&mut state.obstacles, state.scroll_offset);
    let player_world_x = state.player_world_x();
    let added = generator::fill_window(
        &mut state.obstacles,
        state.scroll_offset,
        player_world_x,
        &mut state.rng,
    );
    if removed + added > 0 {
        log::trace!("Obstacles: -{removed} +{added} ({} live)", state.obstacles.len());
    }

    // 5. Oscillating obstacles
    let frame = state.frame_count;
    for obstacle in &mut state.obstacles {
        if let Some(osc) = obstacle.kind.oscillation() {
            obstacle.y = osc.y_at(frame);
        }
    }

    // 6. Danger
    state.intensity = danger::intensity_for(&state.obstacles, player_world_x);

    // 7. Collisions against this tick's integrated position
    let mut crashed_into = None;
    for obstacle in &state.obstacles {
        match collision::resolve(&state.player, player_world_x, prev_bottom, obstacle) {
            Some(Contact::Landed { top }) => state.player.land_on(top),
            Some(Contact::Crash) => {
                crashed_into = Some(obstacle.kind.tag());
                break;
            }
            None => {}
        }
    }

    if let Some(tag) = crashed_into {
        crash(state, tag);
    } else {
        if state.player.is_grounded && !was_grounded {
            state.push_event(GameEvent::Landed);
        }
        // 8. Rotation
        update_rotation(state);
    }

    // 9. Particles
    particles::advance(&mut state.particles, tuning.particle_decay);
}

/// Apply a jump impulse if the player is grounded, alive and playing
///
/// Returns whether the jump took effect.
pub fn jump(state: &mut GameState) -> bool {
    let player = &mut state.player;
    if state.phase != GamePhase::Playing || !player.is_grounded || player.is_dead {
        return false;
    }

    player.vy = state.tuning.jump_velocity;
    player.is_jumping = true;
    player.is_grounded = false;

    let feet = Vec2::new(player.x + player.width / 2.0, player.bottom());
    particles::spawn_jump_dust(
        &mut state.particles,
        feet,
        JUMP_PARTICLES,
        state.max_particles,
        &mut state.rng,
    );
    state.push_event(GameEvent::Jumped);
    true
}

fn crash(state: &mut GameState, obstacle: ObstacleTag) {
    let center = state.player.center();
    state.player.is_dead = true;
    particles::spawn_explosion(
        &mut state.particles,
        center,
        EXPLOSION_PARTICLES,
        state.max_particles,
        &mut state.rng,
    );
    state.screen_shake = CRASH_SHAKE;
    state.best_score = state.best_score.max(state.score);
    log::info!(
        "Crashed into {:?} at distance {:.0} (score {})",
        obstacle,
        state.scroll_offset,
        state.score
    );
    state.push_event(GameEvent::Crashed { obstacle, at: center });
    state.request_phase(GamePhase::GameOver);
}

fn decay_shake(state: &mut GameState) {
    state.screen_shake *= SHAKE_DECAY;
    if state.screen_shake < SHAKE_CUTOFF {
        state.screen_shake = 0.0;
    }
}

/// Spin while jumping, settle onto the nearest right angle once grounded
fn update_rotation(state: &mut GameState) {
    let player = &mut state.player;
    if player.is_grounded {
        let target = nearest_right_angle(player.rotation);
        let delta = target - player.rotation;
        if delta.abs() < ROTATION_SNAP {
            player.rotation = target.rem_euclid(360.0);
        } else {
            player.rotation += delta * ROTATION_EASE;
        }
    } else if player.is_jumping {
        player.rotation += state.tuning.rotation_speed;
    }
}

impl GameState {
    /// Transition to `target`, resetting where the state machine requires it
    ///
    /// Entering `Playing` after a crash (or with a dead player) starts a fresh
    /// run; entering `Menu` always resets.
    pub fn request_phase(&mut self, target: GamePhase) {
        let from = self.phase;
        if from == target {
            return;
        }

        match target {
            GamePhase::Playing if from == GamePhase::GameOver || self.player.is_dead => {
                self.reset()
            }
            GamePhase::Menu => self.reset(),
            _ => {}
        }

        self.phase = target;
        log::info!("Phase {:?} -> {:?}", from, target);
        self.push_event(GameEvent::PhaseChanged { from, to: target });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{Obstacle, ObstacleKind, Oscillation};

    fn playing(seed: u64) -> GameState {
        let mut state = GameState::new(seed);
        state.request_phase(GamePhase::Playing);
        state.drain_events();
        state
    }

    /// A run with a single hand-placed obstacle and nothing else in reach
    fn playing_with(obstacle: Obstacle) -> GameState {
        let mut state = playing(1);
        state.obstacles = vec![
            obstacle,
            Obstacle {
                x: 5000.0,
                y: GROUND_LEVEL - SPIKE_SIZE,
                width: SPIKE_SIZE,
                height: SPIKE_SIZE,
                kind: ObstacleKind::Spike,
            },
        ];
        state
    }

    fn step(state: &mut GameState) {
        tick(state, &TickInput::default());
    }

    #[test]
    fn test_menu_does_not_simulate() {
        let mut state = GameState::new(3);
        step(&mut state);
        assert_eq!(state.scroll_offset, 0.0);
        assert_eq!(state.frame_count, 0);
    }

    #[test]
    fn test_generating_does_not_simulate() {
        let mut state = GameState::new(3);
        state.request_phase(GamePhase::Generating);
        state.drain_events();
        let player = state.player.clone();
        for _ in 0..10 {
            tick(&mut state, &TickInput { jump: true, pause: false });
        }
        assert_eq!(state.phase, GamePhase::Generating);
        assert_eq!(state.frame_count, 0);
        assert_eq!(state.scroll_offset, 0.0);
        assert_eq!(state.player, player);
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_entering_menu_resets_run() {
        let mut state = playing_with(Obstacle {
            x: 4000.0,
            y: GROUND_LEVEL - SPIKE_SIZE,
            width: SPIKE_SIZE,
            height: SPIKE_SIZE,
            kind: ObstacleKind::Spike,
        });
        for _ in 0..30 {
            step(&mut state);
        }
        assert!(state.scroll_offset > 0.0);

        state.request_phase(GamePhase::Menu);
        let fresh = GameState::new(1);
        assert_eq!(state.phase, GamePhase::Menu);
        assert_eq!(state.scroll_offset, 0.0);
        assert_eq!(state.score, 0);
        assert_eq!(state.speed, INITIAL_SPEED);
        assert_eq!(state.obstacles, fresh.obstacles);
    }

    #[test]
    fn test_playing_while_dead_resets() {
        let mut state = playing(4);
        state.request_phase(GamePhase::Paused);
        state.scroll_offset = 500.0;
        state.player.is_dead = true;

        state.request_phase(GamePhase::Playing);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(!state.player.is_dead);
        assert_eq!(state.scroll_offset, 0.0);
    }

    #[test]
    fn test_resume_from_pause_keeps_run() {
        let mut state = playing(4);
        state.request_phase(GamePhase::Paused);
        state.scroll_offset = 500.0;
        state.request_phase(GamePhase::Playing);
        assert_eq!(state.scroll_offset, 500.0);
    }

    #[test]
    fn test_scroll_and_score() {
        let mut state = playing(3);
        state.obstacles.clear();
        state.obstacles.push(Obstacle {
            x: 100_000.0,
            y: GROUND_LEVEL - SPIKE_SIZE,
            width: SPIKE_SIZE,
            height: SPIKE_SIZE,
            kind: ObstacleKind::Spike,
        });
        for _ in 0..20 {
            step(&mut state);
        }
        assert!(state.scroll_offset > 100.0);
        assert_eq!(state.score, (state.scroll_offset / 100.0).floor() as u64);
        assert!(state.speed > INITIAL_SPEED);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_speed_caps() {
        let mut state = playing(3);
        state.speed = MAX_SPEED - 0.0005;
        state.obstacles.clear();
        step(&mut state);
        assert_eq!(state.speed, MAX_SPEED);
        step(&mut state);
        assert_eq!(state.speed, MAX_SPEED);
    }

    #[test]
    fn test_grounded_player_stays_grounded() {
        let mut state = playing(3);
        step(&mut state);
        assert!(state.player.is_grounded);
        assert_eq!(state.player.bottom(), GROUND_LEVEL);
        assert_eq!(state.player.vy, 0.0);
    }

    #[test]
    fn test_jump_requires_ground() {
        let mut state = playing(3);
        assert!(jump(&mut state));
        assert_eq!(state.player.vy, JUMP_VELOCITY);
        assert!(state.player.is_jumping);
        assert!(!state.player.is_grounded);
        assert_eq!(state.particles.len(), JUMP_PARTICLES);
        assert_eq!(state.drain_events(), vec![GameEvent::Jumped]);
        // Second press mid-air does nothing
        assert!(!jump(&mut state));
        assert_eq!(state.particles.len(), JUMP_PARTICLES);
    }

    #[test]
    fn test_jump_ignored_outside_playing() {
        let mut state = GameState::new(3);
        assert!(!jump(&mut state));
        assert!(state.player.is_grounded);
    }

    #[test]
    fn test_spike_ahead_ends_run() {
        let mut state = playing_with(Obstacle {
            x: PLAYER_SCREEN_X + 20.0,
            y: GROUND_LEVEL - SPIKE_SIZE,
            width: SPIKE_SIZE,
            height: SPIKE_SIZE,
            kind: ObstacleKind::Spike,
        });
        assert!(state.player.is_grounded);
        step(&mut state);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.player.is_dead);
        assert_eq!(state.particles.len(), EXPLOSION_PARTICLES);
        assert_eq!(state.screen_shake, CRASH_SHAKE);
        let events = state.drain_events();
        assert!(matches!(
            events[0],
            GameEvent::Crashed {
                obstacle: ObstacleTag::Spike,
                ..
            }
        ));
    }

    #[test]
    fn test_game_over_freezes_everything_but_shake() {
        let mut state = playing_with(Obstacle {
            x: PLAYER_SCREEN_X + 20.0,
            y: GROUND_LEVEL - SPIKE_SIZE,
            width: SPIKE_SIZE,
            height: SPIKE_SIZE,
            kind: ObstacleKind::Spike,
        });
        step(&mut state);
        let frozen_player = state.player.clone();
        let frozen_particles = state.particles.clone();
        let frozen_scroll = state.scroll_offset;

        step(&mut state);
        assert_eq!(state.player, frozen_player);
        assert_eq!(state.particles, frozen_particles);
        assert_eq!(state.scroll_offset, frozen_scroll);
        assert!((state.screen_shake - CRASH_SHAKE * SHAKE_DECAY).abs() < 1e-4);

        for _ in 0..60 {
            step(&mut state);
        }
        assert_eq!(state.screen_shake, 0.0);
    }

    #[test]
    fn test_land_on_block_then_rejump() {
        // Falling onto a block top from just above it
        let block_top = GROUND_LEVEL - 100.0;
        let mut state = playing_with(Obstacle {
            x: PLAYER_SCREEN_X + INITIAL_SPEED,
            y: block_top,
            width: 200.0,
            height: 100.0,
            kind: ObstacleKind::Block,
        });
        state.player.y = block_top - PLAYER_SIZE - 1.0;
        state.player.vy = 14.0;
        state.player.is_grounded = false;
        state.player.is_jumping = true;

        step(&mut state);
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.player.is_grounded);
        assert_eq!(state.player.bottom(), block_top);
        assert_eq!(state.player.vy, 0.0);
        assert!(state.drain_events().contains(&GameEvent::Landed));

        // Resting on top survives further ticks
        step(&mut state);
        assert!(state.player.is_grounded);
        assert_eq!(state.player.bottom(), block_top);

        assert!(jump(&mut state));
        assert_eq!(state.player.vy, JUMP_VELOCITY);
    }

    #[test]
    fn test_block_side_hit_crashes() {
        let mut state = playing_with(Obstacle {
            x: PLAYER_SCREEN_X + 30.0,
            y: GROUND_LEVEL - 100.0,
            width: 60.0,
            height: 100.0,
            kind: ObstacleKind::Block,
        });
        step(&mut state);
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_oscillating_obstacles_follow_sine() {
        let osc = Oscillation {
            initial_y: 100.0,
            speed: 0.05,
            range: 50.0,
        };
        let mut state = playing_with(Obstacle {
            x: 2000.0,
            y: 100.0,
            width: DRONE_WIDTH,
            height: DRONE_HEIGHT,
            kind: ObstacleKind::Drone { osc },
        });
        for _ in 0..10 {
            step(&mut state);
        }
        let expected = 100.0 + (10.0f32 * 0.05).sin() * 50.0;
        assert!((state.obstacles[0].y - expected).abs() < 1e-4);
    }

    #[test]
    fn test_rotation_spins_then_snaps() {
        let mut state = playing(3);
        state.obstacles.clear();
        assert!(jump(&mut state));
        step(&mut state);
        assert_eq!(state.player.rotation, ROTATION_SPEED);

        // Fly until landing
        while !state.player.is_grounded {
            step(&mut state);
        }
        let mut ticks = 0;
        while state.player.rotation % 90.0 != 0.0 {
            step(&mut state);
            ticks += 1;
            assert!(ticks < 30, "rotation never settled: {}", state.player.rotation);
        }
        assert_eq!(state.player.rotation % 90.0, 0.0);
    }

    #[test]
    fn test_walking_off_ledge_does_not_spin() {
        let mut state = playing(3);
        state.obstacles.clear();
        state.player.y = 200.0;
        state.player.is_grounded = false;
        for _ in 0..5 {
            step(&mut state);
            assert_eq!(state.player.rotation, 0.0);
        }
    }

    #[test]
    fn test_leading_obstacle_despawns() {
        let mut state = playing_with(Obstacle {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            kind: ObstacleKind::Block,
        });
        state.scroll_offset = 205.0;
        step(&mut state);
        assert!(state.obstacles.iter().all(|o| o.x > 0.0));
    }

    #[test]
    fn test_window_never_empty() {
        let mut state = playing(11);
        for _ in 0..2000 {
            step(&mut state);
            if state.phase != GamePhase::Playing {
                break;
            }
            let last = state.obstacles.last().expect("obstacle window ran empty");
            assert!(last.x - state.player_world_x() >= VIEW_WIDTH);
        }
    }

    #[test]
    fn test_pause_round_trip() {
        let mut state = playing(3);
        state.obstacles.clear();
        step(&mut state);
        let scroll = state.scroll_offset;
        tick(&mut state, &TickInput { pause: true, ..Default::default() });
        assert_eq!(state.phase, GamePhase::Paused);
        step(&mut state);
        assert_eq!(state.scroll_offset, scroll);
        tick(&mut state, &TickInput { pause: true, ..Default::default() });
        assert_eq!(state.phase, GamePhase::Playing);
        assert!(state.scroll_offset > scroll);
    }

    #[test]
    fn test_replay_after_game_over_resets() {
        let mut state = playing_with(Obstacle {
            x: PLAYER_SCREEN_X + 20.0,
            y: GROUND_LEVEL - SPIKE_SIZE,
            width: SPIKE_SIZE,
            height: SPIKE_SIZE,
            kind: ObstacleKind::Spike,
        });
        step(&mut state);
        assert_eq!(state.phase, GamePhase::GameOver);

        state.request_phase(GamePhase::Playing);
        assert!(!state.player.is_dead);
        assert!(state.particles.is_empty());
        assert_eq!(state.scroll_offset, 0.0);
        assert!(state.obstacles.len() >= SEED_OBSTACLES);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut once = playing(21);
        for _ in 0..50 {
            step(&mut once);
        }
        let mut twice = once.clone();
        once.reset();
        twice.reset();
        twice.reset();
        assert_eq!(once.player, twice.player);
        assert_eq!(once.obstacles, twice.obstacles);
        assert_eq!(once.particles, twice.particles);
        assert_eq!(once.scroll_offset, twice.scroll_offset);
        assert_eq!(once.speed, twice.speed);
        assert_eq!(once.score, twice.score);
        assert_eq!(once.screen_shake, twice.screen_shake);
    }
}
