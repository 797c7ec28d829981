//! Renderer boundary
//!
//! The renderer gets a borrowed [`FrameView`] once per frame after the
//! simulation has stepped. Nothing here can mutate game state.

use crate::settings::Settings;
use crate::sim::{GamePhase, GameState, Obstacle, Particle, Player};

/// Read-only snapshot of everything drawable
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub phase: GamePhase,
    pub player: &'a Player,
    pub obstacles: &'a [Obstacle],
    pub particles: &'a [Particle],
    pub scroll_offset: f32,
    pub screen_shake: f32,
    pub intensity: f32,
    pub score: u64,
    pub best_score: u64,
}

impl<'a> FrameView<'a> {
    pub fn new(state: &'a GameState) -> Self {
        Self {
            phase: state.phase,
            player: &state.player,
            obstacles: &state.obstacles,
            particles: &state.particles,
            scroll_offset: state.scroll_offset,
            screen_shake: state.screen_shake,
            intensity: state.intensity,
            score: state.score,
            best_score: state.best_score,
        }
    }

    /// Obstacles paired with their screen-relative x
    pub fn obstacles_on_screen(&self) -> impl Iterator<Item = (f32, &'a Obstacle)> + 'a {
        let scroll = self.scroll_offset;
        self.obstacles.iter().map(move |o| (o.x - scroll, o))
    }

    /// Shake magnitude after player preferences
    pub fn effective_shake(&self, settings: &Settings) -> f32 {
        if settings.effective_screen_shake() {
            self.screen_shake
        } else {
            0.0
        }
    }
}

/// Presentation layers an asset provider may replace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapSlot {
    Background,
    Enemy,
    Obstacle,
}

impl BitmapSlot {
    pub const ALL: [BitmapSlot; 3] = [BitmapSlot::Background, BitmapSlot::Enemy, BitmapSlot::Obstacle];

    fn index(self) -> usize {
        match self {
            BitmapSlot::Background => 0,
            BitmapSlot::Enemy => 1,
            BitmapSlot::Obstacle => 2,
        }
    }
}

/// Optional bitmaps replacing procedural drawing
///
/// Offers arrive whenever the provider finishes and are staged; they become
/// visible at the next [`begin_frame`](Self::begin_frame), never mid-frame.
/// An empty slot means "draw procedurally".
#[derive(Debug, Clone)]
pub struct BitmapOverrides<T> {
    active: [Option<T>; 3],
    /// `Some(None)` stages a removal
    staged: [Option<Option<T>>; 3],
}

impl<T> Default for BitmapOverrides<T> {
    fn default() -> Self {
        Self {
            active: [None, None, None],
            staged: [None, None, None],
        }
    }
}

impl<T> BitmapOverrides<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a bitmap for `slot`
    pub fn offer(&mut self, slot: BitmapSlot, bitmap: T) {
        self.staged[slot.index()] = Some(Some(bitmap));
    }

    /// Stage a return to procedural drawing for `slot`
    pub fn withdraw(&mut self, slot: BitmapSlot) {
        self.staged[slot.index()] = Some(None);
    }

    /// Promote staged changes; returns whether anything changed
    pub fn begin_frame(&mut self) -> bool {
        let mut changed = false;
        for (active, staged) in self.active.iter_mut().zip(self.staged.iter_mut()) {
            if let Some(next) = staged.take() {
                *active = next;
                changed = true;
            }
        }
        if changed {
            log::debug!("Bitmap overrides updated");
        }
        changed
    }

    /// Bitmap to draw for `slot` this frame, if any
    pub fn get(&self, slot: BitmapSlot) -> Option<&T> {
        self.active[slot.index()].as_ref()
    }
}
