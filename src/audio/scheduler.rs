//! Lookahead scheduling
//!
//! A coarse wall-clock timer (every
//! [`SCHEDULER_INTERVAL_MS`](crate::consts::SCHEDULER_INTERVAL_MS)) wakes the
//! scheduler, which queues every step falling inside the next
//! [`LOOKAHEAD_SECS`] of the audio clock with a sample-accurate start time.
//! Timer jitter therefore never reaches playback timing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::sequencer::Sequencer;
use crate::consts::LOOKAHEAD_SECS;

/// Cooperative cancellation flag shared between a task and whoever drives it
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What a polled task wants from its driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Poll again after the next interval
    Pending,
    /// Stop polling
    Cancelled,
}

/// Transport for the step sequencer
#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    sequencer: Sequencer,
    lookahead: f64,
    token: Option<CancelToken>,
    /// Step 0 not yet pinned to the audio clock
    awaiting_downbeat: bool,
}

impl Default for LookaheadScheduler {
    fn default() -> Self {
        Self::new(Sequencer::default(), LOOKAHEAD_SECS)
    }
}

impl LookaheadScheduler {
    pub fn new(sequencer: Sequencer, lookahead: f64) -> Self {
        Self {
            sequencer,
            lookahead,
            token: None,
            awaiting_downbeat: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Begin at step 0 with the first step due at `now`
    ///
    /// If the clock has moved on by the first poll, step 0 moves to that poll
    /// so the bar always opens on its downbeat. Idempotent: while running, returns the live token and leaves the cursor alone.
    pub fn start(&mut self, now: f64) -> CancelToken {
        if let Some(token) = self.token.as_ref().filter(|t| !t.is_cancelled()) {
            return token.clone();
        }
        self.sequencer.reset(now);
        self.awaiting_downbeat = true;
        let token = CancelToken::new();
        self.token = Some(token.clone());
        token
    }

    pub fn stop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.awaiting_downbeat = false;
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Queue every step due before `now + lookahead` through `schedule(step, time)`
    pub fn poll(&mut self, now: f64, mut schedule: impl FnMut(u8, f64)) -> TaskStatus {
        if !self.is_running() {
            self.token = None;
            return TaskStatus::Cancelled;
        }
        if std::mem::take(&mut self.awaiting_downbeat) && self.sequencer.next_step_time() < now {
            self.sequencer.reset(now);
        }

        // Steps that slipped into the past (e.g. a throttled background tab) are skipped
        let mut skipped = 0;
        while self.sequencer.next_step_time() < now {
            self.sequencer.advance();
            skipped += 1;
        }
        if skipped > 0 {
            log::debug!("Scheduler fell behind, skipped {skipped} steps");
        }

        while self.sequencer.next_step_time() < now + self.lookahead {
            schedule(self.sequencer.step(), self.sequencer.next_step_time());
            self.sequencer.advance();
        }
        TaskStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SCHEDULER_INTERVAL_MS;

    fn collect(scheduler: &mut LookaheadScheduler, now: f64) -> (TaskStatus, Vec<(u8, f64)>) {
        let mut steps = Vec::new();
        let status = scheduler.poll(now, |step, at| steps.push((step, at)));
        (status, steps)
    }

    #[test]
    fn test_poll_fills_lookahead_window() {
        let mut scheduler = LookaheadScheduler::default();
        scheduler.start(0.0);
        let (status, steps) = collect(&mut scheduler, 0.0);
        assert_eq!(status, TaskStatus::Pending);
        // 0.1 s window holds one 0.111 s step
        assert_eq!(steps, vec![(0, 0.0)]);

        let (_, steps) = collect(&mut scheduler, 0.025);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].0, 1);
    }

    #[test]
    fn test_polling_every_interval_schedules_each_step_once() {
        let mut scheduler = LookaheadScheduler::default();
        scheduler.start(0.0);
        let mut all = Vec::new();
        let interval = SCHEDULER_INTERVAL_MS as f64 / 1000.0;
        for i in 0..200 {
            scheduler.poll(i as f64 * interval, |step, at| all.push((step, at)));
        }
        // 200 polls * 25 ms = 5 s, plus the lookahead
        let expected = ((5.0 - interval + LOOKAHEAD_SECS) / (60.0 / 135.0 / 4.0)).ceil() as usize;
        assert_eq!(all.len(), expected);
        for pair in all.windows(2) {
            assert_eq!(pair[1].0, (pair[0].0 + 1) % 16);
            assert!(pair[1].1 > pair[0].1);
        }
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut scheduler = LookaheadScheduler::default();
        let first = scheduler.start(0.0);
        collect(&mut scheduler, 0.3);
        let step = scheduler.sequencer().step();
        let second = scheduler.start(0.3);
        assert_eq!(scheduler.sequencer().step(), step);
        second.cancel();
        assert!(first.is_cancelled());
    }

    #[test]
    fn test_cancelled_token_stops_task() {
        let mut scheduler = LookaheadScheduler::default();
        let token = scheduler.start(0.0);
        token.cancel();
        let (status, steps) = collect(&mut scheduler, 0.0);
        assert_eq!(status, TaskStatus::Cancelled);
        assert!(steps.is_empty());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_restart_rewinds_to_step_zero() {
        let mut scheduler = LookaheadScheduler::default();
        scheduler.start(0.0);
        collect(&mut scheduler, 0.5);
        scheduler.stop();
        scheduler.start(2.0);
        let (_, steps) = collect(&mut scheduler, 2.0);
        assert_eq!(steps[0], (0, 2.0));
    }

    #[test]
    fn test_skips_steps_in_the_past() {
        let mut scheduler = LookaheadScheduler::default();
        scheduler.start(0.0);
        collect(&mut scheduler, 0.0);
        let (_, steps) = collect(&mut scheduler, 10.05);
        assert!(steps.iter().all(|&(_, at)| at >= 10.05));
        assert_eq!(steps.len(), 1);
        assert_ne!(steps[0].0, 0);
    }

    #[test]
    fn test_late_first_poll_keeps_downbeat() {
        let mut scheduler = LookaheadScheduler::default();
        scheduler.start(0.0);
        let late = 1.0 / 60.0;
        let (_, steps) = collect(&mut scheduler, late);
        assert_eq!(steps, vec![(0, late)]);

        // Only the first poll re-anchors
        let (_, steps) = collect(&mut scheduler, late + 0.2);
        assert!(steps.iter().all(|&(step, _)| step != 0 && step != 1));
    }
}
