//! Super-key single/double tap detection.
//!
//! A press arms a deferred single-tap action. A second press inside the
//! double-tap window cancels it and fires the double-tap action instead.
//! Callers schedule [`TapDetector::fire_single`] for the returned deadline;
//! the generation counter makes stale timers harmless.

use std::time::{Duration, Instant};

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(400);
pub const SINGLE_TAP_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Single tap pending; fire it after `delay` if nothing else happens.
    Pending { generation: u64, delay: Duration },
    DoubleTap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TapState {
    Idle,
    Armed {
        pressed_at: Instant,
        single_pending: bool,
    },
}

#[derive(Debug, Clone)]
pub struct TapDetector {
    state: TapState,
    generation: u64,
}

impl Default for TapDetector {
    fn default() -> Self {
        Self {
            state: TapState::Idle,
            generation: 0,
        }
    }
}

impl TapDetector {
    pub fn press(&mut self, now: Instant) -> TapOutcome {
        if let TapState::Armed { pressed_at, .. } = self.state {
            if now.saturating_duration_since(pressed_at) <= DOUBLE_TAP_WINDOW {
                self.generation += 1;
                self.state = TapState::Idle;
                return TapOutcome::DoubleTap;
            }
        }

        self.generation += 1;
        self.state = TapState::Armed {
            pressed_at: now,
            single_pending: true,
        };
        TapOutcome::Pending {
            generation: self.generation,
            delay: SINGLE_TAP_DELAY,
        }
    }

    /// Deadline reached for `generation`. Returns true when the single-tap
    /// action should run.
    pub fn fire_single(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        match self.state {
            TapState::Armed {
                pressed_at,
                single_pending: true,
            } => {
                self.state = TapState::Armed {
                    pressed_at,
                    single_pending: false,
                };
                true
            }
            _ => false,
        }
    }

    /// Any other key resets detection.
    pub fn cancel(&mut self) {
        if self.state != TapState::Idle {
            self.generation += 1;
            self.state = TapState::Idle;
        }
    }
}
