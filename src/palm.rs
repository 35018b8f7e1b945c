//! Time-based palm rejection: pen down / last pen report time.
//! Touch is ignored while the pen is down or was near the surface recently.

use std::sync::{Mutex, PoisonError};

use crate::sensor::Ticks;

#[derive(Debug, Default)]
pub struct PalmState {
    /// True while a stylus stroke is active.
    pub pen_down: bool,
    /// Last stylus report without contact (hovering or lifted).
    pub last_pen_up: Option<Ticks>,
}

/// Shared between the stylus and multitouch producers.
#[derive(Debug)]
pub struct PalmGuard {
    grace_ms: u64,
    state: Mutex<PalmState>,
}

impl PalmGuard {
    pub fn new(grace_ms: u64) -> Self {
        Self {
            grace_ms,
            state: Mutex::new(PalmState::default()),
        }
    }

    pub fn update(&self, pen_down: bool, at: Ticks) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.pen_down = pen_down;
        if !pen_down {
            state.last_pen_up = Some(at);
        }
    }

    /// The pen stroke ended without a stylus report, e.g. on timeout.
    /// Starts the grace period if the pen was down.
    pub fn release(&self, at: Ticks) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.pen_down {
            state.pen_down = false;
            state.last_pen_up = Some(at);
        }
    }

    pub fn suppresses(&self, at: Ticks) -> bool {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.pen_down {
            return true;
        }
        state
            .last_pen_up
            .map(|t| at.saturating_sub(t) < self.grace_ms)
            .unwrap_or(false)
    }
}
