//! Waveform selection for stroke lifecycle events.
//!
//! In-flight pen ink gets fast monochrome updates over the newest segment;
//! every finished stroke gets one full-fidelity pass over its bounds.
//! Erasers always use the fidelity family.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::classify::Tool;
use crate::geometry::Region;
use crate::palette::InkStyle;
use crate::sensor::{Extent, Ticks};
use crate::tracker::StrokeEvent;
use crate::waveform::{RefreshRequest, WaveformMode};

const LEDGER_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyConfig {
    /// Identical-mode requests inside an already issued region are
    /// dropped for this long.
    pub suppression_window_ms: u64,
    /// Regions larger than this (in pixels) are left to the controller.
    pub auto_area_threshold: u64,
    /// Pen deltas up to this area always take the fastest mode.
    pub small_delta_area: u64,
    /// Pen speed (pixels/ms) from which the fastest mode is used
    /// regardless of delta size.
    pub fast_velocity: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            suppression_window_ms: 50,
            auto_area_threshold: 1 << 20,
            small_delta_area: 64 * 64,
            fast_velocity: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Issued {
    region: Region,
    mode: WaveformMode,
    at: Ticks,
    sequence: u64,
}

struct Ledger {
    recent: VecDeque<Issued>,
    next_sequence: u64,
}

impl Ledger {
    fn prune(&mut self, now: Ticks, window: u64) {
        self.recent.retain(|e| now.saturating_sub(e.at) <= window);
    }

    fn covers(&self, region: &Region, mode: WaveformMode) -> bool {
        self.recent.iter().any(|e| e.mode == mode && e.region.contains(region))
    }

    fn issue(&mut self, region: Region, mode: WaveformMode, dither: bool, at: Ticks) -> RefreshRequest {
        if self.recent.len() >= LEDGER_CAPACITY {
            self.recent.pop_front();
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.recent.push_back(Issued {
            region,
            mode,
            at,
            sequence,
        });

        RefreshRequest {
            region,
            mode,
            dither,
            sequence,
        }
    }
}

pub struct WaveformPolicy {
    config: PolicyConfig,
    display: Extent,
    ink: InkStyle,
    ledger: Mutex<Ledger>,
}

impl WaveformPolicy {
    pub fn new(config: PolicyConfig, display: Extent, ink: InkStyle) -> Self {
        Self {
            config,
            display,
            ink,
            ledger: Mutex::new(Ledger {
                recent: VecDeque::with_capacity(LEDGER_CAPACITY),
                next_sequence: 1,
            }),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pick the refresh for one lifecycle event. Returns `None` when the
    /// event needs no refresh or an identical one was just issued.
    ///
    /// End events are never suppressed: each finished stroke gets its
    /// corrective pass.
    pub fn decide(&self, event: &StrokeEvent) -> Option<RefreshRequest> {
        let (region, mode) = self.select(event)?;
        let dither = mode.renders_grayscale() && self.ink.uses_gray(event.tool());
        let at = event.at();

        let mut ledger = self.ledger();
        ledger.prune(at, self.config.suppression_window_ms);
        if !event.is_end() && ledger.covers(&region, mode) {
            log::debug!(
                "Suppressed repeated {} over {} (stroke {})",
                mode,
                region,
                event.stroke_id()
            );
            return None;
        }
        Some(ledger.issue(region, mode, dither, at))
    }

    fn select(&self, event: &StrokeEvent) -> Option<(Region, WaveformMode)> {
        let region = event.region();
        if region.is_empty() {
            return None;
        }

        let tool = event.tool();
        let mode = if tool.is_eraser() {
            if event.is_end() {
                WaveformMode::Gc16
            } else {
                WaveformMode::Gc4
            }
        } else if tool == Tool::Unknown && !event.is_end() {
            return None;
        } else if region.area() > self.config.auto_area_threshold {
            WaveformMode::Auto
        } else {
            match event {
                StrokeEvent::Begin { .. } => self.fast_mode(&region, 0.0),
                StrokeEvent::Move { velocity, .. } => self.fast_mode(&region, *velocity),
                StrokeEvent::End { .. } => WaveformMode::Gc16,
            }
        };
        Some((region, mode))
    }

    fn fast_mode(&self, region: &Region, velocity: f32) -> WaveformMode {
        if region.area() <= self.config.small_delta_area || velocity >= self.config.fast_velocity {
            WaveformMode::A2
        } else {
            WaveformMode::Du
        }
    }

    /// Full-canvas clear, for page changes. Never derived from strokes.
    pub fn clear(&self, at: Ticks) -> RefreshRequest {
        self.ledger().issue(Region::full(self.display), WaveformMode::Init, false, at)
    }

    /// Repaint an externally redrawn area, e.g. after loading a page.
    /// The area is clipped to the display; `None` when nothing is left.
    pub fn repaint(&self, region: Region, at: Ticks) -> Option<RefreshRequest> {
        let region = region.intersection(&Region::full(self.display));
        if region.is_empty() {
            return None;
        }
        let mode = if region.area() > self.config.auto_area_threshold {
            WaveformMode::Auto
        } else {
            WaveformMode::Gc16
        };
        let dither = mode.renders_grayscale() && self.ink.uses_gray(Tool::Pen);
        Some(self.ledger().issue(region, mode, dither, at))
    }

    /// Drop ledger entries of requests that never reached the panel, so
    /// they no longer suppress later identical requests.
    pub fn forget(&self, requests: &[RefreshRequest]) {
        if requests.is_empty() {
            return;
        }
        let mut ledger = self.ledger();
        ledger
            .recent
            .retain(|e| !requests.iter().any(|r| r.sequence == e.sequence));
    }
}
