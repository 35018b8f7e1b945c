//! E-ink waveform modes, refresh requests and their panel wire form.

use serde::Deserialize;
use std::fmt;

use crate::geometry::Region;

/// Temperature selector used by the stock reMarkable drawing path.
pub const TEMP_USE_REMARKABLE_DRAW: u32 = 0x0018;
/// Let the controller read the ambient panel temperature.
pub const TEMP_USE_AMBIENT: u32 = 0x1000;
pub const EPDC_FLAG_EXP1: u32 = 0x0270_ce20;
pub const EPDC_FLAG_USE_DITHERING_ALPHA: u32 = 0x3ff0_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformMode {
    /// Clears the panel to white.
    Init,
    /// Grey to white/black only.
    Du,
    /// High fidelity, flashing.
    Gc16,
    /// Lower fidelity grayscale.
    Gc4,
    /// Fast black/white animation.
    A2,
    Du4,
    /// Controller picks the waveform.
    Auto,
}

/// Groups of modes that can share one panel update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModeFamily {
    Clear,
    Fast,
    Fidelity,
    Auto,
}

impl WaveformMode {
    pub const fn code(self) -> u32 {
        match self {
            WaveformMode::Init => 0x0,
            WaveformMode::Du => 0x1,
            WaveformMode::Gc16 => 0x2,
            WaveformMode::Gc4 => 0x3,
            WaveformMode::A2 => 0x4,
            WaveformMode::Du4 => 0x7,
            WaveformMode::Auto => 257,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x0 => Some(WaveformMode::Init),
            0x1 => Some(WaveformMode::Du),
            0x2 => Some(WaveformMode::Gc16),
            0x3 => Some(WaveformMode::Gc4),
            0x4 => Some(WaveformMode::A2),
            0x7 => Some(WaveformMode::Du4),
            257 => Some(WaveformMode::Auto),
            _ => None,
        }
    }

    pub const fn family(self) -> ModeFamily {
        match self {
            WaveformMode::Init => ModeFamily::Clear,
            WaveformMode::A2 | WaveformMode::Du | WaveformMode::Du4 => ModeFamily::Fast,
            WaveformMode::Gc16 | WaveformMode::Gc4 => ModeFamily::Fidelity,
            WaveformMode::Auto => ModeFamily::Auto,
        }
    }

    /// Relative visual fidelity; higher wins when requests merge.
    pub const fn fidelity(self) -> u8 {
        match self {
            WaveformMode::A2 => 0,
            WaveformMode::Du => 1,
            WaveformMode::Du4 => 2,
            WaveformMode::Gc4 => 3,
            WaveformMode::Gc16 => 4,
            WaveformMode::Auto => 5,
            WaveformMode::Init => 6,
        }
    }

    /// Modes that render intermediate grey levels.
    pub fn renders_grayscale(self) -> bool {
        self.family() == ModeFamily::Fidelity
    }

    /// Two requests may be merged into one update.
    pub fn compatible(self, other: WaveformMode) -> bool {
        self.family() == other.family() && self.family() != ModeFamily::Clear
    }

    pub fn max_fidelity(self, other: WaveformMode) -> WaveformMode {
        if other.fidelity() > self.fidelity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for WaveformMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaveformMode::Init => "INIT",
            WaveformMode::Du => "DU",
            WaveformMode::Gc16 => "GC16",
            WaveformMode::Gc4 => "GC4",
            WaveformMode::A2 => "A2",
            WaveformMode::Du4 => "DU4",
            WaveformMode::Auto => "AUTO",
        };
        f.write_str(name)
    }
}

/// A refresh decision waiting to be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    pub region: Region,
    pub mode: WaveformMode,
    pub dither: bool,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Partial = 0,
    Full = 1,
}

/// The form handed to a display sink: numeric codes the panel
/// controller understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelUpdate {
    pub region: Region,
    pub waveform: u32,
    pub update_mode: UpdateMode,
    pub temp: u32,
    pub flags: u32,
    pub marker: u64,
}

impl From<&RefreshRequest> for PanelUpdate {
    fn from(req: &RefreshRequest) -> Self {
        let fast = req.mode.family() == ModeFamily::Fast;

        let mut flags = 0;
        if req.dither {
            flags |= EPDC_FLAG_USE_DITHERING_ALPHA;
        }
        if fast {
            flags |= EPDC_FLAG_EXP1;
        }

        Self {
            region: req.region,
            waveform: req.mode.code(),
            update_mode: if req.mode == WaveformMode::Init {
                UpdateMode::Full
            } else {
                UpdateMode::Partial
            },
            temp: if fast { TEMP_USE_REMARKABLE_DRAW } else { TEMP_USE_AMBIENT },
            flags,
            marker: req.sequence,
        }
    }
}
