//! Raw digitizer samples and the sensor spaces they are reported in.

use std::fmt;
use std::time::Instant;

/// Monotonic timestamp in milliseconds.
pub type Ticks = u64;

/// The two digitizers feeding the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSpace {
    /// Capacitive multitouch panel.
    Multitouch,
    /// Wacom-class stylus digitizer.
    Stylus,
}

impl SensorSpace {
    pub const ALL: [SensorSpace; 2] = [SensorSpace::Multitouch, SensorSpace::Stylus];

    /// Position of this space in per-space lookup tables.
    pub const fn index(self) -> usize {
        match self {
            SensorSpace::Multitouch => 0,
            SensorSpace::Stylus => 1,
        }
    }
}

impl fmt::Display for SensorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorSpace::Multitouch => write!(f, "touch"),
            SensorSpace::Stylus => write!(f, "pen"),
        }
    }
}

/// Width and height of a coordinate space.
///
/// For digitizers this is the maximum reported coordinate on each axis;
/// for the display it is the pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One decoded digitizer report, in the sensor's native coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    pub space: SensorSpace,
    pub x: u32,
    pub y: u32,
    /// Absent on sensors without a pressure channel.
    pub pressure: Option<u32>,
    pub tool_id: i32,
    pub contact_id: i32,
    pub timestamp: Ticks,
    /// The device reported the end of physical contact.
    pub lift_off: bool,
}

impl RawSample {
    pub fn new(space: SensorSpace, x: u32, y: u32, tool_id: i32, contact_id: i32, timestamp: Ticks) -> Self {
        Self {
            space,
            x,
            y,
            pressure: None,
            tool_id,
            contact_id,
            timestamp,
            lift_off: false,
        }
    }

    pub fn with_pressure(mut self, pressure: u32) -> Self {
        self.pressure = Some(pressure);
        self
    }

    pub fn lifted(mut self) -> Self {
        self.lift_off = true;
        self
    }
}

/// Process-local monotonic clock producing sample timestamps.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self { origin: Instant::now() }
    }

    pub fn now(&self) -> Ticks {
        self.origin.elapsed().as_millis() as Ticks
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}
