//! Stylus digitizer frames to stylus samples.

use evdevil::event::InputEvent;

use crate::classify::{ERASER_RUBBER, ERASER_STYLUS, TOOL_PEN};
use crate::orientation::Orientation;
use crate::sensor::{Extent, RawSample, SensorSpace, Ticks};

use super::event::{
    raw_parts, ABS_PRESSURE, ABS_X, ABS_Y, BTN_STYLUS, BTN_TOOL_PEN, BTN_TOOL_RUBBER, EV_ABS, EV_KEY, EV_SYN,
    SYN_REPORT,
};

/// The stylus reports a single contact.
const PEN_CONTACT: i32 = 0;

/// Accumulates one SYN_REPORT frame of stylus events.
#[derive(Debug)]
pub struct PenDecoder {
    orientation: Orientation,
    max: Extent,
    x: u32,
    y: u32,
    pressure: u32,
    pen_in_range: bool,
    rubber_in_range: bool,
    side_button: bool,
    was_in_range: bool,
    last_tool: i32,
}

impl PenDecoder {
    /// `max` is the raw maximum of the pen axes, before rotation.
    pub fn new(orientation: Orientation, max: Extent) -> Self {
        Self {
            orientation,
            max,
            x: 0,
            y: 0,
            pressure: 0,
            pen_in_range: false,
            rubber_in_range: false,
            side_button: false,
            was_in_range: false,
            last_tool: TOOL_PEN,
        }
    }

    fn in_range(&self) -> bool {
        self.pen_in_range || self.rubber_in_range
    }

    fn tool_code(&self) -> i32 {
        if self.rubber_in_range {
            ERASER_RUBBER
        } else if self.side_button {
            ERASER_STYLUS
        } else {
            TOOL_PEN
        }
    }

    /// Feed one event. Returns a sample when `ev` completes a frame in
    /// which the tool was in range or just left it.
    pub fn push(&mut self, ev: &InputEvent, at: Ticks) -> Option<RawSample> {
        let (ty, code, value) = raw_parts(ev);
        match (ty, code) {
            (EV_ABS, ABS_X) => self.x = value.max(0) as u32,
            (EV_ABS, ABS_Y) => self.y = value.max(0) as u32,
            (EV_ABS, ABS_PRESSURE) => self.pressure = value.max(0) as u32,
            (EV_KEY, BTN_TOOL_PEN) => self.pen_in_range = value != 0,
            (EV_KEY, BTN_TOOL_RUBBER) => self.rubber_in_range = value != 0,
            (EV_KEY, BTN_STYLUS) => self.side_button = value != 0,
            (EV_SYN, SYN_REPORT) => return self.finish_frame(at),
            _ => {}
        }
        None
    }

    fn finish_frame(&mut self, at: Ticks) -> Option<RawSample> {
        let in_range = self.in_range();
        let left_range = self.was_in_range && !in_range;
        self.was_in_range = in_range;

        if !in_range && !left_range {
            return None;
        }

        let (x, y) = self.orientation.rotate_pen(self.x, self.y, self.max);
        if in_range {
            self.last_tool = self.tool_code();
            let sample = RawSample::new(SensorSpace::Stylus, x, y, self.last_tool, PEN_CONTACT, at)
                .with_pressure(self.pressure);
            return Some(sample);
        }

        self.pressure = 0;
        Some(RawSample::new(SensorSpace::Stylus, x, y, self.last_tool, PEN_CONTACT, at).lifted())
    }
}
