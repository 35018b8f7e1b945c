//! Tool identification and pressure normalization.

use std::fmt;

use crate::sensor::{RawSample, SensorSpace};

/// Tool code for the pen tip (`BTN_TOOL_PEN`).
pub const TOOL_PEN: i32 = 0x140;
/// Tool code for a finger on the multitouch panel (`BTN_TOOL_FINGER`).
pub const TOOL_FINGER: i32 = 0x145;
/// Pen tip with the side button held.
pub const ERASER_STYLUS: i32 = -10;
/// Rubber end of the stylus.
pub const ERASER_RUBBER: i32 = -11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Pen,
    StylusEraser,
    RubberEraser,
    Unknown,
}

impl Tool {
    pub fn from_code(code: i32) -> Tool {
        match code {
            TOOL_PEN | TOOL_FINGER => Tool::Pen,
            ERASER_STYLUS => Tool::StylusEraser,
            ERASER_RUBBER => Tool::RubberEraser,
            _ => Tool::Unknown,
        }
    }

    pub fn is_eraser(self) -> bool {
        matches!(self, Tool::StylusEraser | Tool::RubberEraser)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Pen => write!(f, "pen"),
            Tool::StylusEraser => write!(f, "stylus-eraser"),
            Tool::RubberEraser => write!(f, "rubber-eraser"),
            Tool::Unknown => write!(f, "unknown"),
        }
    }
}

/// Reported pressure maxima per sensor. `None` means the sensor has no
/// pressure channel and behaves as a binary touch device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureConfig {
    pub multitouch_max: Option<u32>,
    pub stylus_max: Option<u32>,
    /// Pressure assumed when a sample carries none.
    pub nominal: f32,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            multitouch_max: None,
            stylus_max: Some(4095),
            nominal: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub tool: Tool,
    /// Normalized into `[0, 1]`.
    pub pressure: f32,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    pressure_max: [Option<u32>; 2],
    nominal: f32,
}

impl Classifier {
    pub fn new(config: &PressureConfig) -> Self {
        let mut pressure_max = [None; 2];
        pressure_max[SensorSpace::Multitouch.index()] = config.multitouch_max.filter(|&m| m > 0);
        pressure_max[SensorSpace::Stylus.index()] = config.stylus_max.filter(|&m| m > 0);
        Self {
            pressure_max,
            nominal: config.nominal.clamp(0.0, 1.0),
        }
    }

    pub fn classify(&self, sample: &RawSample) -> Classification {
        let pressure = match (sample.pressure, self.pressure_max[sample.space.index()]) {
            (Some(raw), Some(max)) => (raw as f32 / max as f32).clamp(0.0, 1.0),
            _ => self.nominal,
        };

        Classification {
            tool: Tool::from_code(sample.tool_id),
            pressure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stylus(tool: i32, pressure: Option<u32>) -> RawSample {
        let s = RawSample::new(SensorSpace::Stylus, 10, 10, tool, 0, 0);
        match pressure {
            Some(p) => s.with_pressure(p),
            None => s,
        }
    }

    #[test]
    fn test_tool_codes() {
        assert_eq!(Tool::from_code(TOOL_PEN), Tool::Pen);
        assert_eq!(Tool::from_code(TOOL_FINGER), Tool::Pen);
        assert_eq!(Tool::from_code(ERASER_STYLUS), Tool::StylusEraser);
        assert_eq!(Tool::from_code(ERASER_RUBBER), Tool::RubberEraser);
        assert_eq!(Tool::from_code(7), Tool::Unknown);
        assert!(Tool::RubberEraser.is_eraser());
        assert!(!Tool::Pen.is_eraser());
    }

    #[test]
    fn test_pressure_is_normalized_by_sensor_max() {
        let classifier = Classifier::new(&PressureConfig::default());
        let c = classifier.classify(&stylus(TOOL_PEN, Some(4095)));
        assert_eq!(c.pressure, 1.0);
        let c = classifier.classify(&stylus(TOOL_PEN, Some(0)));
        assert_eq!(c.pressure, 0.0);
        let c = classifier.classify(&stylus(ERASER_RUBBER, Some(9000)));
        assert_eq!(c.pressure, 1.0);
        assert_eq!(c.tool, Tool::RubberEraser);
    }

    #[test]
    fn test_missing_pressure_channel_uses_nominal() {
        let classifier = Classifier::new(&PressureConfig {
            nominal: 0.75,
            ..PressureConfig::default()
        });
        let touch = RawSample::new(SensorSpace::Multitouch, 1, 1, TOOL_FINGER, 3, 0).with_pressure(12);
        assert_eq!(classifier.classify(&touch).pressure, 0.75);
        assert_eq!(classifier.classify(&stylus(TOOL_PEN, None)).pressure, 0.75);
    }
}
