//! Scaling from digitizer coordinates into display pixels.

use crate::error::Error;
use crate::geometry::DisplayPoint;
use crate::sensor::{Extent, RawSample, SensorSpace};

/// Native extents of both digitizers, already rotated into panel orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorExtents {
    pub multitouch: Extent,
    pub stylus: Extent,
}

impl SensorExtents {
    pub fn get(&self, space: SensorSpace) -> Extent {
        match space {
            SensorSpace::Multitouch => self.multitouch,
            SensorSpace::Stylus => self.stylus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisScale {
    x: f32,
    y: f32,
}

/// Maps raw samples into display space.
///
/// Scale factors are computed once per sensor space and looked up by
/// [`SensorSpace::index`], so the hot path never branches on the sensor.
#[derive(Debug, Clone)]
pub struct CoordinateMapper {
    display: Extent,
    max_x: f32,
    max_y: f32,
    scales: [AxisScale; 2],
}

impl CoordinateMapper {
    pub fn new(display: Extent, sensors: &SensorExtents) -> Result<Self, Error> {
        if display.is_degenerate() {
            return Err(Error::config(format!("display extent {} has a zero dimension", display)));
        }

        let mut scales = [AxisScale { x: 0.0, y: 0.0 }; 2];
        for space in SensorSpace::ALL {
            let native = sensors.get(space);
            if native.is_degenerate() {
                return Err(Error::config(format!(
                    "{} extent {} has a zero dimension",
                    space, native
                )));
            }
            scales[space.index()] = AxisScale {
                x: display.width as f32 / native.width as f32,
                y: display.height as f32 / native.height as f32,
            };
            log::debug!(
                "{} space {} -> display {} (x{:.5}, y{:.5})",
                space,
                native,
                display,
                scales[space.index()].x,
                scales[space.index()].y
            );
        }

        Ok(Self {
            display,
            max_x: (display.width - 1) as f32,
            max_y: (display.height - 1) as f32,
            scales,
        })
    }

    pub fn display(&self) -> Extent {
        self.display
    }

    /// Scale a sample into display space. Samples past the native extent
    /// (edge jitter) are clamped onto the last pixel row/column.
    pub fn map(&self, sample: &RawSample) -> DisplayPoint {
        let scale = self.scales[sample.space.index()];
        DisplayPoint::new(
            (sample.x as f32 * scale.x).clamp(0.0, self.max_x),
            (sample.y as f32 * scale.y).clamp(0.0, self.max_y),
        )
    }
}
