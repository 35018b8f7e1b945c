mod rm1;
mod rm2;
mod rmpp;

use std::io::Read;

pub use rm1::RM1;
pub use rm2::RM2;
pub use rmpp::RMPP;

use crate::mapper::SensorExtents;
use crate::orientation::Orientation;
use crate::sensor::Extent;

const MODEL_PATH: &str = "/proc/device-tree/model";

/// Device-specific parameters for input handling and the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub name: &'static str,
    /// Short name accepted by `--model`.
    pub key: &'static str,
    /// Substring of the device-tree model identifying this device.
    pub model_marker: &'static str,

    // Raw input_event size on the device (bytes)
    pub input_event_size: usize,

    // Pen digitizer ranges, native landscape
    pub pen_x_max: u32,
    pub pen_y_max: u32,
    pub pen_pressure_max: u32,

    // Touch digitizer ranges, native portrait
    pub touch_x_max: u32,
    pub touch_y_max: u32,

    // Panel in portrait, pixels
    pub display_width: u32,
    pub display_height: u32,

    // Default device paths
    pub pen_device: &'static str,
    pub touch_device: &'static str,
}

/// Most specific model first.
pub const PROFILES: [&DeviceProfile; 3] = [&RMPP, &RM2, &RM1];

impl DeviceProfile {
    pub fn from_key(key: &str) -> Option<&'static Self> {
        let key = key.to_lowercase();
        PROFILES.into_iter().find(|p| p.key == key)
    }

    pub fn from_model(model: &str) -> Option<&'static Self> {
        PROFILES.into_iter().find(|p| model.contains(p.model_marker))
    }

    pub fn pen_max(&self) -> Extent {
        Extent::new(self.pen_x_max, self.pen_y_max)
    }

    pub fn touch_max(&self) -> Extent {
        Extent::new(self.touch_x_max, self.touch_y_max)
    }

    pub fn display(&self, orientation: Orientation) -> Extent {
        orientation.display_extent(Extent::new(self.display_width, self.display_height))
    }

    /// Digitizer extents as the core sees them, after rotation.
    pub fn sensor_extents(&self, orientation: Orientation) -> SensorExtents {
        SensorExtents {
            multitouch: orientation.touch_extent(self.touch_max()),
            stylus: orientation.pen_extent(self.pen_max()),
        }
    }

    /// Detect the device this process runs on.
    pub fn detect_local() -> Result<&'static Self, Box<dyn std::error::Error + Send + Sync>> {
        let model = std::fs::read_to_string(MODEL_PATH)?;
        Self::resolve_model(&model)
    }

    /// Detect device via SSH connection.
    ///
    /// Reads the device model from /proc/device-tree/model on the remote device.
    pub fn detect_via_ssh(session: &ssh2::Session) -> Result<&'static Self, Box<dyn std::error::Error + Send + Sync>> {
        let mut channel = session.channel_session()?;
        channel.exec(&format!("cat {}", MODEL_PATH))?;

        let mut output = String::new();
        channel.read_to_string(&mut output)?;
        channel.close()?;
        channel.wait_close()?;

        let status = channel.exit_status()?;
        if status != 0 {
            return Err(format!("Failed to read device model (exit status {})", status).into());
        }

        Self::resolve_model(&output)
    }

    fn resolve_model(raw: &str) -> Result<&'static Self, Box<dyn std::error::Error + Send + Sync>> {
        // device-tree strings are NUL terminated
        let model = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        if model.is_empty() {
            return Err("Device model is empty".into());
        }
        log::debug!("Device model: {}", model);

        let profile = Self::from_model(model).ok_or_else(|| format!("Unsupported device model: '{}'", model))?;
        log::info!("Detected {}", profile.name);
        Ok(profile)
    }
}
