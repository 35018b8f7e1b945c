mod cli;
mod file;

pub use cli::{Cli, Command, DumpTarget};

use std::path::PathBuf;
use std::time::Duration;

use crate::classify::PressureConfig;
use crate::device::DeviceProfile;
use crate::dispatch::DispatchConfig;
use crate::error::Error;
use crate::orientation::Orientation;
use crate::palette::{InkStyle, PixelFormat};
use crate::pipeline::PipelineConfig;
use crate::policy::PolicyConfig;
use crate::tracker::{BrushConfig, TrackerConfig};

use file::FileConfig;

const DEFAULT_PALM_GRACE_MS: u64 = 500;

/// Authentication method for SSH connection.
#[derive(Clone)]
pub enum Auth {
    Key(PathBuf),
    Password(String),
}

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub key_path: Option<String>,
    pub password: Option<String>,
    pub local: bool,
    pub model: Option<String>,
    pub pen_device: Option<String>,
    pub touch_device: Option<String>,
    pub touch_only: bool,
    pub pen_only: bool,
    pub no_palm_rejection: bool,
    pub palm_grace_ms: u64,
    pub orientation: Orientation,
    pub pixel_format: PixelFormat,
    pub tracker: TrackerConfig,
    pub policy: PolicyConfig,
    pub dispatch: DispatchConfig,
    pub ink: InkStyle,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();

        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file: FileConfig) -> Self {
        let stroke = file.stroke;
        let tracker_defaults = TrackerConfig::default();
        let brush_defaults = tracker_defaults.brush;
        let tracker = TrackerConfig {
            deadzone: stroke.deadzone.unwrap_or(tracker_defaults.deadzone),
            contact_timeout_ms: stroke.contact_timeout_ms.unwrap_or(tracker_defaults.contact_timeout_ms),
            max_contacts: stroke.max_contacts.unwrap_or(tracker_defaults.max_contacts),
            min_point_distance: stroke.min_point_distance.unwrap_or(tracker_defaults.min_point_distance),
            brush: BrushConfig {
                pen_radius: stroke.pen_radius.unwrap_or(brush_defaults.pen_radius),
                stylus_eraser_radius: stroke.stylus_eraser_radius.unwrap_or(brush_defaults.stylus_eraser_radius),
                rubber_eraser_radius: stroke.rubber_eraser_radius.unwrap_or(brush_defaults.rubber_eraser_radius),
            },
        };

        let refresh = file.refresh;
        let policy_defaults = PolicyConfig::default();
        let policy = PolicyConfig {
            suppression_window_ms: refresh.suppression_window_ms.unwrap_or(policy_defaults.suppression_window_ms),
            auto_area_threshold: refresh.auto_area_threshold.unwrap_or(policy_defaults.auto_area_threshold),
            small_delta_area: refresh.small_delta_area.unwrap_or(policy_defaults.small_delta_area),
            fast_velocity: refresh.fast_velocity.unwrap_or(policy_defaults.fast_velocity),
        };

        let dispatch_defaults = DispatchConfig::default();
        let dispatch = DispatchConfig {
            capacity: refresh.queue_capacity.unwrap_or(dispatch_defaults.capacity),
            submit_timeout: refresh
                .submit_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(dispatch_defaults.submit_timeout),
            coalesce_window: refresh
                .coalesce_window_ms
                .map(Duration::from_millis)
                .unwrap_or(dispatch_defaults.coalesce_window),
        };

        let ink = InkStyle {
            pen_shade: file.ink.pen_shade.unwrap_or_default(),
            antialias: file.ink.antialias,
        };

        Self {
            host: cli.host.clone().unwrap_or(file.host),
            key_path: cli.key_path.clone().or(file.key_path),
            password: cli.password.clone().or(file.password),
            local: cli.local || file.local,
            model: cli.model.clone().or(file.model),
            pen_device: cli.pen_device.clone().or(file.pen_device),
            touch_device: cli.touch_device.clone().or(file.touch_device),
            touch_only: cli.touch_only || file.touch_only,
            pen_only: cli.pen_only || file.pen_only,
            no_palm_rejection: cli.no_palm_rejection || file.no_palm_rejection,
            palm_grace_ms: cli
                .palm_grace_ms
                .or(file.palm_grace_ms)
                .unwrap_or(DEFAULT_PALM_GRACE_MS),
            orientation: cli.orientation.unwrap_or(file.orientation),
            pixel_format: cli
                .pixel_format
                .or(file.pixel_format)
                .unwrap_or_else(PixelFormat::detect),
            tracker,
            policy,
            dispatch,
            ink,
        }
    }

    pub fn auth(&self) -> Auth {
        if let Some(ref password) = self.password {
            return Auth::Password(password.clone());
        }
        let path = self.key_path.as_deref().unwrap_or("rm-key");
        Auth::Key(PathBuf::from(path))
    }

    pub fn run_pen(&self) -> bool {
        !self.touch_only
    }

    pub fn run_touch(&self) -> bool {
        !self.pen_only
    }

    /// Palm rejection needs both sensors.
    pub fn palm_rejection(&self) -> bool {
        self.run_pen() && self.run_touch() && !self.no_palm_rejection
    }

    pub fn pen_device<'a>(&'a self, device: &'a DeviceProfile) -> &'a str {
        self.pen_device.as_deref().unwrap_or(device.pen_device)
    }

    pub fn touch_device<'a>(&'a self, device: &'a DeviceProfile) -> &'a str {
        self.touch_device.as_deref().unwrap_or(device.touch_device)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.touch_only && self.pen_only {
            return Err(Error::config("Cannot use both --touch-only and --pen-only"));
        }
        if let Some(model) = &self.model {
            if DeviceProfile::from_key(model).is_none() {
                return Err(Error::config(format!(
                    "Unknown model '{}'. Valid values: rm1, rm2, rmpp",
                    model
                )));
            }
        }
        Ok(())
    }

    /// Everything the pipeline needs for this device.
    pub fn pipeline(&self, device: &DeviceProfile) -> PipelineConfig {
        PipelineConfig {
            display: device.display(self.orientation),
            sensors: device.sensor_extents(self.orientation),
            pressure: PressureConfig {
                stylus_max: Some(device.pen_pressure_max),
                ..PressureConfig::default()
            },
            tracker: self.tracker,
            policy: self.policy,
            dispatch: self.dispatch,
            ink: self.ink,
            pixel_format: self.pixel_format,
            palm_grace_ms: self.palm_rejection().then_some(self.palm_grace_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{RM2, RMPP};
    use crate::palette::Shade;
    use crate::sensor::Extent;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("rm-ink").chain(args.iter().copied()))
    }

    fn file(toml: &str) -> FileConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_cli_overrides_file() {
        let config = Config::merge(
            &cli(&["--palm-grace-ms", "250", "--orientation", "inverted", "--pixel-format", "rgb565"]),
            file("palm_grace_ms = 900\norientation = \"landscape-right\"\npixel_format = \"gray8\""),
        );
        assert_eq!(config.palm_grace_ms, 250);
        assert_eq!(config.orientation, Orientation::Inverted);
        assert_eq!(config.pixel_format, PixelFormat::Rgb565);
    }

    #[test]
    fn test_sections_reach_pipeline_config() {
        let config = Config::merge(
            &cli(&[]),
            file("[stroke]\nmax_contacts = 4\nrubber_eraser_radius = 30\n[refresh]\nqueue_capacity = 8\ncoalesce_window_ms = 0\n[ink]\npen_shade = \"gray\""),
        );
        let pipeline = config.pipeline(&RMPP);

        assert_eq!(pipeline.tracker.max_contacts, 4);
        assert_eq!(pipeline.tracker.brush.rubber_eraser_radius, 30);
        assert_eq!(pipeline.tracker.brush.pen_radius, 3);
        assert_eq!(pipeline.dispatch.capacity, 8);
        assert_eq!(pipeline.dispatch.coalesce_window, Duration::ZERO);
        assert_eq!(pipeline.ink.pen_shade, Shade::Gray);
        assert_eq!(pipeline.pressure.stylus_max, Some(4096));
        assert_eq!(pipeline.display, Extent::new(1620, 2160));
        assert_eq!(pipeline.sensors.stylus, Extent::new(15340, 11180));
        assert_eq!(pipeline.palm_grace_ms, Some(DEFAULT_PALM_GRACE_MS));
    }

    #[test]
    fn test_palm_rejection_needs_both_sensors() {
        let config = Config::merge(&cli(&["--pen-only"]), FileConfig::default());
        assert!(!config.palm_rejection());
        assert_eq!(config.pipeline(&RM2).palm_grace_ms, None);

        let config = Config::merge(&cli(&["--no-palm-rejection"]), FileConfig::default());
        assert!(!config.palm_rejection());
    }

    #[test]
    fn test_validate() {
        let both = Config::merge(&cli(&["--pen-only", "--touch-only"]), FileConfig::default());
        assert!(matches!(both.validate(), Err(Error::Configuration(_))));

        let bad_model = Config::merge(&cli(&["--model", "rm3"]), FileConfig::default());
        assert!(bad_model.validate().is_err());

        let ok = Config::merge(&cli(&["--model", "rm2"]), FileConfig::default());
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_device_paths_default_to_profile() {
        let config = Config::merge(&cli(&["--touch-device", "/dev/input/event7"]), FileConfig::default());
        assert_eq!(config.pen_device(&RM2), RM2.pen_device);
        assert_eq!(config.touch_device(&RM2), "/dev/input/event7");
    }
}
