use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::orientation::Orientation;
use crate::palette::{PixelFormat, Shade};

const DEFAULT_HOST: &str = "10.11.99.1";
const FILE_NAME: &str = "rm-ink.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub key_path: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub local: bool,
    pub model: Option<String>,
    pub pen_device: Option<String>,
    pub touch_device: Option<String>,
    #[serde(default)]
    pub touch_only: bool,
    #[serde(default)]
    pub pen_only: bool,
    #[serde(default)]
    pub no_palm_rejection: bool,
    pub palm_grace_ms: Option<u64>,
    #[serde(default)]
    pub orientation: Orientation,
    pub pixel_format: Option<PixelFormat>,
    #[serde(default)]
    pub stroke: StrokeSection,
    #[serde(default)]
    pub refresh: RefreshSection,
    #[serde(default)]
    pub ink: InkSection,
}

/// `[stroke]`: contact tracking.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrokeSection {
    pub deadzone: Option<f32>,
    pub contact_timeout_ms: Option<u64>,
    pub max_contacts: Option<usize>,
    pub min_point_distance: Option<f32>,
    pub pen_radius: Option<u32>,
    pub stylus_eraser_radius: Option<u32>,
    pub rubber_eraser_radius: Option<u32>,
}

/// `[refresh]`: waveform policy and dispatch queue.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshSection {
    pub suppression_window_ms: Option<u64>,
    pub auto_area_threshold: Option<u64>,
    pub small_delta_area: Option<u64>,
    pub fast_velocity: Option<f32>,
    pub queue_capacity: Option<usize>,
    pub submit_timeout_ms: Option<u64>,
    pub coalesce_window_ms: Option<u64>,
}

/// `[ink]`: how strokes are shaded.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InkSection {
    pub pen_shade: Option<Shade>,
    #[serde(default)]
    pub antialias: bool,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            key_path: None,
            password: None,
            local: false,
            model: None,
            pen_device: None,
            touch_device: None,
            touch_only: false,
            pen_only: false,
            no_palm_rejection: false,
            palm_grace_ms: None,
            orientation: Orientation::default(),
            pixel_format: None,
            stroke: StrokeSection::default(),
            refresh: RefreshSection::default(),
            ink: InkSection::default(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.into()
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    default_config_paths()
        .into_iter()
        .filter(|path| path.exists())
        .find_map(|path| load_from_path(&path))
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(FILE_NAME)];

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join(FILE_NAME));
    }

    paths
}
