//! Input normalization and e-ink refresh orchestration for reMarkable
//! tablets.
//!
//! Raw digitizer samples are mapped into display space, classified by
//! tool, grouped into strokes, and turned into waveform refresh requests
//! that a single dispatcher forwards to the display sink in order.

pub mod classify;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod dump;
pub mod error;
pub mod geometry;
pub mod input;
pub mod mapper;
pub mod orientation;
pub mod palette;
pub mod palm;
pub mod pipeline;
pub mod policy;
pub mod sensor;
pub mod sink;
pub mod ssh;
pub mod tracker;
pub mod waveform;

pub use error::Error;
pub use pipeline::{Context, Pipeline, PipelineConfig};
pub use sensor::{Clock, RawSample, SensorSpace, Ticks};
pub use tracker::{Stroke, StrokeEvent};
pub use waveform::{RefreshRequest, WaveformMode};
