//! Device input boundary: decode raw events into samples and feed them
//! through the pipeline.

mod event;
mod pen;
mod source;
mod touch;

pub use event::{parse_input_event, raw_parts, EventReader};
pub use pen::PenDecoder;
pub use source::InputSource;
pub use touch::TouchDecoder;

use crate::config::Config;
use crate::device::DeviceProfile;
use crate::error::Error;
use crate::pipeline::Pipeline;
use crate::sensor::{Clock, RawSample};
use crate::tracker::StrokeEvent;

/// Settle a pipeline result for a caller that cannot wait: a busy sink
/// gets one retry, after which the refreshes are logged and dropped.
///
/// `Closed` is returned so the caller can stop.
pub fn settle(pipeline: &Pipeline, result: Result<Vec<StrokeEvent>, Error>) -> Result<Vec<StrokeEvent>, Error> {
    match result {
        Ok(events) => Ok(events),
        Err(Error::SinkBusy { unsent, .. }) => {
            log::warn!("Display sink busy, retrying {} refresh request(s)", unsent.len());
            match pipeline.resubmit(unsent) {
                Ok(()) => Ok(Vec::new()),
                Err(Error::Closed) => Err(Error::Closed),
                Err(Error::SinkBusy { unsent, .. }) => {
                    log::error!("Dropping {} refresh request(s): display sink still busy", unsent.len());
                    pipeline.abandon(&unsent);
                    Ok(Vec::new())
                }
                Err(e) => {
                    log::error!("Dropping refreshes: {}", e);
                    Ok(Vec::new())
                }
            }
        }
        Err(Error::Closed) => Err(Error::Closed),
        Err(e) => {
            log::error!("{}", e);
            Ok(Vec::new())
        }
    }
}

fn trace_ink(pipeline: &Pipeline, events: &[StrokeEvent]) {
    if !log::log_enabled!(log::Level::Trace) {
        return;
    }
    let context = pipeline.context();
    for event in events {
        match event {
            StrokeEvent::Begin { stroke, tool, point, pressure, .. }
            | StrokeEvent::Move { stroke, tool, point, pressure, .. } => {
                log::trace!(
                    "stroke {} {} at ({:.1}, {:.1}) ink {:#x}",
                    stroke,
                    tool,
                    point.x,
                    point.y,
                    context.ink_pixel(*tool, *pressure)
                );
            }
            StrokeEvent::End { stroke, reason, .. } => {
                log::trace!("stroke {} done ({:?}), {} points", stroke.id, reason, stroke.points.len());
            }
        }
    }
}

fn deliver(pipeline: &Pipeline, sample: &RawSample) -> Result<(), Error> {
    let events = settle(pipeline, pipeline.process(sample))?;
    trace_ink(pipeline, &events);
    Ok(())
}

pub fn run_pen(
    config: &Config,
    device: &DeviceProfile,
    pipeline: &Pipeline,
    clock: &Clock,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let source = InputSource::open(config.pen_device(device), config)?;
    let mut reader = EventReader::new(source, device.input_event_size);
    let mut decoder = PenDecoder::new(config.orientation, device.pen_max());
    log::info!("Pen processing started");

    let mut frame_count: u64 = 0;
    loop {
        let ev = reader.next_event()?;
        let Some(sample) = decoder.push(&ev, clock.now()) else {
            continue;
        };

        if frame_count == 0 {
            log::info!("Pen events flowing");
        }
        frame_count += 1;

        deliver(pipeline, &sample)?;

        if frame_count.is_multiple_of(500) {
            log::debug!("Pen frames processed: {}", frame_count);
        }
    }
}

pub fn run_touch(
    config: &Config,
    device: &DeviceProfile,
    pipeline: &Pipeline,
    clock: &Clock,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let source = InputSource::open(config.touch_device(device), config)?;
    let mut reader = EventReader::new(source, device.input_event_size);
    let mut decoder = TouchDecoder::new(config.orientation, device.touch_max());
    log::info!("Touch processing started");

    let mut frame_count: u64 = 0;
    loop {
        let ev = reader.next_event()?;
        let samples = decoder.push(&ev, clock.now());
        if samples.is_empty() {
            continue;
        }

        if frame_count == 0 {
            log::info!("Touch events flowing");
        }
        frame_count += 1;

        for sample in &samples {
            deliver(pipeline, sample)?;
        }

        if frame_count.is_multiple_of(500) {
            log::debug!("Touch frames: {}, contacts: {}", frame_count, decoder.active_count());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{TOOL_FINGER, TOOL_PEN};
    use crate::dispatch::DispatchConfig;
    use crate::mapper::SensorExtents;
    use crate::pipeline::PipelineConfig;
    use crate::sensor::{Extent, SensorSpace};
    use crate::sink::testing::RecordingSink;
    use crate::waveform::WaveformMode;
    use std::time::Duration;

    fn busy_pipeline() -> Pipeline {
        let display = Extent::new(1404, 1872);
        let mut config = PipelineConfig::new(
            display,
            SensorExtents {
                multitouch: display,
                stylus: display,
            },
        );
        config.dispatch = DispatchConfig {
            capacity: 1,
            submit_timeout: Duration::from_millis(5),
            coalesce_window: Duration::ZERO,
        };
        Pipeline::new(config).unwrap()
    }

    #[test]
    fn test_settle_retries_once_then_drops() {
        let p = busy_pipeline();
        p.clear_screen(0).unwrap();

        let sample = RawSample::new(SensorSpace::Stylus, 10, 10, TOOL_PEN, 0, 1).with_pressure(100);
        assert!(settle(&p, p.process(&sample)).unwrap().is_empty());

        let mut sink = RecordingSink::default();
        p.dispatcher().drain_ready(&mut sink).unwrap();
        assert_eq!(sink.updates.len(), 1);
    }

    #[test]
    fn test_dropped_refresh_does_not_suppress_the_next_one() {
        let p = busy_pipeline();
        p.clear_screen(0).unwrap();

        let pen = RawSample::new(SensorSpace::Stylus, 10, 10, TOOL_PEN, 0, 1).with_pressure(100);
        assert!(settle(&p, p.process(&pen)).unwrap().is_empty());
        let mut sink = RecordingSink::default();
        p.dispatcher().drain_ready(&mut sink).unwrap();

        // Same ink area and mode, well inside the suppression window.
        let finger = RawSample::new(SensorSpace::Multitouch, 10, 10, TOOL_FINGER, 5, 2);
        let events = settle(&p, p.process(&finger)).unwrap();
        assert_eq!(events.len(), 1);

        let mut sink = RecordingSink::default();
        p.dispatcher().drain_ready(&mut sink).unwrap();
        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].waveform, WaveformMode::A2.code());
    }

    #[test]
    fn test_settle_reports_closed() {
        let p = busy_pipeline();
        p.close();
        let sample = RawSample::new(SensorSpace::Stylus, 10, 10, TOOL_PEN, 0, 1).with_pressure(100);
        assert!(matches!(settle(&p, p.process(&sample)), Err(Error::Closed)));
    }
}
