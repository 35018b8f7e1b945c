//! The full path from raw digitizer samples to queued panel refreshes.

use std::sync::{Arc, Mutex, PoisonError};

use crate::classify::{Classifier, PressureConfig, Tool};
use crate::dispatch::{DispatchConfig, RefreshDispatcher};
use crate::error::Error;
use crate::geometry::Region;
use crate::mapper::{CoordinateMapper, SensorExtents};
use crate::palette::{InkStyle, Palette, PixelFormat};
use crate::palm::PalmGuard;
use crate::policy::{PolicyConfig, WaveformPolicy};
use crate::sensor::{Extent, RawSample, SensorSpace, Ticks};
use crate::tracker::{EndReason, StrokeEvent, StrokeTracker, TrackerConfig};
use crate::waveform::RefreshRequest;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub display: Extent,
    pub sensors: SensorExtents,
    pub pressure: PressureConfig,
    pub tracker: TrackerConfig,
    pub policy: PolicyConfig,
    pub dispatch: DispatchConfig,
    pub ink: InkStyle,
    pub pixel_format: PixelFormat,
    /// Palm-rejection grace period; `None` disables palm rejection.
    pub palm_grace_ms: Option<u64>,
}

impl PipelineConfig {
    pub fn new(display: Extent, sensors: SensorExtents) -> Self {
        Self {
            display,
            sensors,
            pressure: PressureConfig::default(),
            tracker: TrackerConfig::default(),
            policy: PolicyConfig::default(),
            dispatch: DispatchConfig::default(),
            ink: InkStyle::default(),
            pixel_format: PixelFormat::detect(),
            palm_grace_ms: None,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.tracker.max_contacts == 0 {
            return Err(Error::config("max_contacts must be at least 1"));
        }
        if self.dispatch.capacity == 0 {
            return Err(Error::config("refresh queue capacity must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.tracker.deadzone) {
            return Err(Error::config(format!(
                "deadzone {} is outside [0, 1)",
                self.tracker.deadzone
            )));
        }
        Ok(())
    }
}

/// Values resolved once at start and shared by everything downstream.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub display: Extent,
    pub palette: Palette,
    pub ink: InkStyle,
}

impl Context {
    /// Pixel value for ink laid down by `tool` at `pressure`.
    pub fn ink_pixel(&self, tool: Tool, pressure: f32) -> u32 {
        let shade = self.ink.shade_for(tool);
        if self.ink.antialias {
            self.palette.blend(shade, pressure)
        } else {
            self.palette.pixel(shade)
        }
    }
}

pub struct Pipeline {
    context: Context,
    mapper: CoordinateMapper,
    classifier: Classifier,
    tracker: StrokeTracker,
    policy: WaveformPolicy,
    dispatcher: Arc<RefreshDispatcher>,
    palm: Option<PalmGuard>,
    /// Keeps policy sequence order and queue order identical.
    emit_order: Mutex<()>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, Error> {
        config.validate()?;
        let mapper = CoordinateMapper::new(config.display, &config.sensors)?;

        log::info!(
            "Pipeline ready: display {}, touch {}, pen {}, {} pixels",
            config.display,
            config.sensors.multitouch,
            config.sensors.stylus,
            config.pixel_format
        );
        log::debug!(
            "Pixel width {} byte(s) on a {}-bit target",
            config.pixel_format.bytes_per_pixel(),
            config.pixel_format.pointer_width() * 8
        );

        Ok(Self {
            context: Context {
                display: config.display,
                palette: Palette::new(config.pixel_format),
                ink: config.ink,
            },
            mapper,
            classifier: Classifier::new(&config.pressure),
            tracker: StrokeTracker::new(config.tracker, config.display),
            policy: WaveformPolicy::new(config.policy, config.display, config.ink),
            dispatcher: Arc::new(RefreshDispatcher::new(config.dispatch)),
            palm: config.palm_grace_ms.map(PalmGuard::new),
            emit_order: Mutex::new(()),
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    pub fn tracker(&self) -> &StrokeTracker {
        &self.tracker
    }

    pub fn dispatcher(&self) -> Arc<RefreshDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Run one sample through the pipeline and queue the refreshes it
    /// causes. Returns the stroke events, i.e. the normalized ink.
    pub fn process(&self, sample: &RawSample) -> Result<Vec<StrokeEvent>, Error> {
        if sample.space == SensorSpace::Multitouch && self.palm_suppresses(sample.timestamp) {
            let events = self.tracker.end_space(SensorSpace::Multitouch, sample.timestamp, EndReason::Palm);
            self.emit(&events)?;
            return Ok(events);
        }

        let point = self.mapper.map(sample);
        let class = self.classifier.classify(sample);
        let events = self.tracker.feed(sample, point, class);

        if let (SensorSpace::Stylus, Some(palm)) = (sample.space, &self.palm) {
            palm.update(self.tracker.has_active(SensorSpace::Stylus), sample.timestamp);
        }

        self.emit(&events)?;
        Ok(events)
    }

    fn palm_suppresses(&self, at: Ticks) -> bool {
        self.palm.as_ref().is_some_and(|palm| palm.suppresses(at))
    }

    /// End contacts whose lift-off never arrived.
    pub fn expire(&self, now: Ticks) -> Result<Vec<StrokeEvent>, Error> {
        let events = self.tracker.expire(now);
        if let Some(palm) = &self.palm {
            if !self.tracker.has_active(SensorSpace::Stylus) {
                palm.release(now);
            }
        }
        self.emit(&events)?;
        Ok(events)
    }

    /// Clear the whole panel (page change).
    pub fn clear_screen(&self, at: Ticks) -> Result<(), Error> {
        let _order = self.emit_order.lock().unwrap_or_else(PoisonError::into_inner);
        self.submit_all(vec![self.policy.clear(at)])
    }

    /// Refresh an area redrawn outside the stroke path.
    pub fn repaint(&self, region: Region, at: Ticks) -> Result<(), Error> {
        let _order = self.emit_order.lock().unwrap_or_else(PoisonError::into_inner);
        self.submit_all(self.policy.repaint(region, at).into_iter().collect())
    }

    /// Retry requests returned in [`Error::SinkBusy`].
    pub fn resubmit(&self, requests: Vec<RefreshRequest>) -> Result<(), Error> {
        let _order = self.emit_order.lock().unwrap_or_else(PoisonError::into_inner);
        self.submit_all(requests)
    }

    /// Give up on requests that will never be resubmitted.
    pub fn abandon(&self, requests: &[RefreshRequest]) {
        self.policy.forget(requests);
    }

    /// Stop accepting refreshes; the dispatcher drains what is queued.
    pub fn close(&self) {
        self.dispatcher.close();
    }

    fn emit(&self, events: &[StrokeEvent]) -> Result<(), Error> {
        if events.is_empty() {
            return Ok(());
        }
        let _order = self.emit_order.lock().unwrap_or_else(PoisonError::into_inner);
        let requests: Vec<RefreshRequest> = events.iter().filter_map(|e| self.policy.decide(e)).collect();
        self.submit_all(requests)
    }

    fn submit_all(&self, requests: Vec<RefreshRequest>) -> Result<(), Error> {
        let mut remaining = requests.into_iter();
        while let Some(req) = remaining.next() {
            match self.dispatcher.submit(req) {
                Ok(()) => {}
                Err(Error::SinkBusy { waited, mut unsent }) => {
                    unsent.extend(remaining);
                    return Err(Error::SinkBusy { waited, unsent });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ERASER_RUBBER, TOOL_FINGER, TOOL_PEN};
    use crate::sink::testing::RecordingSink;
    use crate::waveform::{ModeFamily, PanelUpdate, WaveformMode};
    use std::time::Duration;

    const DISPLAY: Extent = Extent::new(1404, 1872);

    /// Stylus space equal to the display so raw coordinates are pixels.
    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::new(
            DISPLAY,
            SensorExtents {
                multitouch: DISPLAY,
                stylus: DISPLAY,
            },
        );
        config.pixel_format = PixelFormat::Gray8;
        config.dispatch.coalesce_window = Duration::ZERO;
        config
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(config()).unwrap()
    }

    fn pen(x: u32, y: u32, at: Ticks) -> RawSample {
        RawSample::new(SensorSpace::Stylus, x, y, TOOL_PEN, 0, at).with_pressure(2000)
    }

    fn family(update: &PanelUpdate) -> ModeFamily {
        WaveformMode::from_code(update.waveform).unwrap().family()
    }

    fn drain(p: &Pipeline) -> RecordingSink {
        let mut sink = RecordingSink::default();
        p.dispatcher().drain_ready(&mut sink).unwrap();
        sink
    }

    fn end_bounds(events: &[StrokeEvent]) -> Region {
        events
            .iter()
            .find_map(|e| match e {
                StrokeEvent::End { stroke, .. } => Some(stroke.bounds),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_pen_stroke_fast_then_one_fidelity_pass() {
        let p = pipeline();
        p.process(&pen(100, 100, 0)).unwrap();
        p.process(&pen(120, 110, 10)).unwrap();
        p.process(&pen(135, 130, 20)).unwrap();
        let events = p.process(&pen(135, 130, 30).lifted()).unwrap();
        let bounds = end_bounds(&events);

        let sink = drain(&p);
        let fast: Vec<_> = sink.updates.iter().filter(|u| family(u) == ModeFamily::Fast).collect();
        let fine: Vec<_> = sink.updates.iter().filter(|u| family(u) == ModeFamily::Fidelity).collect();

        assert!(!fast.is_empty());
        let margin = 2 * config().tracker.brush.pen_radius;
        for u in &fast {
            assert!(u.region.width <= 40 + margin && u.region.height <= 40 + margin, "{:?}", u);
            assert!(bounds.contains(&u.region));
        }
        assert_eq!(fine.len(), 1);
        assert_eq!(fine[0].region, bounds);
        assert_eq!(sink.updates.last().unwrap().region, bounds);
    }

    #[test]
    fn test_rubber_eraser_never_uses_fast_modes() {
        let p = pipeline();
        let rubber = |x, y, at| RawSample::new(SensorSpace::Stylus, x, y, ERASER_RUBBER, 0, at).with_pressure(3000);

        let mut at = 0;
        for step in 0..20u32 {
            let x = 300 + step * 10;
            p.process(&rubber(x, 300 + (step % 2) * 200, at)).unwrap();
            at += 5;
        }
        p.process(&rubber(490, 500, at).lifted()).unwrap();

        let sink = drain(&p);
        assert!(!sink.updates.is_empty());
        assert!(sink.updates.iter().all(|u| family(u) == ModeFamily::Fidelity));
    }

    #[test]
    fn test_identical_repeat_forwards_once() {
        let p = pipeline();
        p.process(&pen(200, 200, 5)).unwrap();
        p.process(&pen(200, 200, 5)).unwrap();

        let sink = drain(&p);
        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].waveform, WaveformMode::A2.code());
    }

    #[test]
    fn test_sink_sees_non_decreasing_sequences() {
        let p = pipeline();
        p.clear_screen(0).unwrap();
        let mut at = 1;
        for stroke in 0..5u32 {
            for i in 0..4u32 {
                p.process(&pen(50 + stroke * 200 + i * 15, 80 + i * 30, at)).unwrap();
                at += 7;
            }
            p.process(&pen(0, 0, at).lifted()).unwrap();
            at += 100;
        }

        let markers = drain(&p).markers();
        assert!(markers.len() > 5);
        assert!(markers.windows(2).all(|w| w[0] <= w[1]), "{:?}", markers);
    }

    #[test]
    fn test_timeout_produces_corrective_refresh() {
        let p = pipeline();
        p.process(&pen(400, 400, 1000)).unwrap();
        drain(&p);

        let events = p.expire(1000 + config().tracker.contact_timeout_ms + 1).unwrap();
        assert!(matches!(events.as_slice(), [StrokeEvent::End { reason: EndReason::Timeout, .. }]));
        let sink = drain(&p);
        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].waveform, WaveformMode::Gc16.code());
    }

    #[test]
    fn test_palm_rejection_holds_touch_while_pen_is_down() {
        let mut config = config();
        config.palm_grace_ms = Some(500);
        let p = Pipeline::new(config).unwrap();
        let finger = |id, at| RawSample::new(SensorSpace::Multitouch, 700, 700, TOOL_FINGER, id, at);

        let events = p.process(&finger(1, 0)).unwrap();
        assert!(matches!(events.as_slice(), [StrokeEvent::Begin { .. }]));

        p.process(&pen(100, 100, 10)).unwrap();
        let events = p.process(&finger(1, 20)).unwrap();
        assert!(matches!(events.as_slice(), [StrokeEvent::End { reason: EndReason::Palm, .. }]));
        assert!(p.process(&finger(2, 30)).unwrap().is_empty());

        p.process(&pen(100, 100, 40).lifted()).unwrap();
        assert!(p.process(&finger(3, 100)).unwrap().is_empty());
        let events = p.process(&finger(3, 600)).unwrap();
        assert!(matches!(events.as_slice(), [StrokeEvent::Begin { .. }]));
    }

    #[test]
    fn test_touch_accepted_after_pen_stroke_times_out() {
        let mut config = config();
        config.palm_grace_ms = Some(500);
        let timeout = config.tracker.contact_timeout_ms;
        let p = Pipeline::new(config).unwrap();
        let finger = |at| RawSample::new(SensorSpace::Multitouch, 700, 700, TOOL_FINGER, 1, at);

        p.process(&pen(100, 100, 0)).unwrap();
        assert!(p.process(&finger(10)).unwrap().is_empty());

        let expire_at = timeout + 1;
        assert_eq!(p.expire(expire_at).unwrap().len(), 1);
        assert!(p.process(&finger(expire_at + 100)).unwrap().is_empty());
        let events = p.process(&finger(expire_at + 500)).unwrap();
        assert!(matches!(events.as_slice(), [StrokeEvent::Begin { .. }]));
    }

    #[test]
    fn test_repaint_stays_on_the_panel() {
        let p = pipeline();
        p.repaint(Region::new(1400, 1800, 500, 500), 0).unwrap();
        p.repaint(Region::new(0, 1872, 100, 100), 1).unwrap();

        let sink = drain(&p);
        assert_eq!(sink.updates.len(), 1);
        assert_eq!(sink.updates[0].region, Region::new(1400, 1800, 4, 72));
    }

    #[test]
    fn test_sink_busy_returns_unsent_requests() {
        let mut config = config();
        config.dispatch.capacity = 1;
        config.dispatch.submit_timeout = Duration::from_millis(10);
        let p = Pipeline::new(config).unwrap();

        p.clear_screen(0).unwrap();
        let unsent = match p.process(&pen(10, 10, 1)) {
            Err(Error::SinkBusy { unsent, .. }) => unsent,
            other => panic!("expected SinkBusy, got {:?}", other),
        };
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].mode, WaveformMode::A2);

        assert_eq!(drain(&p).updates.len(), 1);
        p.resubmit(unsent).unwrap();
        assert_eq!(drain(&p).updates[0].waveform, WaveformMode::A2.code());
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let mut zero = config();
        zero.sensors.stylus = Extent::new(15725, 0);
        assert!(matches!(Pipeline::new(zero), Err(Error::Configuration(_))));

        let mut no_queue = config();
        no_queue.dispatch.capacity = 0;
        assert!(matches!(Pipeline::new(no_queue), Err(Error::Configuration(_))));

        let mut deadzone = config();
        deadzone.tracker.deadzone = 1.0;
        assert!(matches!(Pipeline::new(deadzone), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_ink_pixel_uses_context_palette() {
        let p = pipeline();
        assert_eq!(p.context().ink_pixel(Tool::Pen, 0.3), 0x00);
        assert_eq!(p.context().ink_pixel(Tool::RubberEraser, 1.0), 0xff);
    }
}
