//! Print decoded samples and where they land on the display.
//! Run: rm-ink dump touch  (or dump pen) to stream and print samples.

use crate::config::{Config, DumpTarget};
use crate::device::DeviceProfile;
use crate::input::{raw_parts, EventReader, InputSource, PenDecoder, TouchDecoder};
use crate::mapper::CoordinateMapper;
use crate::sensor::{Clock, RawSample};

fn code_name(ty: u16, code: u16) -> String {
    match ty {
        0 => "SYN_REPORT".to_string(),
        1 => format!("KEY/{:#x}", code),
        3 => {
            let abs = match code {
                0x00 => "X",
                0x01 => "Y",
                0x18 => "PRESSURE",
                0x19 => "DISTANCE",
                0x1a => "TILT_X",
                0x1b => "TILT_Y",
                0x2f => "MT_SLOT",
                0x30 => "MT_TOUCH_MAJOR",
                0x31 => "MT_TOUCH_MINOR",
                0x34 => "MT_ORIENTATION",
                0x35 => "MT_POSITION_X",
                0x36 => "MT_POSITION_Y",
                0x37 => "MT_TOOL_TYPE",
                0x39 => "MT_TRACKING_ID",
                0x3a => "MT_PRESSURE",
                _ => "?",
            };
            format!("ABS_{}({})", abs, code)
        }
        _ => format!("type{} code{}", ty, code),
    }
}

fn describe(n: u64, sample: &RawSample, mapper: &CoordinateMapper) -> String {
    let point = mapper.map(sample);
    format!(
        "{:6}  {:>5}ms {} id={} tool={} raw=({}, {}) pressure={} -> ({:.1}, {:.1}){}",
        n,
        sample.timestamp,
        sample.space,
        sample.contact_id,
        sample.tool_id,
        sample.x,
        sample.y,
        sample.pressure.map_or_else(|| "-".to_string(), |p| p.to_string()),
        point.x,
        point.y,
        if sample.lift_off { "  LIFT" } else { "" }
    )
}

pub fn run_dump(
    target: DumpTarget,
    config: &Config,
    device: &DeviceProfile,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let pipeline_config = config.pipeline(device);
    let mapper = CoordinateMapper::new(pipeline_config.display, &pipeline_config.sensors)?;
    let path = match target {
        DumpTarget::Pen => config.pen_device(device),
        DumpTarget::Touch => config.touch_device(device),
    };

    let source = InputSource::open(path, config)?;
    let mut reader = EventReader::new(source, device.input_event_size);
    let mut pen = PenDecoder::new(config.orientation, device.pen_max());
    let mut touch = TouchDecoder::new(config.orientation, device.touch_max());
    let clock = Clock::start();

    eprintln!(
        "Dumping {:?} samples from {} onto {} display (Ctrl+C to stop):\n",
        target, path, mapper.display()
    );

    let mut n = 0u64;
    loop {
        let ev = reader.next_event()?;
        let (ty, code, value) = raw_parts(&ev);
        log::trace!("{}  value={}", code_name(ty, code), value);

        let at = clock.now();
        let samples: Vec<RawSample> = match target {
            DumpTarget::Pen => pen.push(&ev, at).into_iter().collect(),
            DumpTarget::Touch => touch.push(&ev, at),
        };
        for sample in &samples {
            n += 1;
            println!("{}", describe(n, sample, &mapper));
        }
    }
}
