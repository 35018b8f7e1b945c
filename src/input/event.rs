use std::io::{self, Read};

use evdevil::event::{EventType, InputEvent};

pub const INPUT_EVENT_SIZE_32: usize = 16;
pub const INPUT_EVENT_SIZE_64: usize = 24;

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_ABS: u16 = 0x03;
pub const SYN_REPORT: u16 = 0;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_PRESSURE: u16 = 0x18;
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;

pub const BTN_TOOL_PEN: u16 = 0x140;
pub const BTN_TOOL_RUBBER: u16 = 0x141;
pub const BTN_STYLUS: u16 = 0x14b;

/// Parse a Linux input_event from raw bytes (32-bit or 64-bit format).
pub fn parse_input_event(buf: &[u8]) -> Option<InputEvent> {
    match buf.len() {
        len if len >= INPUT_EVENT_SIZE_64 => Some(decode(&buf[16..24])),
        len if len >= INPUT_EVENT_SIZE_32 => Some(decode(&buf[8..16])),
        _ => None,
    }
}

/// Decode the type/code/value tail that follows the timeval.
fn decode(tail: &[u8]) -> InputEvent {
    let ty = u16::from_le_bytes([tail[0], tail[1]]);
    let code = u16::from_le_bytes([tail[2], tail[3]]);
    let value = i32::from_le_bytes([tail[4], tail[5], tail[6], tail[7]]);

    InputEvent::new(EventType::from_raw(ty), code, value)
}

/// Reads fixed-size input_event records from a byte stream.
pub struct EventReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> EventReader<R> {
    pub fn new(inner: R, event_size: usize) -> Self {
        Self {
            inner,
            buf: vec![0u8; event_size],
        }
    }

    pub fn next_event(&mut self) -> io::Result<InputEvent> {
        loop {
            self.inner.read_exact(&mut self.buf)?;
            if let Some(ev) = parse_input_event(&self.buf) {
                return Ok(ev);
            }
        }
    }
}

/// Type, code and value of an event as plain integers.
pub fn raw_parts(ev: &InputEvent) -> (u16, u16, i32) {
    (ev.event_type().raw(), ev.raw_code(), ev.raw_value())
}

#[cfg(test)]
pub(crate) fn event(ty: u16, code: u16, value: i32) -> InputEvent {
    InputEvent::new(EventType::from_raw(ty), code, value)
}
