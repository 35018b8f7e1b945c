//! Multitouch slot protocol (type B) to per-contact samples.

use evdevil::event::InputEvent;

use crate::classify::TOOL_FINGER;
use crate::orientation::Orientation;
use crate::sensor::{Extent, RawSample, SensorSpace, Ticks};

use super::event::{
    raw_parts, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_SLOT, ABS_MT_TRACKING_ID, EV_ABS, EV_SYN, SYN_REPORT,
};

const MT_SLOTS: usize = 16;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    tracking_id: Option<i32>,
    x: Option<u32>,
    y: Option<u32>,
    /// Position changed since the last frame.
    dirty: bool,
    /// Tracking id went to -1 during this frame.
    released: bool,
    /// Contact that was released and replaced within the same frame.
    replaced: Option<(i32, (u32, u32))>,
}

impl Slot {
    fn position(&self) -> Option<(u32, u32)> {
        self.x.zip(self.y)
    }
}

#[derive(Debug)]
pub struct TouchDecoder {
    orientation: Orientation,
    max: Extent,
    slots: [Slot; MT_SLOTS],
    current_slot: usize,
}

impl TouchDecoder {
    /// `max` is the raw maximum of the touch axes, before rotation.
    pub fn new(orientation: Orientation, max: Extent) -> Self {
        Self {
            orientation,
            max,
            slots: [Slot::default(); MT_SLOTS],
            current_slot: 0,
        }
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.tracking_id.is_some() && !s.released).count()
    }

    /// Feed one event. A SYN_REPORT returns one sample per contact that
    /// moved or lifted during the frame.
    pub fn push(&mut self, ev: &InputEvent, at: Ticks) -> Vec<RawSample> {
        let (ty, code, value) = raw_parts(ev);
        if ty == EV_SYN && code == SYN_REPORT {
            return self.finish_frame(at);
        }
        if ty != EV_ABS {
            return Vec::new();
        }

        match code {
            ABS_MT_SLOT => {
                self.current_slot = (value.max(0) as usize).min(MT_SLOTS - 1);
            }
            ABS_MT_TRACKING_ID => {
                let slot = &mut self.slots[self.current_slot];
                if value >= 0 {
                    let mut replaced = slot.replaced;
                    if slot.released {
                        // Lifted and retouched within one frame.
                        log::debug!("touch slot {} reused within a frame", self.current_slot);
                        replaced = slot.tracking_id.zip(slot.position()).or(replaced);
                    }
                    *slot = Slot {
                        tracking_id: Some(value),
                        dirty: true,
                        replaced,
                        ..Slot::default()
                    };
                } else if slot.tracking_id.is_some() {
                    slot.released = true;
                }
            }
            ABS_MT_POSITION_X => {
                let slot = &mut self.slots[self.current_slot];
                slot.x = Some(value.max(0) as u32);
                slot.dirty = true;
            }
            ABS_MT_POSITION_Y => {
                let slot = &mut self.slots[self.current_slot];
                slot.y = Some(value.max(0) as u32);
                slot.dirty = true;
            }
            _ => {}
        }
        Vec::new()
    }

    fn finish_frame(&mut self, at: Ticks) -> Vec<RawSample> {
        let mut samples = Vec::new();
        for slot in self.slots.iter_mut() {
            if let Some((old_id, (x, y))) = slot.replaced.take() {
                let (x, y) = self.orientation.rotate_touch(x, y, self.max);
                samples.push(RawSample::new(SensorSpace::Multitouch, x, y, TOOL_FINGER, old_id, at).lifted());
            }
            let Some(id) = slot.tracking_id else { continue };
            let position = slot.position();

            if slot.released {
                if let Some((x, y)) = position {
                    let (x, y) = self.orientation.rotate_touch(x, y, self.max);
                    samples.push(RawSample::new(SensorSpace::Multitouch, x, y, TOOL_FINGER, id, at).lifted());
                }
                *slot = Slot::default();
                continue;
            }

            if slot.dirty {
                if let Some((x, y)) = position {
                    let (x, y) = self.orientation.rotate_touch(x, y, self.max);
                    samples.push(RawSample::new(SensorSpace::Multitouch, x, y, TOOL_FINGER, id, at));
                }
                slot.dirty = false;
            }
        }
        samples
    }
}
