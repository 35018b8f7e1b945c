//! Per-contact stroke state machines.
//!
//! A contact is IDLE until a sample above the deadzone arrives, ACTIVE
//! while samples keep coming with the same tool, and ENDING once it lifts
//! off, changes tool, times out or is evicted. An ENDING contact is
//! removed from the table and its finalized [`Stroke`] is handed out in a
//! [`StrokeEvent::End`]; the next sample with the same id starts afresh.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::classify::{Classification, Tool};
use crate::geometry::{DisplayPoint, Region};
use crate::sensor::{Extent, RawSample, SensorSpace, Ticks};

pub type StrokeId = u64;

/// Contacts are tracked per sensor: both digitizers number their
/// contacts independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactKey {
    pub space: SensorSpace,
    pub contact: i32,
}

impl ContactKey {
    pub fn of(sample: &RawSample) -> Self {
        Self {
            space: sample.space,
            contact: sample.contact_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactState {
    Idle,
    Active,
    /// Terminal. Only ever observed inside an End event.
    Ending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    LiftOff,
    ToolChange,
    Timeout,
    Overflow,
    Palm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub id: StrokeId,
    pub tool: Tool,
    pub points: Vec<DisplayPoint>,
    pub start_time: Ticks,
    pub last_time: Ticks,
    /// Every pixel the stroke may have inked, brush margin included.
    pub bounds: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrokeEvent {
    Begin {
        stroke: StrokeId,
        tool: Tool,
        point: DisplayPoint,
        pressure: f32,
        region: Region,
        at: Ticks,
    },
    Move {
        stroke: StrokeId,
        tool: Tool,
        point: DisplayPoint,
        pressure: f32,
        /// Pixels touched by the newest segment.
        region: Region,
        /// Display pixels per millisecond over the newest segment.
        velocity: f32,
        at: Ticks,
    },
    End {
        stroke: Stroke,
        reason: EndReason,
        at: Ticks,
    },
}

impl StrokeEvent {
    pub fn stroke_id(&self) -> StrokeId {
        match self {
            StrokeEvent::Begin { stroke, .. } | StrokeEvent::Move { stroke, .. } => *stroke,
            StrokeEvent::End { stroke, .. } => stroke.id,
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            StrokeEvent::Begin { tool, .. } | StrokeEvent::Move { tool, .. } => *tool,
            StrokeEvent::End { stroke, .. } => stroke.tool,
        }
    }

    pub fn at(&self) -> Ticks {
        match self {
            StrokeEvent::Begin { at, .. } | StrokeEvent::Move { at, .. } | StrokeEvent::End { at, .. } => *at,
        }
    }

    /// Region needing a refresh: the newest ink for in-flight strokes,
    /// the full bounds for finished ones.
    pub fn region(&self) -> Region {
        match self {
            StrokeEvent::Begin { region, .. } | StrokeEvent::Move { region, .. } => *region,
            StrokeEvent::End { stroke, .. } => stroke.bounds,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, StrokeEvent::End { .. })
    }
}

/// Brush radius in display pixels, per tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrushConfig {
    pub pen_radius: u32,
    pub stylus_eraser_radius: u32,
    pub rubber_eraser_radius: u32,
}

impl BrushConfig {
    pub fn radius(&self, tool: Tool) -> u32 {
        match tool {
            Tool::Pen | Tool::Unknown => self.pen_radius,
            Tool::StylusEraser => self.stylus_eraser_radius,
            Tool::RubberEraser => self.rubber_eraser_radius,
        }
    }
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            pen_radius: 3,
            stylus_eraser_radius: 16,
            rubber_eraser_radius: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    /// Normalized pressure at or below which a contact is not touching.
    pub deadzone: f32,
    pub contact_timeout_ms: u64,
    pub max_contacts: usize,
    /// Points closer than this to the previous one are dropped.
    pub min_point_distance: f32,
    pub brush: BrushConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            deadzone: 0.0,
            contact_timeout_ms: 250,
            max_contacts: 10,
            min_point_distance: 1.0,
            brush: BrushConfig::default(),
        }
    }
}

struct Contact {
    stroke: Stroke,
    velocity: f32,
}

impl Contact {
    fn finish(self, reason: EndReason, at: Ticks) -> StrokeEvent {
        StrokeEvent::End {
            stroke: self.stroke,
            reason,
            at,
        }
    }
}

struct Contacts {
    active: HashMap<ContactKey, Contact>,
    next_id: StrokeId,
}

pub struct StrokeTracker {
    config: TrackerConfig,
    display: Extent,
    contacts: Mutex<Contacts>,
    overflows: AtomicU64,
}

impl StrokeTracker {
    pub fn new(config: TrackerConfig, display: Extent) -> Self {
        Self {
            config,
            display,
            contacts: Mutex::new(Contacts {
                active: HashMap::with_capacity(config.max_contacts),
                next_id: 1,
            }),
            overflows: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Contacts> {
        self.contacts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the state machine of the sample's contact.
    pub fn feed(&self, sample: &RawSample, point: DisplayPoint, class: Classification) -> Vec<StrokeEvent> {
        let key = ContactKey::of(sample);
        let at = sample.timestamp;
        let touching = !sample.lift_off && class.pressure > self.config.deadzone;
        let mut events = Vec::new();
        let mut contacts = self.lock();

        if let Some(tool) = contacts.active.get(&key).map(|c| c.stroke.tool) {
            if touching && tool == class.tool {
                if let Some(contact) = contacts.active.get_mut(&key) {
                    events.extend(self.extend(contact, at, point, class.pressure));
                }
                return events;
            }

            let reason = if touching { EndReason::ToolChange } else { EndReason::LiftOff };
            if let Some(contact) = contacts.active.remove(&key) {
                log::debug!("{} stroke {} ends ({:?})", key.space, contact.stroke.id, reason);
                events.push(contact.finish(reason, at));
            }
        }

        if !touching {
            return events;
        }

        if contacts.active.len() >= self.config.max_contacts {
            events.extend(self.evict_stalest(&mut contacts, at));
        }
        events.push(self.begin(&mut contacts, key, at, point, class));
        events
    }

    fn begin(
        &self,
        contacts: &mut Contacts,
        key: ContactKey,
        at: Ticks,
        point: DisplayPoint,
        class: Classification,
    ) -> StrokeEvent {
        let id = contacts.next_id;
        contacts.next_id += 1;

        let region = Region::around(point, self.config.brush.radius(class.tool), self.display);
        log::debug!("{} stroke {} begins ({}) at {}", key.space, id, class.tool, region);

        contacts.active.insert(
            key,
            Contact {
                stroke: Stroke {
                    id,
                    tool: class.tool,
                    points: vec![point],
                    start_time: at,
                    last_time: at,
                    bounds: region,
                },
                velocity: 0.0,
            },
        );

        StrokeEvent::Begin {
            stroke: id,
            tool: class.tool,
            point,
            pressure: class.pressure,
            region,
            at,
        }
    }

    fn extend(&self, contact: &mut Contact, at: Ticks, point: DisplayPoint, pressure: f32) -> Option<StrokeEvent> {
        let radius = self.config.brush.radius(contact.stroke.tool);
        let stroke = &mut contact.stroke;
        let last = *stroke.points.last()?;

        let anchor = if at == stroke.last_time {
            // Same timestamp: the later report replaces the earlier one.
            let anchor = match stroke.points.len() {
                n if n >= 2 => stroke.points[n - 2],
                _ => point,
            };
            if let Some(p) = stroke.points.last_mut() {
                *p = point;
            }
            anchor
        } else {
            let dt = at.saturating_sub(stroke.last_time);
            let distance = last.distance(&point);
            stroke.last_time = stroke.last_time.max(at);

            if distance < self.config.min_point_distance {
                return None;
            }
            if dt > 0 {
                contact.velocity = distance / dt as f32;
            }
            stroke.points.push(point);
            last
        };

        let region = Region::around(anchor, radius, self.display).union(&Region::around(point, radius, self.display));
        stroke.bounds = stroke.bounds.union(&region);

        Some(StrokeEvent::Move {
            stroke: stroke.id,
            tool: stroke.tool,
            point,
            pressure,
            region,
            velocity: contact.velocity,
            at,
        })
    }

    fn evict_stalest(&self, contacts: &mut Contacts, at: Ticks) -> Option<StrokeEvent> {
        let key = contacts
            .active
            .iter()
            .min_by_key(|(_, c)| c.stroke.last_time)
            .map(|(k, _)| *k)?;
        let contact = contacts.active.remove(&key)?;

        let total = self.overflows.fetch_add(1, Ordering::Relaxed) + 1;
        log::warn!(
            "Contact overflow: {} contacts active, ending stalest {} stroke {} (overflows: {})",
            self.config.max_contacts,
            key.space,
            contact.stroke.id,
            total
        );
        Some(contact.finish(EndReason::Overflow, at))
    }

    /// Force every contact silent for longer than the timeout to end.
    pub fn expire(&self, now: Ticks) -> Vec<StrokeEvent> {
        let timeout = self.config.contact_timeout_ms;
        self.end_where(now, EndReason::Timeout, |_, c| now.saturating_sub(c.stroke.last_time) > timeout)
    }

    /// End every active contact of one sensor.
    pub fn end_space(&self, space: SensorSpace, at: Ticks, reason: EndReason) -> Vec<StrokeEvent> {
        self.end_where(at, reason, |key, _| key.space == space)
    }

    fn end_where(
        &self,
        at: Ticks,
        reason: EndReason,
        pred: impl Fn(&ContactKey, &Contact) -> bool,
    ) -> Vec<StrokeEvent> {
        let mut contacts = self.lock();
        let keys: Vec<ContactKey> = contacts
            .active
            .iter()
            .filter(|(k, c)| pred(*k, *c))
            .map(|(k, _)| *k)
            .collect();

        let mut ended: Vec<Contact> = keys.iter().filter_map(|k| contacts.active.remove(k)).collect();
        drop(contacts);

        ended.sort_by_key(|c| c.stroke.id);
        ended
            .into_iter()
            .map(|c| {
                log::debug!("stroke {} ends ({:?})", c.stroke.id, reason);
                c.finish(reason, at)
            })
            .collect()
    }

    pub fn state(&self, key: ContactKey) -> ContactState {
        if self.lock().active.contains_key(&key) {
            ContactState::Active
        } else {
            ContactState::Idle
        }
    }

    pub fn active_count(&self) -> usize {
        self.lock().active.len()
    }

    pub fn has_active(&self, space: SensorSpace) -> bool {
        self.lock().active.keys().any(|k| k.space == space)
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflows.load(Ordering::Relaxed)
    }
}
