//! Display-space points and rectangles.

use std::fmt;

use crate::sensor::Extent;

/// A point in display pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayPoint {
    pub x: f32,
    pub y: f32,
}

impl DisplayPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &DisplayPoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned rectangle in display pixels. `left`/`top` are inclusive,
/// `left + width`/`top + height` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self { left, top, width, height }
    }

    /// The whole display.
    pub const fn full(display: Extent) -> Self {
        Self::new(0, 0, display.width, display.height)
    }

    /// Pixels touched by a brush of `radius` centered on `point`, clipped
    /// to the display.
    pub fn around(point: DisplayPoint, radius: u32, display: Extent) -> Self {
        let r = i64::from(radius);
        let px = point.x.floor() as i64;
        let py = point.y.floor() as i64;

        let left = (px - r).clamp(0, i64::from(display.width));
        let top = (py - r).clamp(0, i64::from(display.height));
        let right = (px + r + 1).clamp(0, i64::from(display.width));
        let bottom = (py + r + 1).clamp(0, i64::from(display.height));

        Self::from_edges(left as u32, top as u32, right as u32, bottom as u32)
    }

    fn from_edges(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
    }

    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle covering both. Empty regions are ignored.
    pub fn union(&self, other: &Region) -> Region {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self::from_edges(
            self.left.min(other.left),
            self.top.min(other.top),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    pub fn intersects(&self, other: &Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    /// Overlap of both, empty when they do not intersect.
    pub fn intersection(&self, other: &Region) -> Region {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.left.saturating_add(self.width).min(other.left.saturating_add(other.width));
        let bottom = self.top.saturating_add(self.height).min(other.top.saturating_add(other.height));
        Self::from_edges(left, top, right, bottom)
    }

    pub fn contains(&self, other: &Region) -> bool {
        !other.is_empty()
            && self.left <= other.left
            && self.top <= other.top
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.left, self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISPLAY: Extent = Extent::new(1404, 1872);

    #[test]
    fn test_around_clips_to_display() {
        let r = Region::around(DisplayPoint::new(1.5, 1870.2), 4, DISPLAY);
        assert_eq!(r, Region::new(0, 1866, 6, 6));

        let r = Region::around(DisplayPoint::new(100.0, 100.0), 2, DISPLAY);
        assert_eq!(r, Region::new(98, 98, 5, 5));
    }

    #[test]
    fn test_union_and_containment() {
        let a = Region::new(10, 10, 20, 20);
        let b = Region::new(25, 5, 10, 10);
        let u = a.union(&b);
        assert_eq!(u, Region::new(10, 5, 25, 25));
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(!a.contains(&b));
        assert_eq!(Region::default().union(&a), a);
    }

    #[test]
    fn test_intersects_is_exclusive_at_edges() {
        let a = Region::new(0, 0, 10, 10);
        assert!(a.intersects(&Region::new(9, 9, 5, 5)));
        assert!(!a.intersects(&Region::new(10, 0, 5, 5)));
        assert!(!a.intersects(&Region::default()));
    }

    #[test]
    fn test_intersection_clips_to_display() {
        let full = Region::full(DISPLAY);
        assert_eq!(Region::new(1400, 1800, 500, 500).intersection(&full), Region::new(1400, 1800, 4, 72));
        assert!(Region::new(2000, 10, 50, 50).intersection(&full).is_empty());
        assert_eq!(Region::new(10, 10, u32::MAX, 5).intersection(&full), Region::new(10, 10, 1394, 5));
    }
}
