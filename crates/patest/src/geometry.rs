//! 2D geometry helpers for bed layout.
//!
//! Thin wrappers around nalgebra plus an axis-aligned rectangle used for
//! patch footprints and the printable area.

use serde::{Deserialize, Serialize};

/// A point on the bed (mm).
pub type Point2 = nalgebra::Point2<f64>;

/// A 2D displacement (mm).
pub type Vec2 = nalgebra::Vector2<f64>;

/// An axis-aligned rectangle on the bed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Lower-left corner.
    pub min: [f64; 2],
    /// Upper-right corner.
    pub max: [f64; 2],
}

impl Rect {
    /// Create a rectangle from two corners.
    ///
    /// Corners are sorted, so the arguments may come in any order.
    pub fn new(a: [f64; 2], b: [f64; 2]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }

    /// Rectangle with a given lower-left corner and size.
    pub fn from_origin_size(origin: Point2, size: Vec2) -> Self {
        Self::new(
            [origin.x, origin.y],
            [origin.x + size.x, origin.y + size.y],
        )
    }

    /// Width along X (mm).
    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    /// Depth along Y (mm).
    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// Center point.
    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        )
    }

    /// Does the rectangle contain the point (boundary inclusive)?
    pub fn contains(&self, p: &Point2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    /// Is `other` entirely inside this rectangle (boundary inclusive)?
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.min[0] >= self.min[0]
            && other.min[1] >= self.min[1]
            && other.max[0] <= self.max[0]
            && other.max[1] <= self.max[1]
    }

    /// Do the interiors of the two rectangles overlap?
    ///
    /// Shared edges do not count as an overlap, so patches placed exactly
    /// side by side are considered disjoint.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min[0] < other.max[0]
            && other.min[0] < self.max[0]
            && self.min[1] < other.max[1]
            && other.min[1] < self.max[1]
    }

    /// Shrink the rectangle by `d` on every side.
    ///
    /// Returns `None` when the inset would leave no area.
    pub fn inset(&self, d: f64) -> Option<Self> {
        let r = Self {
            min: [self.min[0] + d, self.min[1] + d],
            max: [self.max[0] - d, self.max[1] - d],
        };
        if r.width() <= 0.0 || r.height() <= 0.0 {
            None
        } else {
            Some(r)
        }
    }

    /// Rectangle shifted by a displacement.
    pub fn translated(&self, by: Vec2) -> Self {
        Self {
            min: [self.min[0] + by.x, self.min[1] + by.y],
            max: [self.max[0] + by.x, self.max[1] + by.y],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_basics() {
        let r = Rect::new([10.0, 10.0], [190.0, 150.0]);
        assert_eq!(r.width(), 180.0);
        assert_eq!(r.height(), 140.0);
        assert_eq!(r.center(), Point2::new(100.0, 80.0));
        assert!(r.contains(&Point2::new(10.0, 10.0)));
        assert!(!r.contains(&Point2::new(9.9, 10.0)));
    }

    #[test]
    fn test_rect_corner_order() {
        let r = Rect::new([5.0, 8.0], [1.0, 2.0]);
        assert_eq!(r.min, [1.0, 2.0]);
        assert_eq!(r.max, [5.0, 8.0]);
    }

    #[test]
    fn test_intersects_excludes_shared_edge() {
        let a = Rect::new([0.0, 0.0], [10.0, 10.0]);
        let b = Rect::new([10.0, 0.0], [20.0, 10.0]);
        let c = Rect::new([9.0, 0.0], [20.0, 10.0]);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&a));
    }

    #[test]
    fn test_inset() {
        let r = Rect::new([0.0, 0.0], [100.0, 40.0]);
        let inner = r.inset(10.0).unwrap();
        assert_eq!(inner.min, [10.0, 10.0]);
        assert_eq!(inner.max, [90.0, 30.0]);
        assert!(r.inset(20.0).is_none());
        assert!(r.inset(25.0).is_none());
    }

    #[test]
    fn test_contains_rect() {
        let outer = Rect::new([0.0, 0.0], [100.0, 100.0]);
        let inner = Rect::new([10.0, 10.0], [50.0, 50.0]);
        assert!(outer.contains_rect(&inner));
        assert!(!inner.contains_rect(&outer));
        assert!(outer.contains_rect(&outer));
    }
}
