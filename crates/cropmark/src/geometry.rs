//! Axis-aligned rectangles in PDF points, top-left origin.
//!
//! Every phase of the pipeline works on `Rect` values: x grows rightward,
//! y grows downward, and all coordinates are PDF points (1/72 in). Pixel
//! space exists only inside the autocrop phase.

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle with `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() < 1.0 || self.height() < 1.0
    }

    /// Smallest rectangle containing both `self` and `other`.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Overlapping region, or `None` when the rectangles are disjoint.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 < x1 && y0 < y1 {
            Some(Rect { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection(other).is_some()
    }

    /// Fraction of `self`'s area covered by `other` (0.0 when disjoint).
    pub fn overlap_fraction(&self, other: &Rect) -> f32 {
        if self.area() <= 0.0 {
            return 0.0;
        }
        self.intersection(other).map(|r| r.area() / self.area()).unwrap_or(0.0)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// `contains` with a symmetric tolerance on every edge.
    pub fn contains_with_tolerance(&self, other: &Rect, tol: f32) -> bool {
        other.x0 >= self.x0 - tol && other.y0 >= self.y0 - tol && other.x1 <= self.x1 + tol && other.y1 <= self.y1 + tol
    }

    /// Grow every edge outward by `pad` points.
    pub fn padded(&self, pad: f32) -> Rect {
        Rect {
            x0: self.x0 - pad,
            y0: self.y0 - pad,
            x1: self.x1 + pad,
            y1: self.y1 + pad,
        }
    }

    /// Clamp this rectangle into `bounds`. Collapses to an edge-hugging
    /// sliver rather than producing negative extents.
    pub fn clamped(&self, bounds: &Rect) -> Rect {
        let x0 = self.x0.clamp(bounds.x0, bounds.x1);
        let x1 = self.x1.clamp(bounds.x0, bounds.x1);
        let y0 = self.y0.clamp(bounds.y0, bounds.y1);
        let y1 = self.y1.clamp(bounds.y0, bounds.y1);
        Rect {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Minimum edge-to-edge gap between two rectangles (0.0 when they touch
    /// or overlap).
    pub fn gap_to(&self, other: &Rect) -> f32 {
        let dx = (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0);
        let dy = (other.y0 - self.y1).max(self.y0 - other.y1).max(0.0);
        (dx * dx + dy * dy).sqrt()
    }

    /// Horizontal band of this rect between absolute `y_top` and `y_bot`.
    pub fn band(&self, y_top: f32, y_bot: f32) -> Rect {
        Rect {
            x0: self.x0,
            y0: y_top.max(self.y0).min(self.y1),
            x1: self.x1,
            y1: y_bot.min(self.y1).max(self.y0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    #[test]
    fn test_new_normalizes_corners() {
        let r = Rect::new(10.0, 20.0, 5.0, 2.0);
        assert_eq!(r.x0, 5.0);
        assert_eq!(r.y0, 2.0);
        assert_eq!(r.x1, 10.0);
        assert_eq!(r.y1, 20.0);
    }

    #[test]
    fn test_union() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(5.0, 5.0, 20.0, 8.0);
        let u = a.union(&b);
        assert_eq!(u, rect(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_intersection_disjoint() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(20.0, 20.0, 30.0, 30.0);
        assert!(a.intersection(&b).is_none());
        assert_eq!(a.overlap_fraction(&b), 0.0);
    }

    #[test]
    fn test_overlap_fraction_half() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(0.0, 5.0, 10.0, 15.0);
        assert!((a.overlap_fraction(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_clamped_never_negative() {
        let bounds = rect(0.0, 0.0, 100.0, 100.0);
        let r = rect(-50.0, -50.0, -10.0, -10.0);
        let c = r.clamped(&bounds);
        assert!(c.width() >= 0.0);
        assert!(c.height() >= 0.0);
        assert!(bounds.contains(&c));
    }

    #[test]
    fn test_gap_to_vertical() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(0.0, 25.0, 10.0, 30.0);
        assert!((a.gap_to(&b) - 15.0).abs() < 1e-6);
        assert_eq!(a.gap_to(&a), 0.0);
    }

    #[test]
    fn test_band_clamps_to_rect() {
        let r = rect(10.0, 100.0, 90.0, 200.0);
        let band = r.band(50.0, 150.0);
        assert_eq!(band.y0, 100.0);
        assert_eq!(band.y1, 150.0);
        assert_eq!(band.x0, 10.0);
        assert_eq!(band.x1, 90.0);
    }

    #[test]
    fn test_contains_with_tolerance() {
        let page = rect(0.0, 0.0, 612.0, 792.0);
        let slightly_out = rect(-0.4, 0.0, 612.3, 792.0);
        assert!(!page.contains(&slightly_out));
        assert!(page.contains_with_tolerance(&slightly_out, 0.5));
    }
}
