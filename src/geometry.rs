use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::ops::BitAnd;

/// Axis-aligned rectangle in processing-resolution pixels, left-top-width-height format
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box spanned between two corner points, in any order
    #[inline]
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            width: (a.0 - b.0).abs(),
            height: (a.1 - b.1).abs(),
        }
    }

    /// Whole frame of the given dimensions
    #[inline]
    pub fn frame(width: usize, height: usize) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    #[inline(always)]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline(always)]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            self.x as f32 + self.width as f32 * 0.5,
            self.y as f32 + self.height as f32 * 0.5,
        )
    }

    /// Overlap of two rectangles; an empty overlap collapses to the zero rectangle
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 <= x1 || y2 <= y1 {
            Rect::default()
        } else {
            Rect::new(x1, y1, x2 - x1, y2 - y1)
        }
    }
}

impl BitAnd for Rect {
    type Output = Rect;

    #[inline]
    fn bitand(self, rhs: Rect) -> Rect {
        self.intersect(&rhs)
    }
}

/// Oriented box: center, full axis lengths and rotation in degrees within [0, 180)
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RotatedRect {
    pub center: na::Point2<f32>,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl Default for RotatedRect {
    fn default() -> Self {
        Self {
            center: na::Point2::new(0.0, 0.0),
            width: 0.0,
            height: 0.0,
            angle: 0.0,
        }
    }
}

impl RotatedRect {
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// The four corners, clockwise from the bottom-left in image coordinates
    pub fn points(&self) -> [na::Point2<f32>; 4] {
        let rad = self.angle.to_radians();
        let (sn, cs) = (rad.sin() * 0.5, rad.cos() * 0.5);

        let c = self.center;
        let p0 = na::Point2::new(
            c.x - sn * self.height - cs * self.width,
            c.y + cs * self.height - sn * self.width,
        );
        let p1 = na::Point2::new(
            c.x + sn * self.height - cs * self.width,
            c.y - cs * self.height - sn * self.width,
        );
        let p2 = na::Point2::new(2.0 * c.x - p0.x, 2.0 * c.y - p0.y);
        let p3 = na::Point2::new(2.0 * c.x - p1.x, 2.0 * c.y - p1.y);

        [p0, p1, p2, p3]
    }

    /// Smallest integer rectangle containing all four corners
    pub fn bounding_rect(&self) -> Rect {
        let pts = self.points();
        let (mut l, mut t) = (f32::MAX, f32::MAX);
        let (mut r, mut b) = (f32::MIN, f32::MIN);

        for p in &pts {
            l = l.min(p.x);
            t = t.min(p.y);
            r = r.max(p.x);
            b = b.max(p.y);
        }

        let x = l.floor() as i32;
        let y = t.floor() as i32;

        Rect::new(x, y, r.ceil() as i32 - x + 1, b.ceil() as i32 - y + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_in_any_order() {
        let r = Rect::from_corners((30, 10), (5, 40));
        assert_eq!(r, Rect::new(5, 10, 25, 30));
        assert_eq!(r.area(), 750);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 5, 5);

        assert_eq!(a & b, Rect::default());
        assert!((a & b).is_empty());
    }

    #[test]
    fn intersection_clips_to_frame() {
        let frame = Rect::frame(100, 50);
        let r = Rect::new(-10, 40, 30, 30) & frame;

        assert_eq!(r, Rect::new(0, 40, 20, 10));
    }

    #[test]
    fn negative_extent_has_no_area() {
        assert_eq!(Rect::new(5, 5, -3, 4).area(), 0);
    }

    #[test]
    fn upright_box_bounds() {
        let rr = RotatedRect {
            center: na::Point2::new(50.0, 40.0),
            width: 20.0,
            height: 10.0,
            angle: 0.0,
        };

        let b = rr.bounding_rect();
        assert_eq!((b.x, b.y), (40, 35));
        assert_eq!((b.width, b.height), (21, 11));
        assert!(!rr.is_degenerate());
    }

    #[test]
    fn zero_axis_is_degenerate() {
        let rr = RotatedRect {
            width: 12.0,
            ..Default::default()
        };

        assert!(rr.is_degenerate());
    }
}
