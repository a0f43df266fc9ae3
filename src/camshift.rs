//! Histogram back-projection and the continuously adaptive mean-shift search
//! that follows the probability mass from frame to frame.

use crate::config::WINDOW_TOLERANCE;
use crate::geometry::{Rect, RotatedRect};
use crate::histogram::HueHistogram;
use nalgebra as na;
use ndarray::prelude::*;
use ndarray::Zip;

/// Stop after `max_iterations` or once the window moves less than `epsilon` pixels,
/// whichever comes first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermCriteria {
    pub max_iterations: usize,
    pub epsilon: f64,
}

impl TermCriteria {
    pub fn new(max_iterations: usize, epsilon: f64) -> Self {
        Self {
            max_iterations,
            epsilon,
        }
    }
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self::new(10, 1.0)
    }
}

// ties go to the even neighbour
#[inline]
fn round_half_even(v: f64) -> i32 {
    let r = v.round();
    if (v - v.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        (r - v.signum()) as i32
    } else {
        r as i32
    }
}

/// Likelihood of every pixel belonging to the target: its hue weight from the
/// histogram, zeroed wherever `mask` rejects the pixel.
pub fn back_project(
    hue: ArrayView2<'_, u8>,
    mask: ArrayView2<'_, u8>,
    histogram: &HueHistogram,
) -> Array2<u8> {
    Zip::from(hue)
        .and(mask)
        .map_collect(|&h, &m| histogram.weight(h) & m)
}

/// Spatial moments up to second order, coordinates relative to the window origin
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
}

impl Moments {
    pub fn of(image: ArrayView2<'_, u8>, window: Rect) -> Self {
        let mut m = Moments::default();
        let roi = window & Rect::frame(image.dim().1, image.dim().0);
        if roi.is_empty() {
            return m;
        }

        let view = image.slice(s![
            roi.y as usize..roi.bottom() as usize,
            roi.x as usize..roi.right() as usize
        ]);

        // offset when the window sticks out of the image
        let (ox, oy) = ((roi.x - window.x) as f64, (roi.y - window.y) as f64);

        for ((y, x), &v) in view.indexed_iter() {
            if v == 0 {
                continue;
            }

            let w = v as f64;
            let x = x as f64 + ox;
            let y = y as f64 + oy;

            m.m00 += w;
            m.m10 += x * w;
            m.m01 += y * w;
            m.m20 += x * x * w;
            m.m11 += x * y * w;
            m.m02 += y * y * w;
        }

        m
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.m00.abs() < f64::EPSILON
    }

    #[inline]
    pub fn centroid(&self) -> na::Point2<f64> {
        na::Point2::new(self.m10 / self.m00, self.m01 / self.m00)
    }

    #[inline]
    pub fn mu20(&self) -> f64 {
        self.m20 - self.m10 * self.m10 / self.m00
    }

    #[inline]
    pub fn mu11(&self) -> f64 {
        self.m11 - self.m10 * self.m01 / self.m00
    }

    #[inline]
    pub fn mu02(&self) -> f64 {
        self.m02 - self.m01 * self.m01 / self.m00
    }
}

/// Move `window` towards the centroid of `prob` until it settles.
/// Returns the number of iterations performed.
pub fn mean_shift(prob: ArrayView2<'_, u8>, window: &mut Rect, criteria: TermCriteria) -> usize {
    let (rows, cols) = prob.dim();
    let (cols, rows) = (cols as i32, rows as i32);
    let frame = Rect::new(0, 0, cols, rows);

    let eps = (criteria.epsilon.max(0.0).powi(2)).round() as i32;
    let iterations = criteria.max_iterations.max(1);

    let half_w = window.width as f64 * 0.5;
    let half_h = window.height as f64 * 0.5;

    let mut cur = *window;
    let mut i = 0;

    while i < iterations {
        cur = cur & frame;
        if cur == Rect::default() {
            cur.x = cols / 2;
            cur.y = rows / 2;
        }
        cur.width = cur.width.max(1);
        cur.height = cur.height.max(1);

        let m = Moments::of(prob, cur);
        if m.is_empty() {
            break;
        }

        let c = m.centroid();
        let dx = round_half_even(c.x - half_w);
        let dy = round_half_even(c.y - half_h);

        let nx = (cur.x + dx).max(0).min(cols - cur.width);
        let ny = (cur.y + dy).max(0).min(rows - cur.height);

        let (dx, dy) = (nx - cur.x, ny - cur.y);
        cur.x = nx;
        cur.y = ny;

        i += 1;

        if dx * dx + dy * dy < eps {
            break;
        }
    }

    *window = cur;

    i
}

/// Mean-shift followed by an orientation fit: returns the ellipse best matching the
/// probability mass and resizes `window` to its extent for the next frame.
/// A zero-sized box means no mass was found.
pub fn cam_shift(prob: ArrayView2<'_, u8>, window: &mut Rect, criteria: TermCriteria) -> RotatedRect {
    let (rows, cols) = prob.dim();
    let (cols, rows) = (cols as i32, rows as i32);

    mean_shift(prob, window, criteria);

    window.x = (window.x - WINDOW_TOLERANCE).max(0);
    window.y = (window.y - WINDOW_TOLERANCE).max(0);

    window.width += 2 * WINDOW_TOLERANCE;
    if window.right() > cols {
        window.width = cols - window.x;
    }

    window.height += 2 * WINDOW_TOLERANCE;
    if window.bottom() > rows {
        window.height = rows - window.y;
    }

    let m = Moments::of(prob, *window);
    if m.is_empty() {
        return RotatedRect::default();
    }

    let inv_m00 = 1.0 / m.m00;
    let c = m.centroid();
    let xc = round_half_even(c.x + window.x as f64);
    let yc = round_half_even(c.y + window.y as f64);

    let (mu20, mu11, mu02) = (m.mu20(), m.mu11(), m.mu02());
    let (a, b, cc) = (mu20 * inv_m00, mu11 * inv_m00, mu02 * inv_m00);

    let square = (4.0 * b * b + (a - cc) * (a - cc)).sqrt();
    let mut theta = (2.0 * b).atan2(a - cc + square);

    let mut cs = theta.cos();
    let mut sn = theta.sin();

    let rotate_a = (cs * cs * mu20 + 2.0 * cs * sn * mu11 + sn * sn * mu02).max(0.0);
    let rotate_c = (sn * sn * mu20 - 2.0 * cs * sn * mu11 + cs * cs * mu02).max(0.0);

    let mut length = (rotate_a * inv_m00).sqrt() * 4.0;
    let mut width = (rotate_c * inv_m00).sqrt() * 4.0;

    // theta near 0 or pi/2 can leave the axes swapped
    if length < width {
        std::mem::swap(&mut length, &mut width);
        std::mem::swap(&mut cs, &mut sn);
        theta = std::f64::consts::FRAC_PI_2 - theta;
    }

    let t0 = (length * cs).abs().round() as i32;
    let t1 = (width * sn).abs().round() as i32;
    window.width = (t0.max(t1) + 2).min((cols - xc) * 2);

    let t0 = (length * sn).abs().round() as i32;
    let t1 = (width * cs).abs().round() as i32;
    window.height = (t0.max(t1) + 2).min((rows - yc) * 2);

    window.x = (xc - window.width / 2).max(0);
    window.y = (yc - window.height / 2).max(0);
    window.width = (cols - window.x).min(window.width);
    window.height = (rows - window.y).min(window.height);

    let mut angle = (std::f64::consts::FRAC_PI_2 + theta).to_degrees();
    while angle < 0.0 {
        angle += 360.0;
    }
    while angle >= 360.0 {
        angle -= 360.0;
    }
    if angle >= 180.0 {
        angle -= 180.0;
    }

    RotatedRect {
        center: na::Point2::new(
            window.x as f32 + window.width as f32 * 0.5,
            window.y as f32 + window.height as f32 * 0.5,
        ),
        width: width as f32,
        height: length as f32,
        angle: angle as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(w: usize, h: usize, rect: Rect) -> Array2<u8> {
        let mut img = Array2::zeros((h, w));
        img.slice_mut(s![
            rect.y as usize..rect.bottom() as usize,
            rect.x as usize..rect.right() as usize
        ])
        .fill(255);
        img
    }

    #[test]
    fn back_projection_respects_mask() {
        let hist = HueHistogram::seeded(15);
        let hue = Array2::from_shape_vec((1, 3), vec![175u8, 175, 20]).unwrap();
        let mask = Array2::from_shape_vec((1, 3), vec![255u8, 0, 255]).unwrap();

        let bp = back_project(hue.view(), mask.view(), &hist);
        assert_eq!(bp.as_slice().unwrap(), &[255, 0, 0]);
    }

    #[test]
    fn ties_round_to_even() {
        assert_eq!(round_half_even(4.5), 4);
        assert_eq!(round_half_even(5.5), 6);
        assert_eq!(round_half_even(-0.5), 0);
        assert_eq!(round_half_even(-1.5), -2);
        assert_eq!(round_half_even(2.4), 2);
    }

    #[test]
    fn moments_of_square() {
        let img = blob(20, 20, Rect::new(5, 5, 4, 4));
        let m = Moments::of(img.view(), Rect::new(0, 0, 20, 20));

        assert_eq!(m.m00, 16.0 * 255.0);
        let c = m.centroid();
        assert!((c.x - 6.5).abs() < 1e-9);
        assert!((c.y - 6.5).abs() < 1e-9);
        assert!((m.mu11()).abs() < 1e-6);
    }

    #[test]
    fn mean_shift_converges_on_blob() {
        let img = blob(100, 100, Rect::new(40, 40, 10, 10));
        let mut window = Rect::new(30, 30, 20, 20);

        let iters = mean_shift(img.view(), &mut window, TermCriteria::default());

        assert!(iters >= 1);
        let c = window.center();
        assert!((c.x - 45.0).abs() <= 1.0, "{:?}", window);
        assert!((c.y - 45.0).abs() <= 1.0, "{:?}", window);
    }

    #[test]
    fn mean_shift_stops_at_iteration_cap() {
        // weight rising to the right keeps pulling the window
        let img = Array2::from_shape_fn((50, 200), |(_, x)| (x + 1).min(255) as u8);
        let mut window = Rect::new(0, 0, 10, 10);

        let iters = mean_shift(img.view(), &mut window, TermCriteria::new(3, 0.0));
        assert_eq!(iters, 3);
    }

    #[test]
    fn mean_shift_without_mass_keeps_window() {
        let img = Array2::zeros((50, 50));
        let mut window = Rect::new(10, 10, 5, 5);

        let iters = mean_shift(img.view(), &mut window, TermCriteria::default());

        assert_eq!(iters, 0);
        assert_eq!(window, Rect::new(10, 10, 5, 5));
    }

    #[test]
    fn cam_shift_fits_horizontal_bar() {
        let img = blob(200, 100, Rect::new(60, 45, 60, 10));
        let mut window = Rect::new(55, 40, 70, 20);

        let rr = cam_shift(img.view(), &mut window, TermCriteria::default());

        assert!(!rr.is_degenerate());
        assert!(rr.height > rr.width, "{:?}", rr);
        // major axis along x
        assert!((rr.angle - 90.0).abs() < 1.0, "{:?}", rr);
        assert!((rr.center.x - 90.0).abs() <= 2.0, "{:?}", rr);
        assert!((rr.center.y - 50.0).abs() <= 2.0, "{:?}", rr);
        assert!(window.width > window.height);
    }

    #[test]
    fn cam_shift_fits_tilted_blob() {
        let img = Array2::from_shape_fn((120, 120), |(y, x)| {
            let (x, y) = (x as i32 - 60, y as i32 - 60);
            if (x - y).abs() <= 3 && (x + y).abs() <= 40 {
                255u8
            } else {
                0
            }
        });
        let mut window = Rect::new(45, 45, 30, 30);

        let rr = cam_shift(img.view(), &mut window, TermCriteria::default());

        assert!(rr.height > 2.0 * rr.width, "{:?}", rr);
        assert!((rr.angle - 135.0).abs() < 5.0, "{:?}", rr);
    }

    #[test]
    fn cam_shift_on_empty_image_is_degenerate() {
        let img = Array2::zeros((60, 80));
        let mut window = Rect::new(10, 10, 20, 20);

        let rr = cam_shift(img.view(), &mut window, TermCriteria::default());

        assert!(rr.is_degenerate());
        // search area widened for the next frame
        assert_eq!(window, Rect::new(0, 0, 40, 40));
    }
}
