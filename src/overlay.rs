//! What the render surface should draw on top of a processed frame.
//! Colors, fonts and line widths belong to the surface itself.

use crate::frame::Frame;
use crate::geometry::{Rect, RotatedRect};
use crate::operator::TrackingMode;
use ndarray::prelude::*;

/// Position marker: four arms from the centroid, each stopping at the frame border
#[derive(Debug, Clone, PartialEq)]
pub struct Crosshair {
    pub center: (i32, i32),
    pub arms: [(i32, i32); 4],
    pub label: String,
    pub label_origin: (i32, i32),
}

impl Crosshair {
    pub fn new(x: i32, y: i32, radius: f64, width: usize, height: usize) -> Self {
        let (xf, yf) = (x as f64, y as f64);
        let (w, h) = (width as i32, height as i32);

        let up = if yf - radius > 0.0 {
            (x, (yf - radius) as i32)
        } else {
            (x, 0)
        };

        let down = if yf + radius < height as f64 {
            (x, (yf + radius) as i32)
        } else {
            (x, h)
        };

        let left = if xf - radius > 0.0 {
            ((xf - radius) as i32, y)
        } else {
            (0, y)
        };

        let right = if xf + radius < width as f64 {
            ((xf + radius) as i32, y)
        } else {
            (w, y)
        };

        Self {
            center: (x, y),
            arms: [up, down, left, right],
            label: format!("[{},{}]", x, y),
            label_origin: (x, (yf + radius + 20.0) as i32),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub mode: TrackingMode,

    /// Fit found on this tick, if any
    pub ellipse: Option<RotatedRect>,
    pub crosshair: Option<Crosshair>,
}

impl Overlay {
    pub fn new(mode: TrackingMode, fit: Option<RotatedRect>, width: usize, height: usize) -> Self {
        let crosshair = fit.map(|rr| {
            Crosshair::new(
                rr.center.x as i32,
                rr.center.y as i32,
                (rr.width.min(rr.height) / 2.0) as f64,
                width,
                height,
            )
        });

        Self {
            mode,
            ellipse: fit,
            crosshair,
        }
    }

    #[inline]
    pub fn status(&self) -> &'static str {
        self.mode.describe()
    }
}

/// Bitwise-invert the pixels inside `rect` to highlight an ongoing selection
pub fn invert_region(frame: &mut Frame, rect: Rect) {
    let r = rect & Rect::frame(frame.width(), frame.height());
    if r.is_empty() {
        return;
    }

    frame
        .data
        .slice_mut(s![
            r.y as usize..r.bottom() as usize,
            r.x as usize..r.right() as usize,
            ..
        ])
        .mapv_inplace(|v| !v);
}

/// Diagnostic view replacing the camera image with the likelihood map
pub fn back_projection_view(back_projection: ArrayView2<'_, u8>, timestamp: f32) -> Frame {
    Frame::from_gray(back_projection, timestamp)
}
