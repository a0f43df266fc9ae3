use crate::error::Error;
use crate::geometry::Rect;
use ndarray::prelude::*;

/// One video frame, pixels stored row-major as (height, width, [b, g, r])
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Array3<u8>,
    pub timestamp: f32, // in seconds
}

impl Frame {
    #[inline]
    pub fn new(data: Array3<u8>, timestamp: f32) -> Self {
        Self { data, timestamp }
    }

    pub fn from_bgr_bytes(
        width: usize,
        height: usize,
        bytes: Vec<u8>,
        timestamp: f32,
    ) -> Result<Self, Error> {
        let len = bytes.len();
        let data = Array3::from_shape_vec((height, width, 3), bytes)
            .map_err(|_| Error::FrameShape { width, height, len })?;

        Ok(Self { data, timestamp })
    }

    /// Uniformly colored frame
    pub fn filled(width: usize, height: usize, bgr: [u8; 3]) -> Self {
        let data = Array3::from_shape_fn((height, width, 3), |(_, _, c)| bgr[c]);

        Self {
            data,
            timestamp: 0.0,
        }
    }

    /// Three gray channels built from a single plane
    pub fn from_gray(plane: ArrayView2<'_, u8>, timestamp: f32) -> Self {
        let (h, w) = plane.dim();
        let data = Array3::from_shape_fn((h, w, 3), |(y, x, _)| plane[[y, x]]);

        Self { data, timestamp }
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        [
            self.data[[y, x, 0]],
            self.data[[y, x, 1]],
            self.data[[y, x, 2]],
        ]
    }

    /// Paint a rectangle, clipped to the frame
    pub fn fill_rect(&mut self, rect: Rect, bgr: [u8; 3]) {
        let r = rect & Rect::frame(self.width(), self.height());
        if r.is_empty() {
            return;
        }

        let mut roi = self.data.slice_mut(s![
            r.y as usize..r.bottom() as usize,
            r.x as usize..r.right() as usize,
            ..
        ]);

        for mut px in roi.lanes_mut(Axis(2)) {
            px[0] = bgr[0];
            px[1] = bgr[1];
            px[2] = bgr[2];
        }
    }

    /// Contiguous BGR bytes, e.g. for handing over to a video backend
    pub fn to_bgr_bytes(&self) -> Vec<u8> {
        self.data.iter().copied().collect()
    }
}

/// Hue/saturation/value planes of a preprocessed frame
#[derive(Debug, Clone)]
pub struct HsvFrame {
    pub hue: Array2<u8>,
    pub saturation: Array2<u8>,
    pub value: Array2<u8>,
}

impl HsvFrame {
    #[inline(always)]
    pub fn width(&self) -> usize {
        self.hue.dim().1
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.hue.dim().0
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::frame(self.width(), self.height())
    }
}
