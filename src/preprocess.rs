//! Per-frame preparation: downscaling to the processing resolution, Gaussian
//! blur, BGR to HSV conversion and value equalization.

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::frame::{Frame, HsvFrame};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use imageproc::{contrast, filter};
use ndarray::prelude::*;
use ndarray::Zip;
use tracing::info;

/// Resolution every frame is processed at, fixed by the first frame seen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingSize {
    pub width: usize,
    pub height: usize,
    pub ratio: f64,
}

impl ProcessingSize {
    pub fn new(width: usize, height: usize, height_limit: usize) -> Self {
        if height > height_limit {
            let ratio = height_limit as f64 / height as f64;

            Self {
                width: (width as f64 * ratio) as usize,
                height: height_limit,
                ratio,
            }
        } else {
            Self {
                width,
                height,
                ratio: 1.0,
            }
        }
    }

    #[inline]
    pub fn needs_resize(&self, width: usize, height: usize) -> bool {
        self.width != width || self.height != height
    }
}

#[derive(Debug, Default)]
pub struct Preprocessor {
    size: Option<ProcessingSize>,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self { size: None }
    }

    /// Fix the processing resolution up front, e.g. from the native size the source reports
    pub fn with_source_size(width: usize, height: usize, height_limit: usize) -> Self {
        Self {
            size: Some(ProcessingSize::new(width, height, height_limit)),
        }
    }

    #[inline]
    pub fn size(&self) -> Option<ProcessingSize> {
        self.size
    }

    /// Bring `frame` to the processing resolution in place and return its
    /// blurred, equalized HSV planes.
    pub fn process(&mut self, frame: &mut Frame, config: &TrackerConfig) -> Result<HsvFrame, Error> {
        let size = match self.size {
            Some(size) => size,
            None => {
                let size = ProcessingSize::new(
                    frame.width(),
                    frame.height(),
                    config.processing_height_limit,
                );
                info!(
                    "processing at {}x{} (ratio {:.3})",
                    size.width, size.height, size.ratio
                );
                self.size = Some(size);
                size
            }
        };

        if size.needs_resize(frame.width(), frame.height()) {
            frame.data = resize(frame.data.view(), size.width, size.height)?;
        }

        let blurred = gaussian_blur(frame.data.view(), config.blur_kernel_size)?;
        let mut hsv = bgr_to_hsv(blurred.view());
        equalize_hist(&mut hsv.value)?;

        Ok(hsv)
    }
}

/// Pixels whose saturation and value are inside the configured bounds get 255, others 0.
/// Hue is not thresholded.
pub fn saturation_value_mask(hsv: &HsvFrame, config: &TrackerConfig) -> Array2<u8> {
    let s_range = config.saturation_min..=config.saturation_max;
    let v_range = config.value_min..=config.value_max;

    Zip::from(&hsv.saturation)
        .and(&hsv.value)
        .map_collect(|s, v| {
            if s_range.contains(s) && v_range.contains(v) {
                255
            } else {
                0
            }
        })
}

fn to_image(data: ArrayView3<'_, u8>) -> Result<RgbImage, Error> {
    let (h, w, _) = data.dim();
    let bytes: Vec<u8> = data.iter().copied().collect();
    let len = bytes.len();

    RgbImage::from_raw(w as u32, h as u32, bytes).ok_or(Error::FrameShape {
        width: w,
        height: h,
        len,
    })
}

fn from_image(image: RgbImage) -> Result<Array3<u8>, Error> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let bytes = image.into_raw();
    let len = bytes.len();

    Array3::from_shape_vec((h, w, 3), bytes).map_err(|_| Error::FrameShape {
        width: w,
        height: h,
        len,
    })
}

/// Lanczos resampling to `width` x `height`
pub fn resize(src: ArrayView3<'_, u8>, width: usize, height: usize) -> Result<Array3<u8>, Error> {
    let image = to_image(src)?;
    let resized = imageops::resize(&image, width as u32, height as u32, FilterType::Lanczos3);

    from_image(resized)
}

/// Sigma of a Gaussian kernel of the given size; even sizes count as the next odd one
pub fn blur_sigma(kernel_size: u32) -> f32 {
    let k = (kernel_size | 1) as f32;
    0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn gaussian_blur(src: ArrayView3<'_, u8>, kernel_size: u32) -> Result<Array3<u8>, Error> {
    if (kernel_size | 1) <= 1 || src.is_empty() {
        return Ok(src.to_owned());
    }

    let blurred = filter::gaussian_blur_f32(&to_image(src)?, blur_sigma(kernel_size));

    from_image(blurred)
}

/// Histogram equalization of a single plane, in place
pub fn equalize_hist(plane: &mut Array2<u8>) -> Result<(), Error> {
    let (h, w) = plane.dim();
    let bytes: Vec<u8> = plane.iter().copied().collect();
    let len = bytes.len();
    let shape_err = || Error::FrameShape {
        width: w,
        height: h,
        len,
    };

    let gray = GrayImage::from_raw(w as u32, h as u32, bytes).ok_or_else(shape_err)?;
    let equalized = contrast::equalize_histogram(&gray);

    *plane = Array2::from_shape_vec((h, w), equalized.into_raw()).map_err(|_| shape_err())?;

    Ok(())
}

#[inline(always)]
fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// 8-bit HSV of a single pixel: hue in [0, 180), saturation and value in [0, 255]
pub fn hsv_pixel(b: u8, g: u8, r: u8) -> (u8, u8, u8) {
    let (bf, gf, rf) = (b as f32, g as f32, r as f32);
    let v = bf.max(gf).max(rf);
    let diff = v - bf.min(gf).min(rf);

    let s = if v > 0.0 { 255.0 * diff / v } else { 0.0 };

    let mut hue = if diff == 0.0 {
        0.0
    } else if v == rf {
        60.0 * (gf - bf) / diff
    } else if v == gf {
        120.0 + 60.0 * (bf - rf) / diff
    } else {
        240.0 + 60.0 * (rf - gf) / diff
    };

    if hue < 0.0 {
        hue += 360.0;
    }

    let mut h = (hue * 0.5).round() as u32;
    if h >= 180 {
        h -= 180;
    }

    (h as u8, saturate(s), v as u8)
}

/// Inverse of [`hsv_pixel`], returns [b, g, r]
pub fn hsv_to_bgr(h: u8, s: u8, v: u8) -> [u8; 3] {
    let sector = h as f32 * 2.0 / 60.0;
    let s = s as f32 / 255.0;
    let v = v as f32;

    let i = sector.floor();
    let f = sector - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i as i32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    [saturate(b), saturate(g), saturate(r)]
}

pub fn bgr_to_hsv(src: ArrayView3<'_, u8>) -> HsvFrame {
    let (h, w, _) = src.dim();
    let mut hue = Array2::zeros((h, w));
    let mut saturation = Array2::zeros((h, w));
    let mut value = Array2::zeros((h, w));

    Zip::from(&mut hue)
        .and(&mut saturation)
        .and(&mut value)
        .and(src.lanes(Axis(2)))
        .for_each(|hh, ss, vv, px| {
            let (a, b, c) = hsv_pixel(px[0], px[1], px[2]);
            *hh = a;
            *ss = b;
            *vv = c;
        });

    HsvFrame {
        hue,
        saturation,
        value,
    }
}
