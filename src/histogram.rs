use crate::config::{HISTOGRAM_SIZE, HUE_RANGE};
use crate::error::Error;
use crate::geometry::Rect;
use crate::preprocess::hsv_to_bgr;
use ndarray::prelude::*;
use ndarray::Zip;

/// Hue histogram of the tracked object, bin values normalized to [0, 255]
#[derive(Debug, Clone, PartialEq)]
pub struct HueHistogram {
    bins: [f32; HISTOGRAM_SIZE],
}

#[inline(always)]
pub fn hue_bin(hue: u8) -> Option<usize> {
    let hue = hue as usize;
    if hue < HUE_RANGE {
        Some(hue * HISTOGRAM_SIZE / HUE_RANGE)
    } else {
        None
    }
}

impl HueHistogram {
    /// Histogram with all weight on a single bin
    pub fn seeded(bin: usize) -> Self {
        let mut bins = [0.0; HISTOGRAM_SIZE];
        bins[bin.min(HISTOGRAM_SIZE - 1)] = 1.0;

        Self::normalized(bins)
    }

    /// Count hues inside `selection` where `mask` is set, then rescale to peak at 255.
    pub fn from_selection(
        hue: ArrayView2<'_, u8>,
        mask: ArrayView2<'_, u8>,
        selection: Rect,
    ) -> Result<Self, Error> {
        let (h, w) = hue.dim();
        let roi = selection & Rect::frame(w, h);
        if roi.is_empty() {
            return Err(Error::EmptySelection(selection));
        }

        let window = s![
            roi.y as usize..roi.bottom() as usize,
            roi.x as usize..roi.right() as usize
        ];

        let mut bins = [0.0f32; HISTOGRAM_SIZE];
        Zip::from(hue.slice(window))
            .and(mask.slice(window))
            .for_each(|&h, &m| {
                if m != 0 {
                    if let Some(bin) = hue_bin(h) {
                        bins[bin] += 1.0;
                    }
                }
            });

        Ok(Self::normalized(bins))
    }

    /// Min-max rescale to [0, 255]; a flat histogram carries no preference and becomes all 255
    fn normalized(mut bins: [f32; HISTOGRAM_SIZE]) -> Self {
        let min = bins.iter().copied().fold(f32::MAX, f32::min);
        let max = bins.iter().copied().fold(f32::MIN, f32::max);

        if max - min > f32::EPSILON {
            let scale = 255.0 / (max - min);
            for b in bins.iter_mut() {
                *b = (*b - min) * scale;
            }
        } else {
            bins = [255.0; HISTOGRAM_SIZE];
        }

        Self { bins }
    }

    #[inline]
    pub fn bins(&self) -> &[f32; HISTOGRAM_SIZE] {
        &self.bins
    }

    /// Weight of a hue value, 0 for hues outside the histogram range
    #[inline]
    pub fn weight(&self, hue: u8) -> u8 {
        match hue_bin(hue) {
            Some(bin) => self.bins[bin].round().clamp(0.0, 255.0) as u8,
            None => 0,
        }
    }

    /// Bar chart of the bins, each bar painted with its own hue
    pub fn render(&self, width: usize, height: usize) -> Array3<u8> {
        let mut image = Array3::zeros((height, width, 3));
        let bar = width / HISTOGRAM_SIZE;

        for (i, value) in self.bins.iter().enumerate() {
            let hue = (i * HUE_RANGE / HISTOGRAM_SIZE) as u8;
            let bgr = hsv_to_bgr(hue, 255, 255);
            let bar_height = ((value * height as f32 / 255.0).round() as usize).min(height);

            let mut slot = image.slice_mut(s![height - bar_height.., i * bar..(i + 1) * bar, ..]);
            for mut px in slot.lanes_mut(Axis(2)) {
                px[0] = bgr[0];
                px[1] = bgr[1];
                px[2] = bgr[2];
            }
        }

        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planes(w: usize, h: usize, hue: u8) -> (Array2<u8>, Array2<u8>) {
        (Array2::from_elem((h, w), hue), Array2::from_elem((h, w), 255))
    }

    #[test]
    fn bins_cover_hue_range() {
        assert_eq!(hue_bin(0), Some(0));
        assert_eq!(hue_bin(11), Some(0));
        assert_eq!(hue_bin(12), Some(1));
        assert_eq!(hue_bin(179), Some(15));
        assert_eq!(hue_bin(180), None);
    }

    #[test]
    fn selection_peaks_at_255() {
        let (mut hue, mask) = planes(20, 20, 100);
        hue.slice_mut(s![0..10, ..]).fill(170);

        let hist = HueHistogram::from_selection(hue.view(), mask.view(), Rect::new(0, 0, 20, 15))
            .unwrap();

        // 200 px at hue 170 vs 100 px at hue 100
        assert_eq!(hist.bins()[15], 255.0);
        assert!((hist.bins()[8] - 127.5).abs() < 1e-3);
        assert!(hist.bins().iter().all(|b| (0.0..=255.0).contains(b)));
        assert_eq!(hist.weight(175), 255);
        assert_eq!(hist.weight(30), 0);
    }

    #[test]
    fn masked_pixels_are_ignored() {
        let (mut hue, mut mask) = planes(10, 10, 60);
        hue.slice_mut(s![.., 5..]).fill(0);
        mask.slice_mut(s![.., 5..]).fill(0);

        let hist =
            HueHistogram::from_selection(hue.view(), mask.view(), Rect::new(0, 0, 10, 10)).unwrap();

        assert_eq!(hist.bins()[5], 255.0);
        assert_eq!(hist.bins()[0], 0.0);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let (hue, mask) = planes(10, 10, 60);

        let res = HueHistogram::from_selection(hue.view(), mask.view(), Rect::new(3, 3, 0, 5));
        assert!(matches!(res, Err(Error::EmptySelection(_))));

        let res = HueHistogram::from_selection(hue.view(), mask.view(), Rect::new(50, 50, 5, 5));
        assert!(matches!(res, Err(Error::EmptySelection(_))));
    }

    #[test]
    fn fully_masked_selection_is_flat() {
        let (hue, _) = planes(10, 10, 60);
        let mask = Array2::zeros((10, 10));

        let hist =
            HueHistogram::from_selection(hue.view(), mask.view(), Rect::new(0, 0, 4, 4)).unwrap();
        assert!(hist.bins().iter().all(|&b| b == 255.0));
    }

    #[test]
    fn seeded_red() {
        let hist = HueHistogram::seeded(15);

        assert_eq!(hist.bins()[15], 255.0);
        assert_eq!(hist.bins().iter().filter(|&&b| b > 0.0).count(), 1);
    }

    #[test]
    fn render_draws_full_bar() {
        let hist = HueHistogram::seeded(0);
        let image = hist.render(320, 200);

        assert_eq!(image.dim(), (200, 320, 3));
        // red bar in the first slot, nothing in the second
        assert_eq!(image[[0, 0, 2]], 255);
        assert_eq!(image[[199, 25, 2]], 0);
    }
}
