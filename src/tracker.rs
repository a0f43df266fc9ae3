use crate::camshift::{back_project, cam_shift, TermCriteria};
use crate::config::INITIAL_WINDOW_SIZE;
use crate::error::Error;
use crate::frame::HsvFrame;
use crate::geometry::{Rect, RotatedRect};
use crate::histogram::HueHistogram;
use ndarray::prelude::*;
use tracing::debug;

/// Result of one tracking step
#[derive(Debug)]
pub struct TrackOutcome {
    pub back_projection: Array2<u8>,

    /// Geometry found this tick, `None` when the fit collapsed
    pub geometry: Option<RotatedRect>,
}

/// The object being followed: its color model, search window and last good fit
#[derive(Debug, Clone)]
pub struct Target {
    pub histogram: HueHistogram,
    pub region: Rect,
    pub geometry: Option<RotatedRect>,
    criteria: TermCriteria,
}

impl Target {
    /// Model built from the operator's selection; the search starts from the selection itself.
    pub fn select(
        hsv: &HsvFrame,
        mask: ArrayView2<'_, u8>,
        selection: Rect,
        criteria: TermCriteria,
    ) -> Result<Self, Error> {
        let histogram = HueHistogram::from_selection(hsv.hue.view(), mask, selection)?;
        debug!("histogram of {:?}: {:?}", selection, histogram.bins());

        Ok(Self {
            histogram,
            region: selection & hsv.bounds(),
            geometry: None,
            criteria,
        })
    }

    /// Model with all weight on one hue bin and a placeholder window in the
    /// top left corner; the search finds the object on its own.
    pub fn seeded(bin: usize, criteria: TermCriteria) -> Self {
        Self {
            histogram: HueHistogram::seeded(bin),
            region: Rect::new(0, 0, INITIAL_WINDOW_SIZE, INITIAL_WINDOW_SIZE),
            geometry: None,
            criteria,
        }
    }

    #[inline]
    pub fn set_criteria(&mut self, criteria: TermCriteria) {
        self.criteria = criteria;
    }

    pub fn track(&mut self, hsv: &HsvFrame, mask: ArrayView2<'_, u8>) -> TrackOutcome {
        // a collapsed window is regrown before searching from it
        if self.region.area() <= 1 {
            let inflated = inflate_region(self.region, hsv.width(), hsv.height());
            debug!("search window {:?} collapsed, inflated to {:?}", self.region, inflated);
            self.region = inflated;
        }

        let back_projection = back_project(hsv.hue.view(), mask, &self.histogram);
        let fit = cam_shift(back_projection.view(), &mut self.region, self.criteria);

        // a collapsed fit keeps the previous geometry
        let geometry = if fit.is_degenerate() {
            None
        } else {
            self.geometry = Some(fit);
            Some(fit)
        };

        TrackOutcome {
            back_projection,
            geometry,
        }
    }
}

/// Square of side ceil(min(cols, rows) / 6) around the window center,
/// pushed inside the frame and clipped to it.
pub fn inflate_region(region: Rect, cols: usize, rows: usize) -> Rect {
    let frame = Rect::frame(cols, rows);
    let short = cols.min(rows) as i32;
    if short == 0 {
        return Rect::default();
    }

    let side = ((short + 5) / 6).max(2).min(short);
    let c = region.center();

    let x = (c.x as i32 - side / 2).clamp(0, frame.width - side);
    let y = (c.y as i32 - side / 2).clamp(0, frame.height - side);

    Rect::new(x, y, side, side) & frame
}
