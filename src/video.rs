use crate::config::{TrackerConfig, FPS_SAMPLE_FRAMES, MAX_FPS};
use crate::error::Error;
use crate::frame::Frame;
use crate::histogram::HueHistogram;
use crate::operator::InputEvent;
use crate::overlay::Overlay;
use std::time::{Duration, Instant};
use tracing::info;

pub trait VideoSource {
    /// Next frame in sequence, `None` when the read came back empty
    fn read(&mut self) -> Result<Option<Frame>, Error>;

    /// Frame rate reported by the backend, 0 when it cannot tell
    fn fps(&self) -> f64;

    /// Native (width, height) if known before the first read
    fn frame_size(&self) -> Option<(usize, usize)>;
}

pub trait VideoSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Error>;

    fn release(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Render surface plus the operator's pointer and keyboard
pub trait Display {
    /// Draw the overlay into the frame; the annotated frame is also what gets recorded
    fn annotate(&mut self, frame: &mut Frame, overlay: &Overlay) -> Result<(), Error>;

    fn show(&mut self, frame: &Frame) -> Result<(), Error>;

    fn show_histogram(&mut self, _histogram: &HueHistogram) -> Result<(), Error> {
        Ok(())
    }

    /// Wait up to `wait` for input and return everything that arrived
    fn poll(&mut self, wait: Duration) -> Result<Vec<InputEvent>, Error>;

    /// Copy control widget positions into the configuration
    fn sync_config(&mut self, _config: &mut TrackerConfig) -> Result<(), Error> {
        Ok(())
    }
}

/// Frame rate of `source`; streams that report 0 are timed over a fixed number of reads.
pub fn estimate_fps<S: VideoSource + ?Sized>(source: &mut S) -> Result<f64, Error> {
    let reported = source.fps();
    if reported > 0.0 {
        return Ok(reported);
    }

    let begin = Instant::now();
    for _ in 0..FPS_SAMPLE_FRAMES {
        source.read()?;
    }

    let fps = sampled_fps(FPS_SAMPLE_FRAMES, begin.elapsed());
    info!("source reports no frame rate, measured {:.2} fps", fps);

    Ok(fps)
}

pub fn sampled_fps(frames: usize, elapsed: Duration) -> f64 {
    let fps = frames as f64 / elapsed.as_secs_f64();

    if fps.is_finite() {
        fps.min(MAX_FPS)
    } else {
        MAX_FPS
    }
}
