//! OpenCV-backed capture, recording and HighGUI windows.

use crate::config::TrackerConfig;
use crate::error::Error;
use crate::frame::Frame;
use crate::histogram::HueHistogram;
use crate::operator::{Command, InputEvent, PointerEvent};
use crate::overlay::Overlay;
use crate::video::{Display, VideoSink, VideoSource};
use opencv::{
    core::{self, Mat, Scalar},
    highgui, imgproc,
    prelude::*,
    videoio,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

pub const MAIN_WINDOW: &str = "buoytrack";
pub const HISTOGRAM_WINDOW: &str = "Histogram";
pub const HISTOGRAM_SIZE: (usize, usize) = (320, 200);

const LOCATION_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);
const STATUS_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
const LINE_THICKNESS: i32 = 1;

const TRACKBAR_SMIN: &str = "Smin";
const TRACKBAR_SMAX: &str = "Smax";
const TRACKBAR_VMIN: &str = "Vmin";
const TRACKBAR_VMAX: &str = "Vmax";
const TRACKBAR_BLUR: &str = "Blur";

#[inline]
fn color(c: (f64, f64, f64)) -> Scalar {
    Scalar::new(c.0, c.1, c.2, 0.0)
}

pub fn mat_to_frame(mat: &Mat, timestamp: f32) -> Result<Frame, Error> {
    let (width, height) = (mat.cols() as usize, mat.rows() as usize);
    let bytes = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };

    Frame::from_bgr_bytes(width, height, bytes, timestamp)
}

pub fn frame_to_mat(frame: &Frame) -> Result<Mat, Error> {
    let bytes = frame.to_bgr_bytes();
    let flat = Mat::from_slice(&bytes)?;
    let mat = flat.reshape(3, frame.height() as i32)?.try_clone()?;

    Ok(mat)
}

pub struct CaptureSource {
    cap: videoio::VideoCapture,
    mat: Mat,
}

impl CaptureSource {
    /// A source that parses as an integer is a camera index, anything else a file or URL
    pub fn open(source: &str) -> Result<Self, Error> {
        let cap = match source.parse::<i32>() {
            Ok(index) => videoio::VideoCapture::new(index, videoio::CAP_ANY)?,
            Err(_) => videoio::VideoCapture::from_file(source, videoio::CAP_ANY)?,
        };

        if !videoio::VideoCapture::is_opened(&cap)? {
            return Err(Error::SourceUnavailable(source.to_string()));
        }

        info!("opened video source {}", source);

        Ok(Self {
            cap,
            mat: Mat::default(),
        })
    }
}

impl VideoSource for CaptureSource {
    fn read(&mut self) -> Result<Option<Frame>, Error> {
        if !self.cap.read(&mut self.mat)? || self.mat.empty() {
            return Ok(None);
        }

        let timestamp = (self.cap.get(videoio::CAP_PROP_POS_MSEC)? / 1000.0) as f32;

        Ok(Some(mat_to_frame(&self.mat, timestamp)?))
    }

    fn fps(&self) -> f64 {
        self.cap.get(videoio::CAP_PROP_FPS).unwrap_or(0.0)
    }

    fn frame_size(&self) -> Option<(usize, usize)> {
        let w = self.cap.get(videoio::CAP_PROP_FRAME_WIDTH).ok()?;
        let h = self.cap.get(videoio::CAP_PROP_FRAME_HEIGHT).ok()?;

        if w > 0.0 && h > 0.0 {
            Some((w as usize, h as usize))
        } else {
            None
        }
    }
}

/// XVID recording, opened on the first frame so it gets the processing resolution
pub struct Recorder {
    writer: Option<videoio::VideoWriter>,
    size: Option<(i32, i32)>,
    out_file: String,
    fps: f64,
}

impl Recorder {
    pub fn new<S: ToString>(out_file: S, fps: f64) -> Self {
        Self {
            writer: None,
            size: None,
            out_file: out_file.to_string(),
            fps,
        }
    }

    fn reinit(&mut self, size: (i32, i32)) -> Result<(), Error> {
        self.release()?;
        debug!("recording {}x{} at {:.2} fps to {}", size.0, size.1, self.fps, self.out_file);

        self.size = Some(size);
        self.writer = Some(videoio::VideoWriter::new(
            &self.out_file,
            videoio::VideoWriter::fourcc(b'X' as _, b'V' as _, b'I' as _, b'D' as _)?,
            self.fps,
            core::Size::new(size.0, size.1),
            true,
        )?);

        Ok(())
    }
}

impl VideoSink for Recorder {
    fn write(&mut self, frame: &Frame) -> Result<(), Error> {
        let size = (frame.width() as i32, frame.height() as i32);

        if self.writer.is_none() || self.size != Some(size) {
            self.reinit(size)?;
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write(&frame_to_mat(frame)?)?;
        }

        Ok(())
    }

    fn release(&mut self) -> Result<(), Error> {
        if let Some(mut w) = self.writer.take() {
            w.release()?;
        }

        Ok(())
    }
}

pub struct HighGui {
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl HighGui {
    pub fn new(config: &TrackerConfig) -> Result<Self, Error> {
        highgui::named_window(MAIN_WINDOW, highgui::WINDOW_AUTOSIZE)?;
        highgui::named_window(HISTOGRAM_WINDOW, highgui::WINDOW_AUTOSIZE)?;

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        highgui::set_mouse_callback(
            MAIN_WINDOW,
            Some(Box::new(move |event, x, y, _flags| {
                let ev = match event {
                    highgui::EVENT_RBUTTONDOWN => PointerEvent::Press { x, y },
                    highgui::EVENT_MOUSEMOVE => PointerEvent::Drag { x, y },
                    highgui::EVENT_RBUTTONUP => PointerEvent::Release { x, y },
                    _ => return,
                };

                if let Ok(mut queue) = sink.lock() {
                    queue.push(ev.into());
                }
            })),
        )?;

        for (name, max, pos) in [
            (TRACKBAR_SMIN, 255, config.saturation_min as i32),
            (TRACKBAR_SMAX, 255, config.saturation_max as i32),
            (TRACKBAR_VMIN, 255, config.value_min as i32),
            (TRACKBAR_VMAX, 255, config.value_max as i32),
            (TRACKBAR_BLUR, 50, config.blur_kernel_size as i32),
        ] {
            highgui::create_trackbar(name, MAIN_WINDOW, None, max, None)?;
            highgui::set_trackbar_pos(name, MAIN_WINDOW, pos)?;
        }

        Ok(Self { events })
    }
}

impl Display for HighGui {
    fn annotate(&mut self, frame: &mut Frame, overlay: &Overlay) -> Result<(), Error> {
        let mut mat = frame_to_mat(frame)?;

        if let Some(rr) = overlay.ellipse {
            let rect = core::RotatedRect::new(
                core::Point2f::new(rr.center.x, rr.center.y),
                core::Size2f::new(rr.width, rr.height),
                rr.angle,
            )?;

            imgproc::ellipse_rotated_rect(
                &mut mat,
                &rect,
                color(LOCATION_COLOR),
                LINE_THICKNESS,
                imgproc::LINE_AA,
            )?;
        }

        if let Some(ch) = overlay.crosshair.as_ref() {
            let center = core::Point::new(ch.center.0, ch.center.1);

            for (x, y) in ch.arms {
                imgproc::line(
                    &mut mat,
                    center,
                    core::Point::new(x, y),
                    color(LOCATION_COLOR),
                    LINE_THICKNESS,
                    imgproc::LINE_8,
                    0,
                )?;
            }

            imgproc::put_text(
                &mut mat,
                &ch.label,
                core::Point::new(ch.label_origin.0, ch.label_origin.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                0.5,
                color(LOCATION_COLOR),
                LINE_THICKNESS,
                imgproc::LINE_AA,
                false,
            )?;
        }

        imgproc::put_text(
            &mut mat,
            overlay.status(),
            core::Point::new(50, 50),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            color(STATUS_COLOR),
            LINE_THICKNESS,
            imgproc::LINE_AA,
            false,
        )?;

        *frame = mat_to_frame(&mat, frame.timestamp)?;

        Ok(())
    }

    fn show(&mut self, frame: &Frame) -> Result<(), Error> {
        highgui::imshow(MAIN_WINDOW, &frame_to_mat(frame)?)?;
        Ok(())
    }

    fn show_histogram(&mut self, histogram: &HueHistogram) -> Result<(), Error> {
        let (w, h) = HISTOGRAM_SIZE;
        let image = Frame::new(histogram.render(w, h), 0.0);

        highgui::imshow(HISTOGRAM_WINDOW, &frame_to_mat(&image)?)?;
        Ok(())
    }

    fn poll(&mut self, wait: Duration) -> Result<Vec<InputEvent>, Error> {
        let key = highgui::wait_key(wait.as_millis().max(1) as i32)?;

        let mut events = match self.events.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(_) => Vec::new(),
        };

        if let Some(cmd) = Command::from_key(key & 0xff) {
            events.push(cmd.into());
        }

        Ok(events)
    }

    fn sync_config(&mut self, config: &mut TrackerConfig) -> Result<(), Error> {
        let pos = |name| -> Result<u8, Error> {
            Ok(highgui::get_trackbar_pos(name, MAIN_WINDOW)?.clamp(0, 255) as u8)
        };

        config.saturation_min = pos(TRACKBAR_SMIN)?;
        config.saturation_max = pos(TRACKBAR_SMAX)?;
        config.value_min = pos(TRACKBAR_VMIN)?;
        config.value_max = pos(TRACKBAR_VMAX)?;
        config.set_blur_kernel_size(highgui::get_trackbar_pos(TRACKBAR_BLUR, MAIN_WINDOW)?.max(1) as u32);

        Ok(())
    }
}

impl Drop for HighGui {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}
