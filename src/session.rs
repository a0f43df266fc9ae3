//! The frame loop: one frame is read, preprocessed, tracked, rendered,
//! recorded and logged before the next one is pulled.

use crate::camshift::TermCriteria;
use crate::config::TrackerConfig;
use crate::error::Error;
use crate::frame::Frame;
use crate::geometry::RotatedRect;
use crate::history::LocationHistory;
use crate::log_writer::{Record, SessionLog};
use crate::operator::{InputEvent, Operator, TrackingMode};
use crate::overlay::{back_projection_view, invert_region, Overlay};
use crate::preprocess::{saturation_value_mask, Preprocessor};
use crate::tracker::Target;
use crate::video::{Display, VideoSink, VideoSource};
use chrono::Local;
use nalgebra as na;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Quit,
    EmptyStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Terminate(Termination),
}

impl Tick {
    /// 0 to keep going, -1 to stop
    pub fn code(&self) -> i32 {
        match self {
            Tick::Continue => 0,
            Tick::Terminate(_) => -1,
        }
    }
}

pub struct Session<S: VideoSource> {
    source: S,
    config: TrackerConfig,
    preprocessor: Preprocessor,
    operator: Operator,
    target: Option<Target>,
    history: LocationHistory,

    display: Option<Box<dyn Display>>,
    sink: Option<Box<dyn VideoSink>>,
    log: Option<SessionLog<Box<dyn Write>>>,

    // last frame read, at processing resolution
    current: Option<Frame>,
    empty_frames: usize,

    center: na::Point2<i32>,
    size: (f32, f32),
}

impl<S: VideoSource> Session<S> {
    pub fn new(source: S, mut config: TrackerConfig) -> Self {
        config.normalize();

        let criteria = TermCriteria::new(config.max_iterations, config.epsilon);
        let (target, mode) = match config.seed_hue_bin {
            Some(bin) => (Some(Target::seeded(bin, criteria)), TrackingMode::Tracking),
            None => (None, TrackingMode::Idle),
        };

        let mut operator = Operator::new(mode);
        let preprocessor = match source.frame_size() {
            Some((w, h)) => {
                let pre = Preprocessor::with_source_size(w, h, config.processing_height_limit);
                if let Some(size) = pre.size() {
                    operator.set_bounds(size.width, size.height);
                }
                pre
            }
            None => Preprocessor::new(),
        };

        Self {
            source,
            history: LocationHistory::new(config.history_size),
            config,
            preprocessor,
            operator,
            target,
            display: None,
            sink: None,
            log: None,
            current: None,
            empty_frames: 0,
            center: na::Point2::new(0, 0),
            size: (0.0, 0.0),
        }
    }

    pub fn set_display(&mut self, display: Box<dyn Display>) {
        self.display = Some(display);
    }

    pub fn set_sink(&mut self, sink: Box<dyn VideoSink>) {
        self.sink = Some(sink);
    }

    pub fn set_log(&mut self, log: SessionLog<Box<dyn Write>>) {
        self.log = Some(log);
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut TrackerConfig {
        &mut self.config
    }

    #[inline]
    pub fn mode(&self) -> TrackingMode {
        self.operator.mode()
    }

    #[inline]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    #[inline]
    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    #[inline]
    pub fn history(&self) -> &LocationHistory {
        &self.history
    }

    #[inline]
    pub fn empty_frames(&self) -> usize {
        self.empty_frames
    }

    /// Centroid of the last good fit
    #[inline]
    pub fn center(&self) -> na::Point2<i32> {
        self.center
    }

    /// (height, width) of the last good fit
    #[inline]
    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    /// Feed an input event directly, bypassing the display
    pub fn handle(&mut self, event: InputEvent) {
        self.operator.handle(event);
    }

    pub fn tick(&mut self) -> Result<Tick, Error> {
        if let Some(display) = self.display.as_mut() {
            display.sync_config(&mut self.config)?;
            self.config.normalize();
        }

        let history_size = self.config.history_size.max(1);
        if history_size != self.history.capacity() {
            debug!("history resized to {}", history_size);
            self.history.resize(history_size);
        }

        let mut frame = if self.operator.is_frozen() {
            match self.current.clone() {
                Some(frame) => frame,
                None => return self.poll_input(),
            }
        } else {
            let read = self.source.read().unwrap_or_else(|err| {
                warn!("read failed: {}", err);
                None
            });

            match read {
                Some(frame) if !frame.is_empty() => {
                    if self.empty_frames > 0 {
                        debug!("stream back after {} empty frames", self.empty_frames);
                    }
                    self.empty_frames = 0;
                    frame
                }
                _ => {
                    self.empty_frames += 1;
                    if self.empty_frames >= self.config.empty_frame_limit {
                        warn!("{} consecutive empty frames", self.empty_frames);
                        return Ok(Tick::Terminate(Termination::EmptyStream));
                    }

                    return self.poll_input();
                }
            }
        };

        let hsv = self.preprocessor.process(&mut frame, &self.config)?;
        self.operator.set_bounds(frame.width(), frame.height());
        self.current = Some(frame.clone());

        let mask = saturation_value_mask(&hsv, &self.config);
        let criteria = TermCriteria::new(self.config.max_iterations, self.config.epsilon);

        if let Some(pending) = self.operator.take_pending() {
            match Target::select(&hsv, mask.view(), pending.rect, criteria) {
                Ok(target) => {
                    info!("tracking {:?}", target.region);
                    if let Some(display) = self.display.as_mut() {
                        display.show_histogram(&target.histogram)?;
                    }
                    self.target = Some(target);
                }
                Err(err) => {
                    warn!("selection rejected: {}", err);
                    self.operator.abandon_selection();
                }
            }
        }

        let mut fit: Option<RotatedRect> = None;

        if self.operator.mode() == TrackingMode::Tracking {
            if let Some(target) = self.target.as_mut() {
                target.set_criteria(criteria);
                let outcome = target.track(&hsv, mask.view());

                if self.operator.show_back_projection() {
                    frame = back_projection_view(outcome.back_projection.view(), frame.timestamp);
                }

                fit = outcome.geometry;
            }
        }

        if let Some(g) = fit {
            self.center = na::Point2::new(g.center.x as i32, g.center.y as i32);
            self.size = (g.height, g.width);
            self.history.push(self.center);
        }

        if let Some(selection) = self.operator.selection() {
            invert_region(&mut frame, selection);
        }

        let overlay = Overlay::new(self.operator.mode(), fit, frame.width(), frame.height());

        if let Some(display) = self.display.as_mut() {
            display.annotate(&mut frame, &overlay)?;
            display.show(&frame)?;
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.write(&frame)?;
        }

        if let Some(log) = self.log.as_mut() {
            log.append(&Record {
                time: Local::now(),
                center: self.center,
                height: self.size.0,
                width: self.size.1,
                status: self.operator.mode().code(),
            })?;
        }

        self.poll_input()
    }

    fn poll_input(&mut self) -> Result<Tick, Error> {
        if let Some(display) = self.display.as_mut() {
            let wait = Duration::from_millis(self.config.input_wait_ms);
            for event in display.poll(wait)? {
                self.operator.handle(event);
            }
        }

        if self.operator.quit_requested() {
            info!("quit requested");
            return Ok(Tick::Terminate(Termination::Quit));
        }

        Ok(Tick::Continue)
    }

    /// Tick until told to stop, then flush the log and close the recording.
    /// Both are closed on an error exit too.
    pub fn run(&mut self) -> Result<Termination, Error> {
        let result = loop {
            match self.tick() {
                Ok(Tick::Continue) => {}
                Ok(Tick::Terminate(reason)) => break Ok(reason),
                Err(err) => break Err(err),
            }
        };

        match &result {
            Ok(reason) => info!("session finished: {:?}", reason),
            Err(err) => warn!("session aborted: {}", err),
        }

        let closed = self.shutdown();
        let reason = result?;
        closed?;

        Ok(reason)
    }

    pub fn shutdown(&mut self) -> Result<(), Error> {
        let flushed = match self.log.as_mut() {
            Some(log) => log.flush(),
            None => Ok(()),
        };

        if let Some(sink) = self.sink.as_mut() {
            sink.release()?;
        }

        flushed
    }
}
