//! Operator-driven tracking modes: selecting a target with a pointer drag,
//! pausing, cancelling and quitting.

use crate::geometry::Rect;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    /// No target, frames are only shown
    Idle,
    /// Operator is dragging a selection rectangle
    Selecting,
    /// The tracker runs on every frame
    Tracking,
    /// No new frames are read and the tracker is suspended
    Paused,
}

impl TrackingMode {
    /// Status code written to the session log
    pub fn code(&self) -> i32 {
        match self {
            TrackingMode::Idle => 0,
            TrackingMode::Selecting => 1,
            TrackingMode::Tracking => 2,
            TrackingMode::Paused => 3,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            TrackingMode::Idle => "Select the target.",
            TrackingMode::Selecting => "Selecting target.",
            TrackingMode::Tracking => "Tracking target.",
            TrackingMode::Paused => "Paused.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    Press { x: i32, y: i32 },
    Drag { x: i32, y: i32 },
    Release { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    CancelTracking,
    ToggleBackProjection,
    Quit,
}

impl Command {
    pub fn from_key(key: i32) -> Option<Self> {
        match key {
            /*  p  */ 112 => Some(Command::Pause),
            /*  c  */ 99 => Some(Command::CancelTracking),
            /*  b  */ 98 => Some(Command::ToggleBackProjection),
            /* esc */ 27 | /* q */ 113 => Some(Command::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Pointer(PointerEvent),
    Command(Command),
}

impl From<PointerEvent> for InputEvent {
    fn from(ev: PointerEvent) -> Self {
        InputEvent::Pointer(ev)
    }
}

impl From<Command> for InputEvent {
    fn from(cmd: Command) -> Self {
        InputEvent::Command(cmd)
    }
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    origin: (i32, i32),
    rect: Rect,
    // started on a paused frame
    frozen: bool,
}

/// Selection committed by the operator, waiting for the next tick to build its histogram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSelection {
    pub rect: Rect,
    pub frozen: bool,
}

/// Sole owner of everything the operator can change between ticks
#[derive(Debug, Clone)]
pub struct Operator {
    mode: TrackingMode,
    // mode restored when leaving Paused
    resume: TrackingMode,
    gesture: Option<Gesture>,
    pending: Option<PendingSelection>,
    bounds: Rect,
    show_back_projection: bool,
    quit: bool,
}

impl Operator {
    pub fn new(mode: TrackingMode) -> Self {
        Self {
            mode,
            resume: TrackingMode::Idle,
            gesture: None,
            pending: None,
            bounds: Rect::default(),
            show_back_projection: false,
            quit: false,
        }
    }

    #[inline]
    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    /// Processing-resolution frame that selections are clipped to
    #[inline]
    pub fn set_bounds(&mut self, width: usize, height: usize) {
        self.bounds = Rect::frame(width, height);
    }

    #[inline]
    pub fn show_back_projection(&self) -> bool {
        self.show_back_projection
    }

    #[inline]
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Frame acquisition is suspended: paused, or selecting on a paused frame
    pub fn is_frozen(&self) -> bool {
        match self.mode {
            TrackingMode::Paused => true,
            TrackingMode::Selecting => self.gesture.map_or(false, |g| g.frozen),
            _ => self.pending.map_or(false, |p| p.frozen),
        }
    }

    /// Selection rectangle being dragged, once it has an area
    pub fn selection(&self) -> Option<Rect> {
        self.gesture
            .map(|g| g.rect)
            .filter(|r| r.area() > 0)
    }

    pub fn take_pending(&mut self) -> Option<PendingSelection> {
        self.pending.take()
    }

    /// Drop a committed selection that could not be turned into a target
    pub fn abandon_selection(&mut self) {
        self.pending = None;
        self.set_mode(TrackingMode::Idle);
    }

    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pointer(ev) => self.handle_pointer(ev),
            InputEvent::Command(cmd) => self.handle_command(cmd),
        }
    }

    fn handle_pointer(&mut self, ev: PointerEvent) {
        match ev {
            PointerEvent::Press { x, y } => {
                let frozen = self.is_frozen();

                self.gesture = Some(Gesture {
                    origin: (x, y),
                    rect: Rect::new(x, y, 0, 0) & self.bounds,
                    frozen,
                });
                self.pending = None;
                self.set_mode(TrackingMode::Selecting);
            }

            PointerEvent::Drag { x, y } => {
                if let Some(g) = self.gesture.as_mut() {
                    g.rect = Rect::from_corners(g.origin, (x, y)) & self.bounds;
                }
            }

            PointerEvent::Release { x, y } => {
                if let Some(mut g) = self.gesture.take() {
                    g.rect = Rect::from_corners(g.origin, (x, y)) & self.bounds;

                    if g.rect.area() > 0 {
                        info!("selected {:?}", g.rect);
                        self.pending = Some(PendingSelection {
                            rect: g.rect,
                            frozen: g.frozen,
                        });
                        self.set_mode(TrackingMode::Tracking);
                    } else {
                        debug!("empty selection discarded");
                        self.set_mode(TrackingMode::Idle);
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Pause => match self.mode {
                TrackingMode::Paused => {
                    let resume = self.resume;
                    self.set_mode(resume);
                }
                TrackingMode::Tracking | TrackingMode::Idle => {
                    self.resume = self.mode;
                    self.set_mode(TrackingMode::Paused);
                }
                TrackingMode::Selecting => (),
            },

            Command::CancelTracking => match self.mode {
                TrackingMode::Tracking => {
                    self.pending = None;
                    self.set_mode(TrackingMode::Idle);
                }
                TrackingMode::Paused => self.resume = TrackingMode::Idle,
                _ => (),
            },

            Command::ToggleBackProjection => {
                self.show_back_projection = !self.show_back_projection
            }

            Command::Quit => self.quit = true,
        }
    }

    fn set_mode(&mut self, mode: TrackingMode) {
        if self.mode != mode {
            debug!("mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator(mode: TrackingMode) -> Operator {
        let mut op = Operator::new(mode);
        op.set_bounds(100, 80);
        op
    }

    fn drag(op: &mut Operator, from: (i32, i32), to: (i32, i32)) {
        op.handle(PointerEvent::Press { x: from.0, y: from.1 }.into());
        op.handle(PointerEvent::Drag { x: (from.0 + to.0) / 2, y: (from.1 + to.1) / 2 }.into());
        op.handle(PointerEvent::Release { x: to.0, y: to.1 }.into());
    }

    #[test]
    fn drag_commits_selection() {
        let mut op = operator(TrackingMode::Idle);

        op.handle(PointerEvent::Press { x: 50, y: 40 }.into());
        assert_eq!(op.mode(), TrackingMode::Selecting);
        assert_eq!(op.selection(), None);

        op.handle(PointerEvent::Drag { x: 30, y: 20 }.into());
        assert_eq!(op.selection(), Some(Rect::new(30, 20, 20, 20)));

        op.handle(PointerEvent::Release { x: 20, y: 10 }.into());
        assert_eq!(op.mode(), TrackingMode::Tracking);
        assert_eq!(op.selection(), None);

        let pending = op.take_pending().unwrap();
        assert_eq!(pending.rect, Rect::new(20, 10, 30, 30));
        assert!(!pending.frozen);
        assert_eq!(op.take_pending(), None);
    }

    #[test]
    fn selection_is_clipped_to_frame() {
        let mut op = operator(TrackingMode::Idle);
        drag(&mut op, (90, 70), (150, 120));

        assert_eq!(op.take_pending().unwrap().rect, Rect::new(90, 70, 10, 10));
    }

    #[test]
    fn degenerate_selection_returns_to_idle() {
        let mut op = operator(TrackingMode::Tracking);
        drag(&mut op, (10, 10), (10, 60));

        assert_eq!(op.mode(), TrackingMode::Idle);
        assert_eq!(op.take_pending(), None);

        // entirely outside the frame
        drag(&mut op, (120, 90), (140, 100));
        assert_eq!(op.mode(), TrackingMode::Idle);
        assert_eq!(op.take_pending(), None);
    }

    #[test]
    fn pause_twice_restores_mode() {
        let mut op = operator(TrackingMode::Tracking);

        op.handle(Command::Pause.into());
        assert_eq!(op.mode(), TrackingMode::Paused);
        assert!(op.is_frozen());

        op.handle(Command::Pause.into());
        assert_eq!(op.mode(), TrackingMode::Tracking);
        assert!(!op.is_frozen());
    }

    #[test]
    fn selection_while_paused_resumes_tracking() {
        let mut op = operator(TrackingMode::Tracking);
        op.handle(Command::Pause.into());

        op.handle(PointerEvent::Press { x: 10, y: 10 }.into());
        assert_eq!(op.mode(), TrackingMode::Selecting);
        assert!(op.is_frozen());

        op.handle(PointerEvent::Release { x: 30, y: 40 }.into());
        assert_eq!(op.mode(), TrackingMode::Tracking);
        // the selection was drawn on the paused frame
        assert!(op.is_frozen());

        let pending = op.take_pending().unwrap();
        assert!(pending.frozen);
        assert!(!op.is_frozen());
    }

    #[test]
    fn cancel_stops_tracking() {
        let mut op = operator(TrackingMode::Tracking);
        op.handle(Command::CancelTracking.into());
        assert_eq!(op.mode(), TrackingMode::Idle);

        let mut op = operator(TrackingMode::Tracking);
        op.handle(Command::Pause.into());
        op.handle(Command::CancelTracking.into());
        assert_eq!(op.mode(), TrackingMode::Paused);
        op.handle(Command::Pause.into());
        assert_eq!(op.mode(), TrackingMode::Idle);
    }

    #[test]
    fn toggles_and_quit() {
        let mut op = operator(TrackingMode::Idle);
        assert!(!op.show_back_projection());

        op.handle(Command::ToggleBackProjection.into());
        assert!(op.show_back_projection());
        assert_eq!(op.mode(), TrackingMode::Idle);

        op.handle(Command::Quit.into());
        assert!(op.quit_requested());
    }

    #[test]
    fn key_codes() {
        assert_eq!(Command::from_key(b'p' as i32), Some(Command::Pause));
        assert_eq!(Command::from_key(b'c' as i32), Some(Command::CancelTracking));
        assert_eq!(Command::from_key(b'b' as i32), Some(Command::ToggleBackProjection));
        assert_eq!(Command::from_key(27), Some(Command::Quit));
        assert_eq!(Command::from_key(-1), None);
    }
}
