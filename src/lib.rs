pub mod camshift;
pub mod config;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod histogram;
pub mod history;
pub mod log_writer;
pub mod operator;
pub mod overlay;
pub mod preprocess;
pub mod session;
pub mod tracker;
pub mod video;

#[cfg(feature = "opencv")]
pub mod cv;

pub mod circular_queue;

pub use config::TrackerConfig;
pub use error::Error;
pub use frame::{Frame, HsvFrame};
pub use geometry::{Rect, RotatedRect};
pub use histogram::HueHistogram;
pub use operator::{Command, InputEvent, PointerEvent, TrackingMode};
pub use session::{Session, Termination, Tick};
pub use tracker::Target;
