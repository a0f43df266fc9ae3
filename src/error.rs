use crate::geometry::Rect;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config Error: {0}")]
    ConfigError(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCvError(#[from] opencv::Error),

    #[error("selection {0:?} has no area")]
    EmptySelection(Rect),

    #[error("frame buffer of {len} bytes does not fit {width}x{height}x3")]
    FrameShape {
        width: usize,
        height: usize,
        len: usize,
    },

    #[error("video source unavailable: {0}")]
    SourceUnavailable(String),
}
