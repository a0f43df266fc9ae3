use crate::error::Error;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

/// Number of hue bins in the target histogram
pub const HISTOGRAM_SIZE: usize = 16;

/// Upper bound (exclusive) of 8-bit hue values
pub const HUE_RANGE: usize = 180;

/// Frames timed when the source cannot report its own rate
pub const FPS_SAMPLE_FRAMES: usize = 50;

/// Highest frame rate an MPEG-4 container can carry
pub const MAX_FPS: f64 = 65.535;

/// Side of the placeholder search window used before any selection
pub const INITIAL_WINDOW_SIZE: i32 = 20;

/// Pixels added on every side of the converged window before the orientation fit
pub const WINDOW_TOLERANCE: i32 = 10;

/// Values the operator can tune while the session runs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerConfig {
    pub saturation_min: u8,
    pub saturation_max: u8,
    pub value_min: u8,
    pub value_max: u8,

    // always odd after normalization
    pub blur_kernel_size: u32,

    /// Frames taller than this are downscaled, keeping the aspect ratio
    pub processing_height_limit: usize,

    pub history_size: usize,

    /// Consecutive empty reads tolerated before the session ends
    pub empty_frame_limit: usize,

    pub max_iterations: usize,
    pub epsilon: f64,

    /// Time spent waiting for operator input on each tick
    pub input_wait_ms: u64,

    /// Hue bin that gets full weight before the operator selects anything,
    /// `None` starts the session idle
    pub seed_hue_bin: Option<usize>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            saturation_min: 10,
            saturation_max: 255,
            value_min: 10,
            value_max: 255,
            blur_kernel_size: 21,
            processing_height_limit: 1200,
            history_size: 50,
            empty_frame_limit: 1000,
            max_iterations: 10,
            epsilon: 1.0,
            input_wait_ms: 10,
            seed_hue_bin: Some(HISTOGRAM_SIZE - 1),
        }
    }
}

impl TrackerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let mut config: TrackerConfig = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.normalize();

        Ok(config)
    }

    /// Gaussian kernels must be odd, so an even size is bumped to the next odd one.
    pub fn set_blur_kernel_size(&mut self, size: u32) {
        self.blur_kernel_size = if size % 2 == 0 { size + 1 } else { size };
    }

    pub fn normalize(&mut self) {
        self.set_blur_kernel_size(self.blur_kernel_size);
        self.history_size = self.history_size.max(1);
        self.processing_height_limit = self.processing_height_limit.max(1);
        self.max_iterations = self.max_iterations.max(1);

        if let Some(bin) = self.seed_hue_bin {
            if bin >= HISTOGRAM_SIZE {
                self.seed_hue_bin = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_kernel_becomes_odd() {
        let mut config = TrackerConfig::default();

        config.set_blur_kernel_size(20);
        assert_eq!(config.blur_kernel_size, 21);

        config.set_blur_kernel_size(0);
        assert_eq!(config.blur_kernel_size, 1);

        config.set_blur_kernel_size(7);
        assert_eq!(config.blur_kernel_size, 7);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut config: TrackerConfig =
            serde_json::from_str(r#"{ "blur_kernel_size": 12, "saturation_min": 60 }"#).unwrap();
        config.normalize();

        assert_eq!(config.blur_kernel_size, 13);
        assert_eq!(config.saturation_min, 60);
        assert_eq!(config.empty_frame_limit, 1000);
        assert_eq!(config.processing_height_limit, 1200);
    }

    #[test]
    fn out_of_range_seed_is_dropped() {
        let mut config = TrackerConfig {
            seed_hue_bin: Some(HISTOGRAM_SIZE),
            ..Default::default()
        };
        config.normalize();

        assert_eq!(config.seed_hue_bin, None);
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!("buoytrack-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "value_min": 40, "seed_hue_bin": null }"#).unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.value_min, 40);
        assert_eq!(config.seed_hue_bin, None);
    }
}
