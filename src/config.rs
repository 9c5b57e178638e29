// SYNOID Bench Run Configuration
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Run parameters are fixed for one execution. Defaults mirror the
// benchmark constants: 30 s, 60 FPS, 640x480, 44.1 kHz mono, 1500k video.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_DURATION_SECS: u32 = 30;
pub const DEFAULT_FPS: f64 = 60.0;
pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_VIDEO_BITRATE: &str = "1500k";
pub const DEFAULT_OUTPUT: &str = "result.mp4";

/// Where the frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    /// Import an existing video file.
    Import(PathBuf),
    /// Record from webcam + microphone.
    Record,
}

/// Menu choice entered at the console prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    ImportFile,
    RecordWebcam,
}

impl MenuChoice {
    /// Parse the raw answer to "Enter 1 or 2". Surrounding whitespace is ignored.
    pub fn from_input(s: &str) -> Option<Self> {
        match s.trim() {
            "1" => Some(Self::ImportFile),
            "2" => Some(Self::RecordWebcam),
            _ => None,
        }
    }
}

/// Parameters for one benchmark run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Capture length for webcam and microphone (seconds).
    pub duration_secs: u32,
    /// Target output frame rate.
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    /// Sample rate used when recording from the microphone.
    pub sample_rate: u32,
    /// Video bitrate passed to the encoder (FFmpeg syntax, e.g. "1500k").
    pub video_bitrate: String,
    /// Final muxed file.
    pub output: PathBuf,
    /// Directory for intermediate recordings and extracted audio.
    pub work_dir: PathBuf,
    /// Capture device for record mode. `None` picks the platform default.
    pub camera: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            fps: DEFAULT_FPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            sample_rate: DEFAULT_SAMPLE_RATE,
            video_bitrate: DEFAULT_VIDEO_BITRATE.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            work_dir: PathBuf::from("."),
            camera: None,
        }
    }
}

impl RunConfig {
    /// Reject parameters the encoders cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.duration_secs == 0 {
            bail!("Duration must be at least 1 second");
        }
        if !self.fps.is_finite() || self.fps <= 0.0 {
            bail!("Target FPS must be positive, got {}", self.fps);
        }
        if self.width == 0 || self.height == 0 {
            bail!("Frame size must be non-zero, got {}x{}", self.width, self.height);
        }
        // yuv420p needs even dimensions
        if self.width % 2 != 0 || self.height % 2 != 0 {
            bail!(
                "Frame size must be even for H.264 4:2:0, got {}x{}",
                self.width,
                self.height
            );
        }
        if self.sample_rate == 0 {
            bail!("Sample rate must be non-zero");
        }
        if self.video_bitrate.trim().is_empty() {
            bail!("Video bitrate must not be empty");
        }
        Ok(())
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_benchmark_constants() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.duration_secs, 30);
        assert_eq!(cfg.fps, 60.0);
        assert_eq!(cfg.resolution(), (640, 480));
        assert_eq!(cfg.sample_rate, 44_100);
        assert_eq!(cfg.video_bitrate, "1500k");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_menu_choice() {
        assert_eq!(MenuChoice::from_input("1"), Some(MenuChoice::ImportFile));
        assert_eq!(MenuChoice::from_input(" 2\n"), Some(MenuChoice::RecordWebcam));
        assert_eq!(MenuChoice::from_input("3"), None);
        assert_eq!(MenuChoice::from_input(""), None);
        assert_eq!(MenuChoice::from_input("one"), None);
    }

    #[test]
    fn test_validate_rejects_bad_params() {
        let mut cfg = RunConfig::default();
        cfg.fps = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.width = 641;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.duration_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::default();
        cfg.sample_rate = 0;
        assert!(cfg.validate().is_err());
    }
}
