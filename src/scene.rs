use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::timing::WordTiming;

/// Everything one render needs. Not modified once built.
#[derive(Debug, Clone)]
pub struct Scene {
    background_image: PathBuf,
    headline: String,
    duration_seconds: f64,
    timings: Vec<WordTiming>,
}

impl Scene {
    pub fn new(
        background_image: impl Into<PathBuf>,
        headline: impl Into<String>,
        duration_seconds: f64,
        timings: Vec<WordTiming>,
    ) -> PipelineResult<Self> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(PipelineError::invalid(format!(
                "scene duration must be positive, got {duration_seconds}"
            )));
        }
        Ok(Self {
            background_image: background_image.into(),
            headline: headline.into(),
            duration_seconds,
            timings,
        })
    }

    pub fn background_image(&self) -> &Path {
        &self.background_image
    }

    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn timings(&self) -> &[WordTiming] {
        &self.timings
    }

    /// `floor(duration * fps)`.
    pub fn total_frames(&self, fps: u32) -> usize {
        total_frames(self.duration_seconds, fps)
    }
}

pub fn total_frames(duration_seconds: f64, fps: u32) -> usize {
    // Nudge before flooring so 4.0s * 30 doesn't land on 119.999..
    (duration_seconds * fps as f64 + 1e-9).floor() as usize
}

/// One still raster of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub timestamp: f64,
    pub raster_path: PathBuf,
}

impl Frame {
    pub fn new(index: usize, fps: u32, dir: &Path) -> Self {
        Self {
            index,
            timestamp: index as f64 / fps as f64,
            raster_path: dir.join(frame_file_name(index)),
        }
    }
}

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{index:05}.png")
}

/// ffmpeg image2 pattern matching [`frame_file_name`].
pub const FRAME_PATTERN: &str = "frame_%05d.png";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_is_floored() {
        assert_eq!(total_frames(4.0, 30), 120);
        assert_eq!(total_frames(4.05, 30), 121);
        assert_eq!(total_frames(0.01, 30), 0);
        assert_eq!(total_frames(2.9, 10), 29);
    }

    #[test]
    fn frames_carry_timestamp_and_name() {
        let f = Frame::new(57, 30, Path::new("/tmp/r"));
        assert_eq!(f.raster_path, Path::new("/tmp/r/frame_00057.png"));
        assert!((f.timestamp - 1.9).abs() < 1e-12);
    }

    #[test]
    fn scene_rejects_bad_duration() {
        assert!(Scene::new("bg.png", "h", 0.0, vec![]).is_err());
        let scene = Scene::new("bg.png", "h", 4.0, vec![]).unwrap();
        assert_eq!(scene.total_frames(30), 120);
    }
}
