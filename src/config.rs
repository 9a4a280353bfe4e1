use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// Settings shared by the timing, render and assembly stages.
///
/// Passed explicitly into every component; nothing is read from process state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub template_path: PathBuf,
    /// Parent of the per-render frame directories.
    pub temp_root: PathBuf,
    /// Square pixel budget for the sharp foreground copy of the background image.
    pub foreground_max: u32,
    pub background_blur: f32,
    #[serde(with = "millis")]
    pub warmup: Duration,
    /// Upper bound for a single surface operation. `None` waits forever.
    #[serde(with = "opt_millis")]
    pub frame_timeout: Option<Duration>,
    pub sync_tolerance_frames: u32,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub browser_executable: Option<PathBuf>,
    pub keep_frames: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            template_path: PathBuf::from("templates/news_scene.html"),
            temp_root: PathBuf::from("assets/temp"),
            foreground_max: 950,
            background_blur: 30.0,
            warmup: Duration::from_millis(500),
            frame_timeout: Some(Duration::from_secs(30)),
            sync_tolerance_frames: 1,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            browser_executable: None,
            keep_frames: false,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let cfg = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.fps == 0 {
            return Err(PipelineError::invalid("fps must be non-zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::invalid("resolution must be non-zero"));
        }
        // yuv420p output
        if self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(PipelineError::invalid(format!(
                "resolution {}x{} must have even dimensions",
                self.width, self.height
            )));
        }
        if self.ffmpeg.trim().is_empty() || self.ffprobe.trim().is_empty() {
            return Err(PipelineError::invalid("ffmpeg/ffprobe binary names must be set"));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
