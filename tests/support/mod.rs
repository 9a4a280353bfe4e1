#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use newsshorts::{PipelineConfig, RenderSurface, SurfaceLauncher};

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub launched: usize,
    pub closed: usize,
    pub killed: usize,
    pub loaded: Vec<String>,
    pub timelines: Vec<String>,
    pub seeks: Vec<f64>,
    pub captures: Vec<PathBuf>,
}

/// In-memory stand-in for the browser: records every call and writes a
/// small solid PNG per capture.
#[derive(Clone, Default)]
pub struct ScriptedLauncher {
    pub log: Arc<Mutex<SurfaceLog>>,
    pub fail_launch: bool,
    pub fail_capture_at: Option<usize>,
    pub stall_seek_at: Option<usize>,
    pub stall_close: bool,
}

pub struct ScriptedSurface {
    log: Arc<Mutex<SurfaceLog>>,
    fail_capture_at: Option<usize>,
    stall_seek_at: Option<usize>,
    stall_close: bool,
    seeks: usize,
    captures: usize,
}

#[async_trait]
impl SurfaceLauncher for ScriptedLauncher {
    type Surface = ScriptedSurface;

    async fn launch(&self, _config: &PipelineConfig) -> anyhow::Result<ScriptedSurface> {
        anyhow::ensure!(!self.fail_launch, "browser binary not found");
        self.log.lock().unwrap().launched += 1;
        Ok(ScriptedSurface {
            log: self.log.clone(),
            fail_capture_at: self.fail_capture_at,
            stall_seek_at: self.stall_seek_at,
            stall_close: self.stall_close,
            seeks: 0,
            captures: 0,
        })
    }
}

#[async_trait]
impl RenderSurface for ScriptedSurface {
    async fn load(&mut self, url: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().loaded.push(url.to_string());
        Ok(())
    }

    async fn set_timeline(&mut self, timeline_json: &str) -> anyhow::Result<()> {
        self.log
            .lock()
            .unwrap()
            .timelines
            .push(timeline_json.to_string());
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> anyhow::Result<()> {
        if Some(self.seeks) == self.stall_seek_at {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.seeks += 1;
        self.log.lock().unwrap().seeks.push(seconds);
        Ok(())
    }

    async fn capture(&mut self, path: &Path) -> anyhow::Result<()> {
        if Some(self.captures) == self.fail_capture_at {
            anyhow::bail!("Target closed while capturing screenshot");
        }
        let shade = (self.captures % 256) as u8;
        RgbaImage::from_pixel(64, 64, Rgba([shade, 40, 90, 255])).save(path)?;
        self.captures += 1;
        self.log.lock().unwrap().captures.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> anyhow::Result<()> {
        if self.stall_close {
            std::future::pending::<()>().await;
        }
        self.log.lock().unwrap().closed += 1;
        Ok(())
    }

    async fn kill(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().killed += 1;
        Ok(())
    }
}

/// Template, background image and config rooted in `root`.
pub fn fixture(root: &Path) -> (PipelineConfig, PathBuf) {
    let template = root.join("news_scene.html");
    std::fs::write(&template, "<html><body></body></html>").unwrap();
    let image = root.join("bg.png");
    RgbaImage::from_pixel(8, 8, Rgba([10, 10, 10, 255]))
        .save(&image)
        .unwrap();

    let config = PipelineConfig {
        width: 64,
        height: 64,
        template_path: template,
        temp_root: root.join("tmp"),
        warmup: Duration::ZERO,
        frame_timeout: Some(Duration::from_secs(5)),
        ..PipelineConfig::default()
    };
    (config, image)
}

pub fn write_wav(path: &Path, seconds: f64) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let samples = (seconds * 8000.0).round() as usize;
    for i in 0..samples {
        let t = i as f64 / 8000.0;
        let v = (t * 440.0 * std::f64::consts::TAU).sin() * 8000.0;
        writer.write_sample(v as i16).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn ffmpeg_tools_available() -> bool {
    let ffprobe_ok = Command::new("ffprobe")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    let x264_ok = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(Stdio::null())
        .output()
        .map(|o| o.status.success() && String::from_utf8_lossy(&o.stdout).contains("libx264"))
        .unwrap_or(false);
    ffprobe_ok && x264_ok
}

pub fn dir_is_empty(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}
