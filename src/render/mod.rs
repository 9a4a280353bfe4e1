//! Frame-by-frame rasterization of a [`Scene`] through a seekable surface.
//!
//! The template is loaded once, receives the full caption timeline in one
//! call, and is then stepped through `i / fps` for every frame index. The
//! async surface flow runs on a private runtime behind a blocking entry point.

mod chromium;
mod surface;

pub use chromium::{ChromiumLauncher, ChromiumSurface};
pub use surface::{RenderSurface, SurfaceLauncher};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, anyhow};
use tempfile::TempDir;
use tracing::{debug, info, warn};
use urlencoding::encode;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::scene::{Frame, Scene};

/// Only one surface flow may run per process.
static RENDER_GATE: Mutex<()> = Mutex::new(());

/// Frames of one render plus the directory that owns them.
///
/// Dropping this removes the directory.
#[derive(Debug)]
pub struct RenderedFrames {
    dir: TempDir,
    frames: Vec<Frame>,
}

impl RenderedFrames {
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Keep the frame directory on disk and hand back its path.
    pub fn keep(self) -> (PathBuf, Vec<Frame>) {
        (self.dir.keep(), self.frames)
    }

    pub fn discard(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

pub struct SceneRenderer<L = ChromiumLauncher> {
    config: PipelineConfig,
    launcher: L,
}

impl SceneRenderer<ChromiumLauncher> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_launcher(config, ChromiumLauncher)
    }
}

impl<L: SurfaceLauncher> SceneRenderer<L> {
    pub fn with_launcher(config: PipelineConfig, launcher: L) -> Self {
        Self { config, launcher }
    }

    /// Render `floor(duration * fps)` frames of `scene`, blocking until done.
    ///
    /// Must not be called from inside an async runtime.
    pub fn render(&self, scene: &Scene, fps: u32) -> PipelineResult<RenderedFrames> {
        if fps == 0 {
            return Err(PipelineError::invalid("fps must be non-zero"));
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(PipelineError::render(
                None,
                anyhow!("render was called from inside an async runtime"),
            ));
        }

        let _gate = RENDER_GATE.lock().unwrap_or_else(PoisonError::into_inner);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PipelineError::render(None, e))?;
        runtime.block_on(self.drive(scene, fps))
    }

    async fn drive(&self, scene: &Scene, fps: u32) -> PipelineResult<RenderedFrames> {
        let total = scene.total_frames(fps);
        let dir = frame_dir(&self.config.temp_root).map_err(|e| PipelineError::render(None, e))?;
        let url = template_url(&self.config.template_path, scene.background_image(), scene.headline())
            .map_err(|e| PipelineError::render(None, e))?;
        let timeline = serde_json::to_string(scene.timings())
            .map_err(|e| PipelineError::render(None, e))?;

        info!(
            "Rendering {} frames at {} fps into {}",
            total,
            fps,
            dir.path().display()
        );

        let mut surface = self
            .bounded(None, "launch rendering surface", self.launcher.launch(&self.config))
            .await?;

        let outcome = self
            .capture_all(&mut surface, &url, &timeline, total, fps, dir.path())
            .await;

        // Release on every path; a failed close doesn't invalidate frames already written.
        self.release(&mut surface).await;

        let frames = outcome?;
        info!("Rendered {} frames", frames.len());
        Ok(RenderedFrames { dir, frames })
    }

    async fn capture_all(
        &self,
        surface: &mut L::Surface,
        url: &str,
        timeline: &str,
        total: usize,
        fps: u32,
        dir: &Path,
    ) -> PipelineResult<Vec<Frame>> {
        self.bounded(None, "load scene template", surface.load(url))
            .await?;
        self.bounded(None, "inject caption timeline", surface.set_timeline(timeline))
            .await?;

        tokio::time::sleep(self.config.warmup).await;

        let mut frames = Vec::with_capacity(total);
        for index in 0..total {
            let frame = Frame::new(index, fps, dir);
            self.bounded(Some(index), "seek", surface.seek(frame.timestamp))
                .await?;
            self.bounded(Some(index), "capture frame", surface.capture(&frame.raster_path))
                .await?;
            check_raster(&frame.raster_path).map_err(|e| PipelineError::render(Some(index), e))?;

            if index % fps as usize == 0 {
                debug!("Captured frame {}/{}", index + 1, total);
            }
            frames.push(frame);
        }
        Ok(frames)
    }

    async fn release(&self, surface: &mut L::Surface) {
        let closed = self.limited(surface.close()).await;
        let Err(e) = closed else {
            return;
        };
        warn!("Failed to release rendering surface, killing it: {:#}", e);
        if let Err(e) = self.limited(surface.kill()).await {
            warn!("Failed to kill rendering surface: {:#}", e);
        }
    }

    async fn limited<T>(&self, op: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
        match self.config.frame_timeout {
            Some(limit) => match tokio::time::timeout(limit, op).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!("timed out after {:?}", limit)),
            },
            None => op.await,
        }
    }

    async fn bounded<T>(
        &self,
        frame_index: Option<usize>,
        what: &str,
        op: impl Future<Output = anyhow::Result<T>>,
    ) -> PipelineResult<T> {
        self.limited(op)
            .await
            .with_context(|| what.to_string())
            .map_err(|e| PipelineError::render(frame_index, e))
    }
}

fn frame_dir(temp_root: &Path) -> anyhow::Result<TempDir> {
    std::fs::create_dir_all(temp_root)
        .with_context(|| format!("failed to create temp root {}", temp_root.display()))?;
    tempfile::Builder::new()
        .prefix("frames_")
        .tempdir_in(temp_root)
        .context("failed to create frame directory")
}

fn check_raster(path: &Path) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("frame {} was not written", path.display()))?;
    anyhow::ensure!(meta.len() > 0, "frame {} is empty", path.display());
    Ok(())
}

/// `file://` URL of the template with the image and headline in its query.
pub fn template_url(template: &Path, image: &Path, headline: &str) -> anyhow::Result<String> {
    let template = std::fs::canonicalize(template)
        .with_context(|| format!("scene template {} not found", template.display()))?;
    let image = std::fs::canonicalize(image)
        .with_context(|| format!("background image {} not found", image.display()))?;
    Ok(format!(
        "{}?img={}&headline={}",
        file_url(&template),
        encode(&file_url(&image)),
        encode(headline)
    ))
}

fn file_url(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    // canonicalize returns verbatim paths on Windows
    let raw = if let Some(unc) = raw.strip_prefix("//?/UNC/") {
        format!("//{unc}")
    } else if let Some(local) = raw.strip_prefix("//?/") {
        local.to_string()
    } else {
        raw
    };
    let encoded = raw
        .split('/')
        .map(|segment| encode(segment).replace("%3A", ":"))
        .collect::<Vec<_>>()
        .join("/");
    if encoded.starts_with("//") {
        format!("file:{encoded}")
    } else if encoded.starts_with('/') {
        format!("file://{encoded}")
    } else {
        format!("file:///{encoded}")
    }
}
