use std::path::Path;

use async_trait::async_trait;

use crate::config::PipelineConfig;

/// A scripted, seekable page that rasterizes the scene template.
///
/// Every call must complete before the next one is issued: the animation
/// clock inside the surface is shared state.
#[async_trait]
pub trait RenderSurface: Send {
    /// Navigate to the template and wait for it to load.
    async fn load(&mut self, url: &str) -> anyhow::Result<()>;

    /// Hand the whole caption timeline (a JSON array) to the template.
    async fn set_timeline(&mut self, timeline_json: &str) -> anyhow::Result<()>;

    /// Move the template's animation clock to `seconds` and wait for it to settle.
    async fn seek(&mut self, seconds: f64) -> anyhow::Result<()>;

    /// Write one PNG of the current viewport to `path`.
    async fn capture(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Release the surface and any process behind it.
    async fn close(&mut self) -> anyhow::Result<()>;

    /// Force-terminate whatever `close` could not release, waiting for it to exit.
    async fn kill(&mut self) -> anyhow::Result<()>;
}

/// Produces a fresh surface for each render.
#[async_trait]
pub trait SurfaceLauncher: Send + Sync {
    type Surface: RenderSurface;

    async fn launch(&self, config: &PipelineConfig) -> anyhow::Result<Self::Surface>;
}
