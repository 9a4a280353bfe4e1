//! Timing -> Render -> Assemble, in that order, for one video.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::assemble::{VideoAssembler, VideoOutput};
use crate::audio;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::render::{ChromiumLauncher, SceneRenderer, SurfaceLauncher};
use crate::scene::Scene;
use crate::timing::{self, WordTiming};

/// Upstream-resolved inputs for one video.
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub script: String,
    pub headline: String,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug)]
pub struct ProducedVideo {
    pub video: VideoOutput,
    pub timings: Vec<WordTiming>,
    /// Set when the frames were kept on disk.
    pub frames_dir: Option<PathBuf>,
}

pub struct Pipeline<L = ChromiumLauncher> {
    config: PipelineConfig,
    renderer: SceneRenderer<L>,
    assembler: VideoAssembler,
}

impl Pipeline<ChromiumLauncher> {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_launcher(config, ChromiumLauncher)
    }
}

impl<L: SurfaceLauncher> Pipeline<L> {
    pub fn with_launcher(config: PipelineConfig, launcher: L) -> Self {
        Self {
            renderer: SceneRenderer::with_launcher(config.clone(), launcher),
            assembler: VideoAssembler::new(config.clone()),
            config,
        }
    }

    /// Produce one video. Nothing is left at `request.output` on failure.
    pub fn run(&self, request: &VideoRequest) -> PipelineResult<ProducedVideo> {
        self.config.validate()?;

        let duration = audio::duration_seconds(&request.audio, &self.config).map_err(|e| {
            PipelineError::invalid(format!(
                "narration audio {} has no measurable duration: {:#}",
                request.audio.display(),
                e
            ))
        })?;
        info!("Narration audio is {:.2} seconds", duration);

        let timings = timing::estimate(&request.script, duration)?;
        if timings.is_empty() {
            warn!("Narration script is empty; rendering without captions");
        } else {
            info!("Estimated timing for {} words", timings.len());
        }

        let scene = Scene::new(
            &request.image,
            request.headline.clone(),
            duration,
            timings.clone(),
        )?;
        let rendered = self.renderer.render(&scene, self.config.fps)?;

        let assembled = self.assembler.assemble(
            rendered.frames(),
            &request.audio,
            self.config.fps,
            &request.output,
        );

        let frames_dir = if self.config.keep_frames {
            let (dir, _) = rendered.keep();
            info!("Keeping frames in {}", dir.display());
            Some(dir)
        } else {
            let dir = rendered.dir().to_path_buf();
            if let Err(e) = rendered.discard() {
                warn!("Failed to remove frame directory {}: {}", dir.display(), e);
            }
            None
        };

        Ok(ProducedVideo {
            video: assembled?,
            timings,
            frames_dir,
        })
    }
}
