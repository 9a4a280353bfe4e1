//! Captioned vertical news video production: word timing, frame rendering
//! through a headless browser, and ffmpeg assembly.

pub mod args;
pub mod assemble;
pub mod audio;
pub mod backdrop;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod subtitle;
pub mod timing;

pub use assemble::{VideoAssembler, VideoOutput};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, ProducedVideo, VideoRequest};
pub use render::{RenderSurface, RenderedFrames, SceneRenderer, SurfaceLauncher};
pub use scene::{Frame, Scene};
pub use timing::{WordTiming, estimate};
