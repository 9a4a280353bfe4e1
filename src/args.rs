use std::path::PathBuf;

use clap::Parser;

use crate::config::PipelineConfig;

/// Render a captioned vertical news short from a script, image and narration.
#[derive(Parser, Debug)]
#[command(name = "newsshorts", version)]
pub struct Args {
    /// Narration script text.
    #[clap(long, conflicts_with = "script_file")]
    pub script: Option<String>,

    /// File holding the narration script.
    #[clap(long)]
    pub script_file: Option<PathBuf>,

    /// Overlay headline shown for the whole video.
    #[clap(long)]
    pub headline: String,

    /// Background image.
    #[clap(long)]
    pub image: PathBuf,

    /// Narration audio track.
    #[clap(long)]
    pub audio: PathBuf,

    /// Output video; defaults to outputs/NewsShort_<timestamp>.mp4.
    #[clap(long)]
    pub out: Option<PathBuf>,

    /// JSON config file; flags below override it.
    #[clap(long)]
    pub config: Option<PathBuf>,

    #[clap(long)]
    pub fps: Option<u32>,

    #[clap(long)]
    pub template: Option<PathBuf>,

    #[clap(long)]
    pub temp_root: Option<PathBuf>,

    #[clap(long)]
    pub browser: Option<PathBuf>,

    /// Blur/centre the image into a portrait backdrop before rendering.
    #[clap(long)]
    pub compose: bool,

    /// Also write the word timeline as an SRT file.
    #[clap(long)]
    pub srt: Option<PathBuf>,

    /// Also write the word timeline as JSON.
    #[clap(long)]
    pub timings_out: Option<PathBuf>,

    #[clap(long)]
    pub keep_frames: bool,

    #[clap(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(fps) = self.fps {
            cfg.fps = fps;
        }
        if let Some(template) = &self.template {
            cfg.template_path = template.clone();
        }
        if let Some(root) = &self.temp_root {
            cfg.temp_root = root.clone();
        }
        if let Some(browser) = &self.browser {
            cfg.browser_executable = Some(browser.clone());
        }
        if self.keep_frames {
            cfg.keep_frames = true;
        }
        Ok(cfg)
    }

    pub fn script_text(&self) -> anyhow::Result<String> {
        match (&self.script, &self.script_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
            (None, None) => anyhow::bail!("one of --script or --script-file is required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "newsshorts",
            "--script",
            "Breaking news today",
            "--headline",
            "Big News",
            "--image",
            "bg.png",
            "--audio",
            "speech.mp3",
            "--fps",
            "24",
            "--keep-frames",
        ]);
        let cfg = args.pipeline_config().unwrap();
        assert_eq!(cfg.fps, 24);
        assert!(cfg.keep_frames);
        assert_eq!(cfg.width, 1080);
        assert_eq!(args.script_text().unwrap(), "Breaking news today");
    }

    #[test]
    fn script_is_required() {
        let args = Args::parse_from([
            "newsshorts",
            "--headline",
            "h",
            "--image",
            "bg.png",
            "--audio",
            "a.wav",
        ]);
        assert!(args.script_text().is_err());
    }
}
