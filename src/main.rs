use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use newsshorts::args::Args;
use newsshorts::{Pipeline, VideoRequest, backdrop, subtitle};

fn main() {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting news short video generation");

    if let Err(e) = run(&args) {
        error!("Video creation failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = args.pipeline_config()?;
    let script = args.script_text()?;

    if !args.image.exists() {
        error!("Background image not found: {}", args.image.display());
        anyhow::bail!("background image not found: {}", args.image.display());
    }

    // Removed when `run` returns.
    let composed = if args.compose {
        Some(backdrop::compose_to_temp(&args.image, &config)?)
    } else {
        None
    };
    let image = composed
        .as_ref()
        .map(|path| path.to_path_buf())
        .unwrap_or_else(|| args.image.clone());

    let output = args.out.clone().unwrap_or_else(|| {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("outputs/NewsShort_{timestamp}.mp4"))
    });

    let request = VideoRequest {
        script,
        headline: args.headline.clone(),
        image,
        audio: args.audio.clone(),
        output,
    };

    let produced = Pipeline::new(config).run(&request)?;

    if let Some(path) = &args.srt {
        subtitle::write_srt(path, &produced.timings)?;
        info!("Subtitles written to {}", path.display());
    }
    if let Some(path) = &args.timings_out {
        std::fs::write(path, serde_json::to_string_pretty(&produced.timings)?)?;
        info!("Word timings written to {}", path.display());
    }

    info!(
        "Video created: {} ({:.2}s, {} fps, {}/{})",
        produced.video.path.display(),
        produced.video.duration_seconds,
        produced.video.fps,
        produced.video.video_codec,
        produced.video.audio_codec
    );
    Ok(())
}
