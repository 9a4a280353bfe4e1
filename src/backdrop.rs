//! Portrait backdrop: a blurred, cover-scaled copy of the image with the
//! sharp original centred on top.

use std::path::Path;

use anyhow::Context;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tempfile::TempPath;
use tracing::info;

use crate::config::PipelineConfig;

/// Blur runs on a copy shrunk by this factor and is scaled back up.
const BLUR_DOWNSCALE: u32 = 4;

pub fn compose_portrait(input: &Path, output: &Path, config: &PipelineConfig) -> anyhow::Result<()> {
    let original = image::open(input)
        .with_context(|| format!("failed to open image {}", input.display()))?
        .to_rgba8();
    let (w, h) = original.dimensions();
    anyhow::ensure!(w > 0 && h > 0, "image {} is empty", input.display());

    let target = (config.width, config.height);
    let mut canvas = blurred_cover(&original, target, config.background_blur);

    let (fw, fh) = fit_within((w, h), config.foreground_max);
    let foreground = if (fw, fh) == (w, h) {
        original
    } else {
        imageops::resize(&original, fw, fh, FilterType::Lanczos3)
    };
    let (x, y) = centered_offset(target, (fw, fh));
    imageops::overlay(&mut canvas, &foreground, x, y);

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    canvas
        .save(output)
        .with_context(|| format!("failed to save backdrop {}", output.display()))?;
    info!(
        "Composed {}x{} backdrop from {} ({}x{})",
        target.0,
        target.1,
        input.display(),
        w,
        h
    );
    Ok(())
}

/// Compose into a PNG under `temp_root` that is deleted when the path is dropped.
pub fn compose_to_temp(input: &Path, config: &PipelineConfig) -> anyhow::Result<TempPath> {
    std::fs::create_dir_all(&config.temp_root)
        .with_context(|| format!("failed to create temp root {}", config.temp_root.display()))?;
    let path = tempfile::Builder::new()
        .prefix("final_bg_")
        .suffix(".png")
        .tempfile_in(&config.temp_root)
        .context("failed to create backdrop file")?
        .into_temp_path();
    compose_portrait(input, &path, config)?;
    Ok(path)
}

fn blurred_cover(src: &RgbaImage, target: (u32, u32), sigma: f32) -> RgbaImage {
    let (cw, ch) = cover_size(src.dimensions(), target);
    let cover = imageops::resize(src, cw, ch, FilterType::Triangle);
    let (x, y) = ((cw - target.0) / 2, (ch - target.1) / 2);
    let cropped = imageops::crop_imm(&cover, x, y, target.0, target.1).to_image();
    if sigma <= 0.0 {
        return cropped;
    }

    let small_w = (target.0 / BLUR_DOWNSCALE).max(1);
    let small_h = (target.1 / BLUR_DOWNSCALE).max(1);
    let small = imageops::resize(&cropped, small_w, small_h, FilterType::Triangle);
    let blurred = imageops::blur(&small, sigma / BLUR_DOWNSCALE as f32);
    imageops::resize(&blurred, target.0, target.1, FilterType::Triangle)
}

/// Smallest size with `src`'s aspect ratio that covers `target`.
pub fn cover_size(src: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (w, h) = (src.0 as u64, src.1 as u64);
    let (tw, th) = (target.0 as u64, target.1 as u64);
    if w * th > tw * h {
        // wider than the target
        let width = (w * th).div_ceil(h);
        (width.max(tw) as u32, th as u32)
    } else {
        let height = (h * tw).div_ceil(w);
        (tw as u32, height.max(th) as u32)
    }
}

/// Shrink `src` to fit a `max x max` box, keeping aspect. Never enlarges.
pub fn fit_within(src: (u32, u32), max: u32) -> (u32, u32) {
    let (w, h) = src;
    if w <= max && h <= max {
        return src;
    }
    let scale = (max as f64 / w as f64).min(max as f64 / h as f64);
    let fw = ((w as f64 * scale).round() as u32).clamp(1, max);
    let fh = ((h as f64 * scale).round() as u32).clamp(1, max);
    (fw, fh)
}

pub fn centered_offset(outer: (u32, u32), inner: (u32, u32)) -> (i64, i64) {
    (
        (outer.0 as i64 - inner.0 as i64) / 2,
        (outer.1 as i64 - inner.1 as i64) / 2,
    )
}
