//! Muxing rendered frames and the narration track into an MP4.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, error, info, warn};

use crate::audio;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::scene::{FRAME_PATTERN, Frame, frame_file_name};

/// The finished video. Only produced when encoding fully succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOutput {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

pub struct VideoAssembler {
    config: PipelineConfig,
}

impl VideoAssembler {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Encode `frames` at `fps` with `audio` as the only audio stream.
    ///
    /// The output is written next to `output` first and moved into place only
    /// once ffmpeg and ffprobe both succeed.
    pub fn assemble(
        &self,
        frames: &[Frame],
        audio: &Path,
        fps: u32,
        output: &Path,
    ) -> PipelineResult<VideoOutput> {
        if fps == 0 {
            return Err(PipelineError::assembly("fps must be non-zero"));
        }
        let frame_dir = validate_frames(frames)?;

        let audio_secs = audio::duration_seconds(audio, &self.config).map_err(|e| {
            PipelineError::assembly_with(format!("cannot read audio {}", audio.display()), e)
        })?;
        let drift = check_sync(
            frames.len(),
            fps,
            audio_secs,
            self.config.sync_tolerance_frames,
        )?;
        if drift > 0.5 {
            warn!(
                "Frame count {} is {:.2} frames off the {:.3}s audio track",
                frames.len(),
                drift,
                audio_secs
            );
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::assembly_with(
                    format!("failed to create output directory {}", parent.display()),
                    e,
                )
            })?;
        }

        let partial = partial_path(output);
        info!(
            "Encoding {} frames at {} fps with {} into {}",
            frames.len(),
            fps,
            audio.display(),
            output.display()
        );

        let result = self
            .encode(frame_dir, audio, fps, &partial)
            .and_then(|()| self.probe_output(&partial))
            .and_then(|duration| {
                std::fs::rename(&partial, output).map_err(|e| {
                    PipelineError::assembly_with(
                        format!("failed to move video into {}", output.display()),
                        e,
                    )
                })?;
                Ok(duration)
            });

        match result {
            Ok(duration_seconds) => {
                info!("Video written to {} ({:.2}s)", output.display(), duration_seconds);
                Ok(VideoOutput {
                    path: output.to_path_buf(),
                    duration_seconds,
                    fps,
                    video_codec: "h264".to_string(),
                    audio_codec: "aac".to_string(),
                })
            }
            Err(e) => {
                if partial.exists() {
                    if let Err(rm) = std::fs::remove_file(&partial) {
                        warn!("Failed to remove partial output {}: {}", partial.display(), rm);
                    }
                }
                Err(e)
            }
        }
    }

    fn encode(&self, frame_dir: &Path, audio: &Path, fps: u32, out: &Path) -> PipelineResult<()> {
        let rate = fps.to_string();
        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.args(["-y", "-loglevel", "error", "-framerate", rate.as_str()])
            .args(["-start_number", "0", "-i"])
            .arg(frame_dir.join(FRAME_PATTERN))
            .arg("-i")
            .arg(audio)
            .args([
                "-map", "0:v:0", "-map", "1:a:0", "-c:v", "libx264", "-pix_fmt", "yuv420p", "-r",
                rate.as_str(), "-c:a", "aac", "-movflags", "+faststart", "-f", "mp4",
            ])
            .arg(out)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        debug!("Running {:?}", cmd);

        let output = cmd.output().map_err(|e| {
            PipelineError::assembly_with(format!("failed to spawn {}", self.config.ffmpeg), e)
        })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("ffmpeg failed to produce final video");
            return Err(PipelineError::assembly(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    fn probe_output(&self, path: &Path) -> PipelineResult<f64> {
        audio::probe_duration_seconds(&self.config.ffprobe, path)
            .map_err(|e| PipelineError::assembly_with("encoded video could not be probed", e))
    }
}

/// Check the frames form `0..n` in one directory with non-empty rasters.
pub fn validate_frames(frames: &[Frame]) -> PipelineResult<&Path> {
    let first = frames
        .first()
        .ok_or_else(|| PipelineError::assembly("no frames to assemble"))?;
    let dir = first
        .raster_path
        .parent()
        .ok_or_else(|| PipelineError::assembly("frame path has no directory"))?;

    for (position, frame) in frames.iter().enumerate() {
        if frame.index != position {
            return Err(PipelineError::assembly(format!(
                "frame sequence has a gap: expected index {position}, found {}",
                frame.index
            )));
        }
        if frame.raster_path != dir.join(frame_file_name(position)) {
            return Err(PipelineError::assembly(format!(
                "frame {position} is not at {}",
                dir.join(frame_file_name(position)).display()
            )));
        }
        match std::fs::metadata(&frame.raster_path) {
            Ok(meta) if meta.len() > 0 => {}
            Ok(_) => {
                return Err(PipelineError::assembly(format!(
                    "frame {position} raster is empty"
                )));
            }
            Err(e) => {
                return Err(PipelineError::assembly_with(
                    format!("frame {position} raster is missing"),
                    e,
                ));
            }
        }
    }
    Ok(dir)
}

/// Drift between the frame count and the audio length, in frames.
///
/// Anything beyond `tolerance_frames` is refused rather than corrected.
pub fn check_sync(
    frame_count: usize,
    fps: u32,
    audio_secs: f64,
    tolerance_frames: u32,
) -> PipelineResult<f64> {
    let drift = (audio_secs * fps as f64 - frame_count as f64).abs();
    if drift > tolerance_frames as f64 + 1e-6 {
        return Err(PipelineError::assembly(format!(
            "{frame_count} frames at {fps} fps do not match {audio_secs:.3}s of audio \
             ({drift:.2} frames apart, tolerance {tolerance_frames})"
        )));
    }
    Ok(drift)
}

fn partial_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "video.mp4".into());
    name.push(".part");
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frames(dir: &Path, n: usize) -> Vec<Frame> {
        (0..n)
            .map(|i| {
                let frame = Frame::new(i, 30, dir);
                std::fs::write(&frame.raster_path, b"png").unwrap();
                frame
            })
            .collect()
    }

    #[test]
    fn contiguous_frames_validate() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), 5);
        assert_eq!(validate_frames(&frames).unwrap(), dir.path());
    }

    #[test]
    fn empty_sequence_is_rejected() {
        let err = validate_frames(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::AssemblyFailure { .. }));
    }

    #[test]
    fn gaps_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut frames = write_frames(dir.path(), 5);
        frames.remove(2);
        let err = validate_frames(&frames).unwrap_err();
        assert!(err.to_string().contains("expected index 2, found 3"));
    }

    #[test]
    fn missing_or_empty_rasters_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), 3);
        std::fs::write(&frames[1].raster_path, b"").unwrap();
        assert!(validate_frames(&frames).is_err());

        std::fs::remove_file(&frames[1].raster_path).unwrap();
        assert!(validate_frames(&frames).is_err());
    }

    #[test]
    fn off_by_one_frame_is_within_tolerance() {
        assert!(check_sync(120, 30, 4.0, 1).unwrap() < 1e-9);
        assert!((check_sync(121, 30, 4.0, 1).unwrap() - 1.0).abs() < 1e-9);
        assert!((check_sync(119, 30, 4.0, 1).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn larger_drift_is_an_assembly_failure() {
        let err = check_sync(122, 30, 4.0, 1).unwrap_err();
        assert!(matches!(err, PipelineError::AssemblyFailure { .. }));
        assert!(check_sync(122, 30, 4.0, 2).is_ok());
    }

    #[test]
    fn partial_file_sits_next_to_output() {
        assert_eq!(
            partial_path(Path::new("outputs/NewsShort.mp4")),
            Path::new("outputs/NewsShort.mp4.part")
        );
    }

    #[test]
    fn missing_audio_fails_before_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let frames = write_frames(dir.path(), 3);
        let assembler = VideoAssembler::new(PipelineConfig::default());
        let out = dir.path().join("out/video.mp4");
        let err = assembler
            .assemble(&frames, &dir.path().join("missing.wav"), 30, &out)
            .unwrap_err();
        assert!(matches!(err, PipelineError::AssemblyFailure { .. }));
        assert!(!out.exists());
    }
}
