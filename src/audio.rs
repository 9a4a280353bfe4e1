use std::path::Path;
use std::process::Command;

use anyhow::Context;
use hound::WavReader;

use crate::config::PipelineConfig;

/// Duration of the narration track in seconds.
///
/// WAV is measured directly; other containers go through ffprobe.
pub fn duration_seconds(path: &Path, config: &PipelineConfig) -> anyhow::Result<f64> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
    let duration = if is_wav {
        wav_duration_seconds(path)?
    } else {
        probe_duration_seconds(&config.ffprobe, path)?
    };
    anyhow::ensure!(
        duration.is_finite() && duration > 0.0,
        "audio {} has no usable duration ({duration})",
        path.display()
    );
    Ok(duration)
}

pub fn wav_duration_seconds(path: &Path) -> anyhow::Result<f64> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open wav {}", path.display()))?;
    let spec = reader.spec();
    let samples = reader.len();
    let frames = samples as f64 / spec.channels as f64;
    let duration = frames / spec.sample_rate as f64;
    Ok(duration)
}

pub fn probe_duration_seconds(ffprobe: &str, path: &Path) -> anyhow::Result<f64> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| format!("failed to run {ffprobe} for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "{ffprobe} failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse()
        .with_context(|| format!("failed to parse duration '{}'", stdout.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    fn write_silence(path: &Path, channels: u16, sample_rate: u32, seconds: f64) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        let samples = (seconds * sample_rate as f64) as usize * channels as usize;
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn wav_duration_accounts_for_channels() {
        let dir = tempfile::tempdir().unwrap();
        let mono = dir.path().join("mono.wav");
        let stereo = dir.path().join("stereo.WAV");
        write_silence(&mono, 1, 8000, 1.5);
        write_silence(&stereo, 2, 16000, 0.25);

        let cfg = PipelineConfig::default();
        assert!((duration_seconds(&mono, &cfg).unwrap() - 1.5).abs() < 1e-9);
        assert!((duration_seconds(&stereo, &cfg).unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn empty_wav_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        write_silence(&path, 1, 8000, 0.0);
        assert!(duration_seconds(&path, &PipelineConfig::default()).is_err());
    }

    #[test]
    fn missing_probe_binary_is_an_error() {
        let err = probe_duration_seconds("definitely-not-ffprobe", Path::new("x.mp3"));
        assert!(err.is_err());
    }
}
