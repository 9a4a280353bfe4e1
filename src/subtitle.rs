use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::timing::WordTiming;

/// Write one SRT cue per word.
pub fn write_srt(path: &Path, timings: &[WordTiming]) -> anyhow::Result<()> {
    let mut f = BufWriter::new(File::create(path)?);
    write_cues(&mut f, timings)?;
    f.flush()?;
    Ok(())
}

fn write_cues(out: &mut impl Write, timings: &[WordTiming]) -> std::io::Result<()> {
    for (i, timing) in timings.iter().enumerate() {
        writeln!(out, "{}", i + 1)?;
        writeln!(
            out,
            "{} --> {}",
            format_srt_time(timing.start),
            format_srt_time(timing.end)
        )?;
        writeln!(out, "{}", timing.word)?;
        writeln!(out)?;
    }
    Ok(())
}

fn format_srt_time(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}
