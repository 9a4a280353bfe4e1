//! Word-level caption timing derived from narration length.
//!
//! Each whitespace-delimited word gets a share of the audio duration
//! proportional to its character count. This is not forced alignment: it
//! assumes a uniform speaking rate per character, with no pause allowance
//! around punctuation and no per-word minimum.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

impl WordTiming {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Split `text` on whitespace and spread `total_duration` seconds over the words.
///
/// Empty text yields no timings. Text that is non-empty but contains no
/// characters outside whitespace is rejected, as is a non-positive duration.
pub fn estimate(text: &str, total_duration: f64) -> PipelineResult<Vec<WordTiming>> {
    if text.is_empty() {
        return Ok(Vec::new());
    }
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(PipelineError::invalid(format!(
            "total duration must be positive, got {total_duration}"
        )));
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    if total_chars == 0 {
        return Err(PipelineError::invalid("narration text is only whitespace"));
    }

    let mut timings = Vec::with_capacity(words.len());
    let mut clock = 0.0_f64;
    let mut chars_so_far = 0usize;
    for word in words {
        chars_so_far += word.chars().count();
        let start = clock;
        // Cumulative share: the last word ends exactly at `total_duration`.
        let end = chars_so_far as f64 / total_chars as f64 * total_duration;
        timings.push(WordTiming {
            word: word.to_string(),
            start,
            end,
        });
        clock = end;
    }
    Ok(timings)
}

/// Index of the word being spoken at `t`, if any.
pub fn active_word(timings: &[WordTiming], t: f64) -> Option<usize> {
    let idx = timings.partition_point(|w| w.end <= t);
    timings.get(idx).filter(|w| w.start <= t).map(|_| idx)
}
