//! Error kinds reported by the video core.

use std::fmt;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The three ways a Timing -> Render -> Assemble run can fail.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("scene render failed{}", AtFrame(.frame_index))]
    RenderFailure {
        frame_index: Option<usize>,
        #[source]
        source: BoxError,
    },

    #[error("video assembly failed: {message}")]
    AssemblyFailure {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn render(frame_index: Option<usize>, source: impl Into<BoxError>) -> Self {
        Self::RenderFailure {
            frame_index,
            source: source.into(),
        }
    }

    pub fn assembly(msg: impl Into<String>) -> Self {
        Self::AssemblyFailure {
            message: msg.into(),
            source: None,
        }
    }

    pub fn assembly_with(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::AssemblyFailure {
            message: msg.into(),
            source: Some(source.into()),
        }
    }

    /// Frame index of a render failure, if the failure happened during capture.
    pub fn frame_index(&self) -> Option<usize> {
        match self {
            Self::RenderFailure { frame_index, .. } => *frame_index,
            _ => None,
        }
    }
}

struct AtFrame<'a>(&'a Option<usize>);

impl fmt::Display for AtFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(i) => write!(f, " at frame {i}"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_failure_names_the_frame() {
        let err = PipelineError::render(Some(57), anyhow::anyhow!("screenshot timed out"));
        assert_eq!(err.to_string(), "scene render failed at frame 57");
        assert_eq!(err.frame_index(), Some(57));
        let cause = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(cause.as_deref(), Some("screenshot timed out"));
    }

    #[test]
    fn launch_failure_has_no_frame() {
        let err = PipelineError::render(None, anyhow::anyhow!("no chromium"));
        assert_eq!(err.to_string(), "scene render failed");
        assert_eq!(err.frame_index(), None);
    }
}
