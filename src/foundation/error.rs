/// Result alias used across the crate.
pub type SuiteResult<T> = Result<T, SuiteError>;

/// Errors surfaced to callers of the animation, dispatch, and project APIs.
#[derive(thiserror::Error, Debug)]
pub enum SuiteError {
    /// Invalid setup: bad durations, option values, vector lengths, or template bindings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Dispatch was attempted before the worker pool was started.
    #[error("not ready: {0}")]
    NotReady(String),

    /// Submission was attempted after the worker pool began shutting down.
    #[error("queue closed: the worker pool is stopping and accepts no new tasks")]
    QueueClosed,

    /// A synchronous render failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Project files could not be decoded.
    #[error("serialization error: {0}")]
    Serde(String),

    /// I/O and other context-carrying failures.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SuiteError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for setup mistakes, including dispatching to a pool that was never started.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::NotReady(_))
    }
}

/// Failure reported by a [`Renderer`](crate::render::Renderer) for one task.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("render error: {message}")]
pub struct RenderError {
    /// Short description of what failed.
    pub message: String,
    /// Exit status of the external process, when one ran.
    pub status: Option<i32>,
    /// Diagnostic output captured from the renderer (stderr for POV-Ray).
    pub diagnostics: String,
}

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            diagnostics: String::new(),
        }
    }

    pub fn with_status(mut self, status: Option<i32>) -> Self {
        self.status = status;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: impl Into<String>) -> Self {
        self.diagnostics = diagnostics.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            SuiteError::configuration("x")
                .to_string()
                .contains("configuration error:")
        );
        assert!(SuiteError::not_ready("x").to_string().contains("not ready:"));
        assert!(SuiteError::QueueClosed.to_string().contains("queue closed"));
        assert!(
            SuiteError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
        assert!(
            SuiteError::from(RenderError::new("x"))
                .to_string()
                .contains("render error:")
        );
    }

    #[test]
    fn not_ready_counts_as_configuration() {
        assert!(SuiteError::not_ready("pool").is_configuration());
        assert!(SuiteError::configuration("dur").is_configuration());
        assert!(!SuiteError::QueueClosed.is_configuration());
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = SuiteError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn render_error_carries_diagnostics() {
        let err = RenderError::new("povray exited")
            .with_status(Some(2))
            .with_diagnostics("Parse Error: missing brace");
        assert_eq!(err.status, Some(2));
        assert!(err.diagnostics.contains("missing brace"));
    }
}
