use thiserror::Error;

/// Rejected frame input. None of these are fatal: the detector logs and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QualityError {
    #[error("presented frame count went backwards ({previous} -> {current})")]
    FrameCountRegressed { previous: u64, current: u64 },

    #[error("presentation time went backwards ({previous_ms}ms -> {current_ms}ms)")]
    PresentationTimeRegressed { previous_ms: f64, current_ms: f64 },

    /// Total frame-count mass of the window is zero, so no average exists.
    #[error("delay window holds no presented frames")]
    EmptyWindow,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Returned by a listener to signal that it could not handle an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("reactor channel closed")]
    ChannelClosed,
}
