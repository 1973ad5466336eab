/// Result alias that carries the custom [`PlayerError`] type.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// Free-form failure, mostly used for poisoned shared state.
    #[error("{0}")]
    Message(String),
    /// Catalog or configuration data that violates an invariant.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The transport could not load or start a track.
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    /// The analysis session cannot be constructed or attached on this host.
    #[error("analysis unavailable: {0}")]
    AnalysisCapability(String),
    /// A second tap was connected to an output that already has one.
    #[error("output {output} already has an analysis tap attached")]
    TapConflict { output: u64 },
    #[error("fft failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PlayerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PlayerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PlayerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Failure reported by the media transport while loading or starting a track.
///
/// These never escape the controller as faults; they are absorbed, logged and
/// queued as [`crate::PlaybackEvent::Failed`] for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("failed to load `{url}`: {reason}")]
    Load { url: String, reason: String },
    #[error("failed to start `{url}`: {reason}")]
    Start { url: String, reason: String },
    #[error("loading `{url}` stalled before the media became ready")]
    Stalled { url: String },
}

impl PlaybackError {
    pub fn load(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Load {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn start(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Start {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Source URL of the media that failed.
    pub fn url(&self) -> &str {
        match self {
            Self::Load { url, .. } | Self::Start { url, .. } | Self::Stalled { url } => url,
        }
    }
}
