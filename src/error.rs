use thiserror::Error;

/// Engine-level errors using thiserror for structured error handling.
///
/// These errors represent failures at the edges of the engine (backend
/// resource setup, configuration I/O). They provide context and can be
/// chained with anyhow. The orchestration core itself never errors: missing
/// clips, redundant commands and invalid output resources are all handled
/// locally and surfaced as `None` returns, no-ops or log lines.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio clip: {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to decode audio format")]
    DecodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to initialize audio output stream")]
    StreamInitFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Audio playback failed")]
    PlaybackFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("No clip data registered for content handle: {0}")]
    UnknownContent(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
