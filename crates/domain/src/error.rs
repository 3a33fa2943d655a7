use crate::agent::Bounds;

/// Shared error type used across all SurfGrid crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    #[error("config: {0}")]
    Config(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("slot {0} is occupied")]
    SlotOccupied(usize),

    #[error("invalid bounds: {0}")]
    InvalidBounds(Bounds),

    #[error("no transcript for agent {agent_id}, video {video_id}")]
    TranscriptUnavailable { agent_id: String, video_id: String },

    #[error("LLM unavailable: {0}")]
    LlmUnavailable(String),

    #[error("browser: {0}")]
    Browser(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
