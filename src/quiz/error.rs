use thiserror::Error;

use crate::quiz::round::RoundPhase;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("cannot {action} while round is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: RoundPhase,
    },

    #[error("no quiz session in progress")]
    NoSession,

    #[error("session is finished")]
    SessionFinished,

    #[error("volume {0} is outside 0.0..=1.0")]
    InvalidVolume(f32),

    #[error("invalid alias table: {0}")]
    AliasTable(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("track has no preview")]
    NoPreview,

    #[error("playback rejected: {0}")]
    Rejected(String),
}
