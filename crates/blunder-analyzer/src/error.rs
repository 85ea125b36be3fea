//! Analyzer error types

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to spawn engine: {0}")]
    Spawn(String),

    #[error("Engine I/O error: {0}")]
    Io(String),

    #[error("Engine did not finish the UCI handshake within {0:?}")]
    HandshakeTimeout(Duration),

    #[error("Engine session closed")]
    SessionClosed,

    #[error("Engine session was destroyed")]
    SessionDestroyed,
}

impl EngineError {
    /// Errors after which the session cannot answer any further query.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EngineError::Io(_))
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Player \"{0}\" not found on chess.com")]
    PlayerNotFound(String),

    #[error("No recent games found for \"{0}\"")]
    NoRecentGames(String),

    #[error("Failed to fetch games: {0}")]
    Fetch(String),
}

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("No {0}games found.")]
    NoMatchingGames(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
