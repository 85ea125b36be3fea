use thiserror::Error;

/// Reasons a stored game cannot be replayed move by move.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Game starts from a non-standard position: {0}")]
    NonStandardStart(String),

    #[error("Unreadable move token '{token}' at ply {ply}")]
    InvalidToken { ply: usize, token: String },

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove { ply: usize, san: String },
}
