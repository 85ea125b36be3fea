use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pgn;

/// Time-control class, ordered fastest to slowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeClass {
    Bullet,
    Blitz,
    Rapid,
    Daily,
}

impl TimeClass {
    pub const ALL: [TimeClass; 4] = [
        TimeClass::Bullet,
        TimeClass::Blitz,
        TimeClass::Rapid,
        TimeClass::Daily,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeClass::Bullet => "bullet",
            TimeClass::Blitz => "blitz",
            TimeClass::Rapid => "rapid",
            TimeClass::Daily => "daily",
        }
    }

    /// Lenient mapping for labels coming from a game source.
    /// Anything unrecognised is treated as rapid.
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(TimeClass::Rapid)
    }
}

impl FromStr for TimeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullet" => Ok(TimeClass::Bullet),
            "blitz" => Ok(TimeClass::Blitz),
            "rapid" => Ok(TimeClass::Rapid),
            "daily" => Ok(TimeClass::Daily),
            other => Err(format!("unknown time class '{other}'")),
        }
    }
}

impl fmt::Display for TimeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    White,
    Black,
}

impl PlayerColor {
    /// Whether the 1-based `ply` was played by this color (odd plies are white's).
    pub fn owns_ply(&self, ply: usize) -> bool {
        match self {
            PlayerColor::White => ply % 2 == 1,
            PlayerColor::Black => ply % 2 == 0,
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            PlayerColor::White => PlayerColor::Black,
            PlayerColor::Black => PlayerColor::White,
        }
    }
}

/// Outcome from the analysed player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Win,
    Loss,
    Draw,
}

impl GameResult {
    /// Interpret a PGN outcome marker for `color`. Unfinished (`*`) and
    /// unknown markers count as draws.
    pub fn from_marker(marker: &str, color: PlayerColor) -> Self {
        match (marker.trim(), color) {
            ("1-0", PlayerColor::White) | ("0-1", PlayerColor::Black) => GameResult::Win,
            ("1-0", PlayerColor::Black) | ("0-1", PlayerColor::White) => GameResult::Loss,
            _ => GameResult::Draw,
        }
    }
}

/// One finished game as delivered by a game source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Full PGN transcript (headers and SAN movetext)
    pub pgn: String,
    pub white: String,
    pub black: String,
    pub url: String,
    pub time_class: TimeClass,
    /// Declared outcome marker: "1-0", "0-1", "1/2-1/2" or "*"
    pub result: String,
}

impl GameRecord {
    /// Build a record, reading the declared result from the PGN `Result` header.
    pub fn new(
        pgn: impl Into<String>,
        white: impl Into<String>,
        black: impl Into<String>,
        url: impl Into<String>,
        time_class: TimeClass,
    ) -> Self {
        let pgn = pgn.into();
        let result = pgn::extract_header(&pgn, "Result").unwrap_or_else(|| "*".to_string());
        Self {
            pgn,
            white: white.into(),
            black: black.into(),
            url: url.into(),
            time_class,
            result,
        }
    }
}
