//! Game records, PGN handling and move replay shared by the analyzer crates.

pub mod error;
pub mod game;
pub mod game_data;
pub mod pgn;
pub mod ply;

pub use error::ParseError;
pub use game::{parse_game, ParsedGame};
pub use game_data::{GameRecord, GameResult, PlayerColor, TimeClass};
pub use ply::PlyMove;
