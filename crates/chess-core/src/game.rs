use crate::error::ParseError;
use crate::game_data::{GameRecord, GameResult, PlayerColor};
use crate::pgn;
use crate::ply::PlyMove;

/// A game normalised relative to the analysed player.
#[derive(Debug, Clone)]
pub struct ParsedGame {
    pub player_color: PlayerColor,
    pub opponent: String,
    pub result: GameResult,
    /// Empty when the movetext could not be replayed
    pub plies: Vec<PlyMove>,
    pub parse_error: Option<ParseError>,
}

impl ParsedGame {
    /// Number of plies that belong to the analysed player.
    pub fn player_ply_count(&self) -> usize {
        self.plies
            .iter()
            .filter(|p| self.player_color.owns_ply(p.ply))
            .count()
    }
}

/// Normalise `record` for `username`.
///
/// Never fails: a record whose movetext cannot be replayed comes back with no
/// plies and the reason in `parse_error`.
pub fn parse_game(record: &GameRecord, username: &str) -> ParsedGame {
    let player_color = if record.white.eq_ignore_ascii_case(username) {
        PlayerColor::White
    } else {
        PlayerColor::Black
    };

    let opponent = match player_color {
        PlayerColor::White => record.black.clone(),
        PlayerColor::Black => record.white.clone(),
    };

    let result = GameResult::from_marker(&record.result, player_color);

    let (plies, parse_error) = match pgn::replay_pgn(&record.pgn) {
        Ok(plies) => (plies, None),
        Err(e) => (Vec::new(), Some(e)),
    };

    ParsedGame {
        player_color,
        opponent,
        result,
        plies,
        parse_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_data::TimeClass;

    fn record(pgn: &str) -> GameRecord {
        GameRecord::new(pgn, "MagnusFan", "Opponent99", "https://chess.example/g/1", TimeClass::Blitz)
    }

    #[test]
    fn test_player_color_is_case_insensitive() {
        let game = parse_game(&record("[Result \"1-0\"]\n\n1. e4 e5 1-0"), "magnusfan");
        assert_eq!(game.player_color, PlayerColor::White);
        assert_eq!(game.opponent, "Opponent99");
        assert_eq!(game.result, GameResult::Win);
        assert_eq!(game.plies.len(), 2);
        assert_eq!(game.player_ply_count(), 1);
    }

    #[test]
    fn test_unknown_username_defaults_to_black() {
        let game = parse_game(&record("[Result \"1-0\"]\n\n1. e4 e5 2. Nf3 1-0"), "someone_else");
        assert_eq!(game.player_color, PlayerColor::Black);
        assert_eq!(game.opponent, "MagnusFan");
        assert_eq!(game.result, GameResult::Loss);
        assert_eq!(game.player_ply_count(), 1);
    }

    #[test]
    fn test_corrupt_movetext_yields_no_plies() {
        let game = parse_game(&record("[Result \"0-1\"]\n\n1. e4 e5 2. Qxz9"), "MagnusFan");
        assert!(game.plies.is_empty());
        assert!(game.parse_error.is_some());
        assert_eq!(game.result, GameResult::Loss);
    }
}
