//! Move-by-move replay of a game into plies with pre/post positions.

use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::uci::UciMove;
use shakmaty::{Board, CastlingMode, Chess, EnPassantMode, Piece, Position, Square};

use crate::error::ParseError;

/// One half-move with the board state immediately before it.
#[derive(Debug, Clone)]
pub struct PlyMove {
    /// 1-based ply index (odd = white)
    pub ply: usize,
    /// Move as written in the game record
    pub san: String,
    /// Coordinate notation; castling uses the king's destination (e1g1)
    pub uci: String,
    pub from: String,
    pub to: String,
    pub fen_before: String,
    pub fen_after: String,
    pub board_before: Board,
}

impl PlyMove {
    /// Full-move number this ply belongs to.
    pub fn move_number(&self) -> usize {
        self.ply.div_ceil(2)
    }

    /// Piece standing on `square` before this ply was played.
    pub fn occupant(&self, square: Square) -> Option<Piece> {
        self.board_before.piece_at(square)
    }
}

fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Play `(text, san)` pairs from the standard start position.
pub(crate) fn replay(sans: &[(String, SanPlus)]) -> Result<Vec<PlyMove>, ParseError> {
    let mut pos = Chess::default();
    let mut plies = Vec::with_capacity(sans.len());

    for (i, (text, san_plus)) in sans.iter().enumerate() {
        let ply = i + 1;
        let mv = san_plus.san.to_move(&pos).map_err(|_| ParseError::IllegalMove {
            ply,
            san: text.clone(),
        })?;

        let uci = mv.to_uci(CastlingMode::Standard);
        let (from, to) = match &uci {
            UciMove::Normal { from, to, .. } => (from.to_string(), to.to_string()),
            _ => {
                return Err(ParseError::IllegalMove {
                    ply,
                    san: text.clone(),
                })
            }
        };

        let fen_before = fen_of(&pos);
        let board_before = pos.board().clone();
        pos.play_unchecked(mv);

        plies.push(PlyMove {
            ply,
            san: text.clone(),
            uci: uci.to_string(),
            from,
            to,
            fen_before,
            fen_after: fen_of(&pos),
            board_before,
        });
    }

    Ok(plies)
}

#[cfg(test)]
mod tests {
    use shakmaty::{Color, Role};

    use crate::pgn::replay_pgn;

    #[test]
    fn test_castling_uses_king_squares() {
        let plies = replay_pgn("1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. O-O Nf6").unwrap();
        let castle = &plies[6];
        assert_eq!(castle.san, "O-O");
        assert_eq!(castle.uci, "e1g1");
        assert_eq!((castle.from.as_str(), castle.to.as_str()), ("e1", "g1"));
    }

    #[test]
    fn test_positions_chain() {
        let plies = replay_pgn("1. d4 d5 2. c4").unwrap();
        assert_eq!(plies[0].fen_after, plies[1].fen_before);
        assert_eq!(plies[1].fen_after, plies[2].fen_before);
        assert!(plies[2].fen_after.contains(" b "));
        assert_eq!(plies[2].move_number(), 2);
        assert_eq!(plies[1].move_number(), 1);
    }

    #[test]
    fn test_occupant_reads_pre_move_board() {
        let plies = replay_pgn("1. e4 d5 2. exd5").unwrap();
        let capture = &plies[2];
        let piece = capture.occupant(shakmaty::Square::D5).unwrap();
        assert_eq!(piece.role, Role::Pawn);
        assert_eq!(piece.color, Color::Black);
        assert!(capture.occupant(shakmaty::Square::H5).is_none());
    }

    #[test]
    fn test_promotion_uci() {
        let pgn = "1. h4 g5 2. hxg5 h6 3. gxh6 Nf6 4. h7 Ng8 5. hxg8=Q";
        let plies = replay_pgn(pgn).unwrap();
        assert_eq!(plies.last().unwrap().uci, "h7g8q");
    }
}
