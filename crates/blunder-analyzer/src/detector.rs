//! Blunder detection: replay a game ply by ply, track a player-perspective
//! evaluation baseline and flag player moves that drop it past the threshold.
//!
//! UCI engines score from the side to move. After an opponent ply the player
//! is to move, so the raw score is already player-perspective. After a player
//! ply the opponent is to move and the score has to be negated.

use chess_core::{GameRecord, GameResult, ParsedGame, PlayerColor, PlyMove, TimeClass};
use serde::{Deserialize, Serialize};
use shakmaty::Square;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::stockfish::{EngineMove, EvalResult, Evaluator};

/// Minimum evaluation drop (centipawns) for a move to count as a blunder
pub const BLUNDER_THRESHOLD: i32 = 200;

/// Default search depth per position
pub const ANALYSIS_DEPTH: u32 = 12;

/// Last full move still counted as opening
const OPENING_LAST_MOVE: usize = 10;

/// First full move counted as endgame
const ENDGAME_FIRST_MOVE: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    pub const ALL: [GamePhase; 3] = [GamePhase::Opening, GamePhase::Middlegame, GamePhase::Endgame];

    /// Coarse phase from the full-move number alone.
    pub fn from_move_number(move_number: usize) -> Self {
        if move_number <= OPENING_LAST_MOVE {
            GamePhase::Opening
        } else if move_number >= ENDGAME_FIRST_MOVE {
            GamePhase::Endgame
        } else {
            GamePhase::Middlegame
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Opening => "opening",
            GamePhase::Middlegame => "middlegame",
            GamePhase::Endgame => "endgame",
        }
    }
}

/// A player move that lost at least [`BLUNDER_THRESHOLD`] centipawns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blunder {
    /// Position before the blunder
    pub fen: String,
    pub move_played: String,
    pub move_from: String,
    pub move_to: String,
    /// Engine's preferred move in the same position
    pub best_move: Option<EngineMove>,
    /// Player-perspective evaluation before the move
    pub eval_before: i32,
    /// Player-perspective evaluation after the move
    pub eval_after: i32,
    pub eval_drop: i32,
    pub ply: usize,
    pub move_number: usize,
    pub player_color: PlayerColor,
    pub game_url: String,
    pub opponent: String,
    pub game_result: GameResult,
    pub time_class: TimeClass,
    /// K, Q, R, B, N or P
    pub piece_moved: char,
    pub was_capture: bool,
    pub best_move_was_capture: bool,
    pub game_phase: GamePhase,
    /// One of the engine answers behind this record timed out
    pub low_confidence: bool,
}

/// Evaluation of one player move, blunder or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEval {
    pub ply: usize,
    pub eval_before: i32,
    pub eval_after: i32,
    pub eval_drop: i32,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAnalysis {
    pub game_url: String,
    pub plies: usize,
    /// Plies that belong to the player
    pub player_moves: usize,
    /// One entry per player move whose evaluation succeeded
    pub evaluations: Vec<MoveEval>,
    pub blunders: Vec<Blunder>,
    /// Engine queries that failed and were skipped
    pub failed_evaluations: usize,
}

/// Which side's move the scan is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    AwaitingOpponentMove,
    AwaitingPlayerEval,
}

impl ScanState {
    fn for_ply(color: PlayerColor, ply: usize) -> Self {
        if color.owns_ply(ply) {
            ScanState::AwaitingPlayerEval
        } else {
            ScanState::AwaitingOpponentMove
        }
    }
}

/// Piece letter from SAN: explicit piece prefix, otherwise a pawn.
/// Castling counts as a king move.
pub fn piece_moved(san: &str) -> char {
    match san.chars().next() {
        Some(c @ ('K' | 'Q' | 'R' | 'B' | 'N')) => c,
        Some('O') => 'K',
        _ => 'P',
    }
}

pub fn is_capture(san: &str) -> bool {
    san.contains('x')
}

#[derive(Debug, Clone, Copy)]
pub struct BlunderDetector {
    pub depth: u32,
    pub threshold: i32,
}

impl Default for BlunderDetector {
    fn default() -> Self {
        Self {
            depth: ANALYSIS_DEPTH,
            threshold: BLUNDER_THRESHOLD,
        }
    }
}

impl BlunderDetector {
    pub fn new(depth: u32, threshold: i32) -> Self {
        Self { depth, threshold }
    }

    /// Scan one game. Failed engine queries are skipped without advancing the
    /// baseline; only session-level failures abort the scan.
    pub async fn analyze_game<E: Evaluator>(
        &self,
        engine: &mut E,
        record: &GameRecord,
        parsed: &ParsedGame,
    ) -> Result<GameAnalysis, EngineError> {
        let mut analysis = GameAnalysis {
            game_url: record.url.clone(),
            plies: parsed.plies.len(),
            player_moves: parsed.player_ply_count(),
            evaluations: Vec::new(),
            blunders: Vec::new(),
            failed_evaluations: 0,
        };

        if let Some(err) = &parsed.parse_error {
            warn!(game_url = %record.url, error = %err, "Skipping unparseable game");
            return Ok(analysis);
        }

        // Neutral assumption before the first ply
        let mut baseline = 0;

        for ply in &parsed.plies {
            match ScanState::for_ply(parsed.player_color, ply.ply) {
                ScanState::AwaitingOpponentMove => {
                    match self.probe(engine, &ply.fen_after, ply.ply, record).await? {
                        Some(result) => baseline = result.score.centipawns(),
                        None => analysis.failed_evaluations += 1,
                    }
                }
                ScanState::AwaitingPlayerEval => {
                    let Some(result) = self.probe(engine, &ply.fen_after, ply.ply, record).await?
                    else {
                        analysis.failed_evaluations += 1;
                        continue;
                    };

                    let eval_after = -result.score.centipawns();
                    let eval_drop = baseline - eval_after;
                    analysis.evaluations.push(MoveEval {
                        ply: ply.ply,
                        eval_before: baseline,
                        eval_after,
                        eval_drop,
                        timed_out: result.timed_out,
                    });

                    if eval_drop >= self.threshold {
                        let best = self.probe(engine, &ply.fen_before, ply.ply, record).await?;
                        if best.is_none() {
                            analysis.failed_evaluations += 1;
                        }
                        let blunder =
                            build_blunder(record, parsed, ply, baseline, eval_after, &result, best);
                        info!(
                            game_url = %record.url,
                            ply = ply.ply,
                            san = %ply.san,
                            eval_drop,
                            "Blunder found"
                        );
                        analysis.blunders.push(blunder);
                    }

                    baseline = eval_after;
                }
            }
        }

        debug!(
            game_url = %record.url,
            plies = analysis.plies,
            evaluated = analysis.evaluations.len(),
            blunders = analysis.blunders.len(),
            "Game scanned"
        );
        Ok(analysis)
    }

    /// Evaluate one position, turning recoverable failures into `None`.
    async fn probe<E: Evaluator>(
        &self,
        engine: &mut E,
        fen: &str,
        ply: usize,
        record: &GameRecord,
    ) -> Result<Option<EvalResult>, EngineError> {
        match engine.evaluate(fen, self.depth).await {
            Ok(result) => {
                if result.timed_out {
                    warn!(game_url = %record.url, ply, "Evaluation timed out, using partial score");
                }
                Ok(Some(result))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(game_url = %record.url, ply, error = %e, "Evaluation failed, skipping ply");
                Ok(None)
            }
        }
    }
}

fn build_blunder(
    record: &GameRecord,
    parsed: &ParsedGame,
    ply: &PlyMove,
    eval_before: i32,
    eval_after: i32,
    after: &EvalResult,
    best: Option<EvalResult>,
) -> Blunder {
    let best_timed_out = best.as_ref().is_some_and(|b| b.timed_out);
    let best_move = best.and_then(|b| b.best_move);

    let best_move_was_capture = best_move
        .as_ref()
        .and_then(|mv| mv.to.parse::<Square>().ok())
        .is_some_and(|sq| ply.occupant(sq).is_some());

    let move_number = ply.move_number();

    Blunder {
        fen: ply.fen_before.clone(),
        move_played: ply.san.clone(),
        move_from: ply.from.clone(),
        move_to: ply.to.clone(),
        best_move,
        eval_before,
        eval_after,
        eval_drop: eval_before - eval_after,
        ply: ply.ply,
        move_number,
        player_color: parsed.player_color,
        game_url: record.url.clone(),
        opponent: parsed.opponent.clone(),
        game_result: parsed.result,
        time_class: record.time_class,
        piece_moved: piece_moved(&ply.san),
        was_capture: is_capture(&ply.san),
        best_move_was_capture,
        game_phase: GamePhase::from_move_number(move_number),
        low_confidence: after.timed_out || best_timed_out,
    }
}
