//! Blunder analysis for chess.com players
//!
//! Replays recent games, scores every position with a UCI engine and
//! aggregates the moves that threw away a large part of the evaluation.

pub mod batch;
pub mod config;
pub mod detector;
pub mod error;
pub mod insights;
pub mod report;
pub mod source;
pub mod stockfish;

pub use batch::{analyze_player, BatchResult};
pub use config::{AnalyzerConfig, CliArgs};
pub use detector::{Blunder, BlunderDetector, GameAnalysis, GamePhase};
pub use error::{AnalyzerError, EngineError, SourceError};
pub use report::{BlunderReport, BlunderStats, TimeClassFilter, ViewMode};
pub use source::{ChessComSource, GameSource};
pub use stockfish::{EngineSession, EngineSettings, EvalResult, Evaluator, Score};
