//! Batch orchestration: fetch a player's games, scan them in order on one
//! engine session and release the session afterwards.

use chess_core::{parse_game, GameRecord};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::detector::{Blunder, BlunderDetector, GameAnalysis};
use crate::error::AnalyzerError;
use crate::report::TimeClassFilter;
use crate::source::GameSource;
use crate::stockfish::{EngineSession, EngineTransport};

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// All blunders, game order then ply order
    pub blunders: Vec<Blunder>,
    pub games_analyzed: usize,
    /// Games whose movetext could not be replayed
    pub games_skipped: usize,
    pub analyses: Vec<GameAnalysis>,
}

/// Analyze the recent games of `username`. The engine session is destroyed
/// before returning, whatever the outcome.
pub async fn analyze_player<S, T>(
    source: &S,
    engine: &mut EngineSession<T>,
    config: &AnalyzerConfig,
    username: &str,
    filter: TimeClassFilter,
) -> Result<BatchResult, AnalyzerError>
where
    S: GameSource,
    T: EngineTransport,
{
    let result = run_batch(source, engine, config, username, filter).await;
    engine.destroy().await;
    result
}

async fn run_batch<S, T>(
    source: &S,
    engine: &mut EngineSession<T>,
    config: &AnalyzerConfig,
    username: &str,
    filter: TimeClassFilter,
) -> Result<BatchResult, AnalyzerError>
where
    S: GameSource,
    T: EngineTransport,
{
    // Over-fetch so a time-class filter still leaves enough games
    let games = source
        .recent_games(username, config.games_to_analyze * 2)
        .await?;
    let selected = select_games(games, filter, config.games_to_analyze);

    if selected.is_empty() {
        let label = filter.map(|tc| format!("{tc} ")).unwrap_or_default();
        return Err(AnalyzerError::NoMatchingGames(label));
    }

    let total = selected.len();
    info!(username, games = total, "Starting blunder analysis");

    let detector = BlunderDetector::new(config.analysis_depth, config.blunder_threshold);
    let mut batch = BatchResult::default();

    for (i, record) in selected.iter().enumerate() {
        info!(game = i + 1, total, game_url = %record.url, "Analyzing game");

        let parsed = parse_game(record, username);
        if parsed.parse_error.is_some() {
            batch.games_skipped += 1;
        } else {
            batch.games_analyzed += 1;
        }

        let analysis = detector.analyze_game(&mut *engine, record, &parsed).await?;
        if analysis.failed_evaluations > 0 {
            warn!(
                game_url = %record.url,
                failed = analysis.failed_evaluations,
                "Some positions could not be evaluated"
            );
        }
        batch.blunders.extend(analysis.blunders.iter().cloned());
        batch.analyses.push(analysis);
    }

    info!(
        username,
        analyzed = batch.games_analyzed,
        skipped = batch.games_skipped,
        blunders = batch.blunders.len(),
        "Analysis complete"
    );
    Ok(batch)
}

/// Keep the first `limit` games matching the filter, preserving source order.
pub fn select_games(
    games: Vec<GameRecord>,
    filter: TimeClassFilter,
    limit: usize,
) -> Vec<GameRecord> {
    games
        .into_iter()
        .filter(|g| filter.map_or(true, |tc| g.time_class == tc))
        .take(limit)
        .collect()
}
