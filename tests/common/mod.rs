use std::collections::HashMap;

use blunder_analyzer::error::SourceError;
use blunder_analyzer::stockfish::{ChannelTransport, EngineTransport};
use blunder_analyzer::{AnalyzerConfig, EngineSession, EngineSettings, GameSource};
use chess_core::GameRecord;

pub const PLAYER: &str = "Blindspot";

/// Scripted UCI engine on the far end of a channel. Every search answers with
/// the centipawn score registered for its FEN (0 otherwise) and `a2a3`.
async fn fake_engine(mut end: ChannelTransport, scores: HashMap<String, i32>) {
    let mut fen = String::new();
    while let Ok(Some(cmd)) = end.recv().await {
        let replies = if cmd == "uci" {
            vec!["id name Fake".to_string(), "uciok".to_string()]
        } else if cmd == "isready" {
            vec!["readyok".to_string()]
        } else if let Some(f) = cmd.strip_prefix("position fen ") {
            fen = f.to_string();
            vec![]
        } else if cmd.starts_with("go") {
            let cp = scores.get(&fen).copied().unwrap_or(0);
            vec![
                format!("info depth 12 score cp {cp} pv a2a3"),
                "bestmove a2a3".to_string(),
            ]
        } else {
            vec![]
        };
        for reply in replies {
            if end.send(&reply).await.is_err() {
                return;
            }
        }
    }
}

/// Engine session backed by [`fake_engine`].
pub fn scripted_engine(scores: HashMap<String, i32>) -> EngineSession<ChannelTransport> {
    let (client, end) = ChannelTransport::pair();
    tokio::spawn(fake_engine(end, scores));
    EngineSession::new(client, EngineSettings::default())
}

/// Engine session whose process is already gone.
pub fn dead_engine() -> EngineSession<ChannelTransport> {
    let (client, end) = ChannelTransport::pair();
    drop(end);
    EngineSession::new(client, EngineSettings::default())
}

pub enum StubSource {
    Games(Vec<GameRecord>),
    UnknownPlayer,
}

impl GameSource for StubSource {
    async fn recent_games(&self, username: &str, limit: usize) -> Result<Vec<GameRecord>, SourceError> {
        match self {
            StubSource::Games(games) => Ok(games.iter().take(limit).cloned().collect()),
            StubSource::UnknownPlayer => Err(SourceError::PlayerNotFound(username.to_string())),
        }
    }
}

/// Defaults, as if no environment variable were set.
pub fn default_config() -> AnalyzerConfig {
    AnalyzerConfig::from_lookup(|_| None).unwrap()
}

