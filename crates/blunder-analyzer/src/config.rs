//! Analyzer configuration from environment variables and command line arguments

use std::env;
use std::time::Duration;

use chess_core::TimeClass;
use clap::Parser;

use crate::detector::{ANALYSIS_DEPTH, BLUNDER_THRESHOLD};
use crate::error::AnalyzerError;
use crate::report::{TimeClassFilter, ViewMode, MAX_BLUNDERS_TO_SHOW};
use crate::source::CHESS_COM_BASE_URL;
use crate::stockfish::{EngineSettings, DEFAULT_EVAL_TIMEOUT, DEFAULT_HANDSHAKE_TIMEOUT};

/// Games analyzed per run
pub const GAMES_TO_ANALYZE: usize = 10;

#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Search depth per position
    pub analysis_depth: u32,

    /// Per-evaluation timeout in seconds
    pub engine_timeout_secs: u64,

    /// Stockfish `Threads` option
    pub engine_threads: u32,

    /// Stockfish `Hash` option in MB
    pub engine_hash_mb: u32,

    /// Minimum centipawn drop for a blunder
    pub blunder_threshold: i32,

    /// Games analyzed per batch
    pub games_to_analyze: usize,

    /// Size of the worst-blunders view
    pub worst_blunders: usize,

    /// chess.com API root, overridable for local mirrors
    pub chess_com_base_url: String,
}

impl AnalyzerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, AnalyzerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AnalyzerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let stockfish_path = lookup("STOCKFISH_PATH")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "/usr/local/bin/stockfish".to_string());

        let chess_com_base_url = lookup("CHESS_COM_BASE_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| CHESS_COM_BASE_URL.to_string());

        let blunder_threshold = lookup("BLUNDER_THRESHOLD")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(BLUNDER_THRESHOLD);

        let config = Self {
            stockfish_path,
            analysis_depth: number("ANALYSIS_DEPTH").map_or(ANALYSIS_DEPTH, |v| v as u32),
            engine_timeout_secs: number("ENGINE_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_EVAL_TIMEOUT.as_secs()),
            engine_threads: number("ENGINE_THREADS").map_or(1, |v| v as u32),
            engine_hash_mb: number("ENGINE_HASH_MB").map_or(64, |v| v as u32),
            blunder_threshold,
            games_to_analyze: number("GAMES_TO_ANALYZE").map_or(GAMES_TO_ANALYZE, |v| v as usize),
            worst_blunders: number("WORST_BLUNDERS").map_or(MAX_BLUNDERS_TO_SHOW, |v| v as usize),
            chess_com_base_url,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AnalyzerError> {
        if self.analysis_depth == 0 {
            return Err(AnalyzerError::Config("ANALYSIS_DEPTH must be at least 1".into()));
        }
        if self.engine_timeout_secs == 0 {
            return Err(AnalyzerError::Config("ENGINE_TIMEOUT_SECS must be at least 1".into()));
        }
        if self.blunder_threshold <= 0 {
            return Err(AnalyzerError::Config("BLUNDER_THRESHOLD must be positive".into()));
        }
        if self.games_to_analyze == 0 {
            return Err(AnalyzerError::Config("GAMES_TO_ANALYZE must be at least 1".into()));
        }
        Ok(())
    }

    /// Session settings for the configured engine.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            eval_timeout: Duration::from_secs(self.engine_timeout_secs),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            options: vec![
                ("Threads".to_string(), self.engine_threads.to_string()),
                ("Hash".to_string(), self.engine_hash_mb.to_string()),
            ],
        }
    }
}

/// Command line arguments
#[derive(Parser, Clone, Debug, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// chess.com username
    #[arg(value_parser = parse_username)]
    pub username: String,

    /// bullet, blitz, rapid, daily or all
    #[arg(
        long = "time-class",
        value_name = "CLASS",
        default_value = "all",
        value_parser = parse_time_class_filter
    )]
    pub time_class: TimeClassFilter,

    /// Games to analyze, overrides GAMES_TO_ANALYZE
    #[arg(long, value_name = "N", value_parser = parse_game_count)]
    pub games: Option<usize>,

    /// Group blunders per game instead of listing the worst ones
    #[arg(long = "by-game", default_value_t = false)]
    pub by_game: bool,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl CliArgs {
    pub fn view(&self) -> ViewMode {
        if self.by_game {
            ViewMode::ByGame
        } else {
            ViewMode::Overall
        }
    }
}

fn parse_username(value: &str) -> Result<String, String> {
    let name = value.trim();
    if name.is_empty() {
        return Err("username must not be empty".into());
    }
    Ok(name.to_string())
}

fn parse_game_count(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("expected a positive number, got '{value}'")),
    }
}

/// `all` selects every time class.
pub fn parse_time_class_filter(value: &str) -> Result<TimeClassFilter, String> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    value.parse::<TimeClass>().map(Some)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AnalyzerConfig, AnalyzerError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AnalyzerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.stockfish_path, "/usr/local/bin/stockfish");
        assert_eq!(config.analysis_depth, 12);
        assert_eq!(config.engine_timeout_secs, 10);
        assert_eq!(config.blunder_threshold, 200);
        assert_eq!(config.games_to_analyze, 10);
        assert_eq!(config.worst_blunders, 5);
        assert_eq!(config.chess_com_base_url, "https://api.chess.com");
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let config = config_from(&[
            ("STOCKFISH_PATH", "/opt/sf"),
            ("ANALYSIS_DEPTH", "18"),
            ("ENGINE_THREADS", "four"),
            ("BLUNDER_THRESHOLD", "150"),
        ])
        .unwrap();
        assert_eq!(config.stockfish_path, "/opt/sf");
        assert_eq!(config.analysis_depth, 18);
        assert_eq!(config.engine_threads, 1);
        assert_eq!(config.blunder_threshold, 150);
    }

    #[test]
    fn test_zero_values_rejected() {
        assert!(matches!(
            config_from(&[("GAMES_TO_ANALYZE", "0")]),
            Err(AnalyzerError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("BLUNDER_THRESHOLD", "-5")]),
            Err(AnalyzerError::Config(_))
        ));
    }

    #[test]
    fn test_engine_settings() {
        let config = config_from(&[("ENGINE_TIMEOUT_SECS", "3"), ("ENGINE_HASH_MB", "256")]).unwrap();
        let settings = config.engine_settings();
        assert_eq!(settings.eval_timeout, Duration::from_secs(3));
        assert!(settings
            .options
            .contains(&("Hash".to_string(), "256".to_string())));
    }

    #[test]
    fn test_cli_args() {
        let cli = CliArgs::try_parse_from([
            "blunder-analyzer",
            "hikaru",
            "--time-class",
            "Blitz",
            "--by-game",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.username, "hikaru");
        assert_eq!(cli.time_class, Some(TimeClass::Blitz));
        assert_eq!(cli.view(), ViewMode::ByGame);
        assert!(cli.json);
        assert_eq!(cli.games, None);

        let cli = CliArgs::try_parse_from(["blunder-analyzer", "--games", "3", "magnus"]).unwrap();
        assert_eq!(cli.username, "magnus");
        assert_eq!(cli.games, Some(3));
        assert_eq!(cli.time_class, None);
        assert_eq!(cli.view(), ViewMode::Overall);
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_errors() {
        let parse = |args: &[&str]| {
            CliArgs::try_parse_from(std::iter::once("blunder-analyzer").chain(args.iter().copied()))
        };
        assert!(parse(&[]).is_err());
        assert!(parse(&["a", "b"]).is_err());
        assert!(parse(&["  "]).is_err());
        assert!(parse(&["a", "--games", "0"]).is_err());
        assert!(parse(&["a", "--time-class", "classical"]).is_err());
        assert!(parse(&["a", "--verbose"]).is_err());
    }

    #[test]
    fn test_time_class_filter() {
        assert_eq!(parse_time_class_filter("ALL"), Ok(None));
        assert_eq!(parse_time_class_filter("daily"), Ok(Some(TimeClass::Daily)));
        assert!(parse_time_class_filter("960").is_err());
    }
}
