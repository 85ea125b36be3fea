//! Blunder analyzer CLI
//!
//! Fetches a player's recent chess.com games, runs them through a local
//! Stockfish and prints the worst blunders with a short summary.

use std::fmt::{self, Write as _};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use blunder_analyzer::detector::Blunder;
use blunder_analyzer::insights::{detect_patterns, piece_name, summarize, Pattern};
use blunder_analyzer::report::GameBlunders;
use blunder_analyzer::{
    analyze_player, AnalyzerConfig, BlunderReport, ChessComSource, CliArgs, EngineSession,
    ViewMode,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    username: &'a str,
    view: ViewMode,
    games_analyzed: usize,
    games_skipped: usize,
    report: &'a BlunderReport,
    patterns: &'a [Pattern],
    summary: &'a str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let cli = CliArgs::parse();
    let mut config = AnalyzerConfig::load()?;
    if let Some(games) = cli.games {
        config.games_to_analyze = games;
    }
    info!(
        stockfish_path = %config.stockfish_path,
        depth = config.analysis_depth,
        games = config.games_to_analyze,
        "Config loaded"
    );

    let source = ChessComSource::new(&config.chess_com_base_url)?;
    let mut engine = EngineSession::spawn(&config.stockfish_path, config.engine_settings())
        .with_context(|| format!("starting engine at {}", config.stockfish_path))?;

    let batch = analyze_player(&source, &mut engine, &config, &cli.username, cli.time_class).await?;

    let report = BlunderReport::build(&batch.blunders, cli.time_class, config.worst_blunders);
    let patterns = detect_patterns(&report.stats);
    let summary = summarize(&report.stats);

    if cli.json {
        let output = JsonOutput {
            username: &cli.username,
            view: cli.view(),
            games_analyzed: batch.games_analyzed,
            games_skipped: batch.games_skipped,
            report: &report,
            patterns: &patterns,
            summary: &summary,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let mut out = String::new();
        render_text(
            &mut out,
            &cli.username,
            batch.games_analyzed,
            cli.view(),
            &report,
            &patterns,
            &summary,
        )?;
        print!("{out}");
    }

    Ok(())
}

fn render_text(
    out: &mut impl fmt::Write,
    username: &str,
    games_analyzed: usize,
    view: ViewMode,
    report: &BlunderReport,
    patterns: &[Pattern],
    summary: &str,
) -> fmt::Result {
    writeln!(
        out,
        "{} blunders in {} games for {}",
        report.stats.total, games_analyzed, username
    )?;

    if report.blunders.is_empty() {
        return writeln!(out, "No blunders found. Nice!");
    }

    match view {
        ViewMode::Overall => {
            writeln!(out, "\nWorst blunders:")?;
            for (i, b) in report.worst.iter().enumerate() {
                writeln!(out, "{:>2}. {}", i + 1, describe(b))?;
            }
        }
        ViewMode::ByGame => render_by_game(out, &report.by_game)?,
    }

    if !patterns.is_empty() {
        writeln!(out, "\nPatterns:")?;
        for p in patterns {
            writeln!(out, "  - {}", p.description)?;
        }
    }

    if !summary.is_empty() {
        writeln!(out, "\n{summary}")?;
    }
    Ok(())
}

fn render_by_game(out: &mut impl fmt::Write, groups: &[GameBlunders]) -> fmt::Result {
    for group in groups {
        writeln!(out, "\nvs {} ({})", group.opponent, group.game_url)?;
        for b in &group.blunders {
            writeln!(out, "    {}", describe(b))?;
        }
    }
    Ok(())
}

fn describe(b: &Blunder) -> String {
    let dots = if b.ply % 2 == 1 { "." } else { "..." };
    let best = b
        .best_move
        .as_ref()
        .map(|m| format!(", best was {}", m.uci))
        .unwrap_or_default();
    let flag = if b.low_confidence { " (low confidence)" } else { "" };
    format!(
        "{}{} {} with {}: -{} cp, {} in {}{}{}",
        b.move_number,
        dots,
        b.move_played,
        piece_name(b.piece_moved),
        b.eval_drop,
        b.game_phase.as_str(),
        b.time_class,
        best,
        flag
    )
}
