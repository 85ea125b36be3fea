//! Recurring patterns and a short piece of advice derived from blunder stats.

use serde::{Deserialize, Serialize};

use crate::detector::GamePhase;
use crate::report::BlunderStats;

/// A pattern is reported once it shows up at least this often
const MIN_PATTERN_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Piece,
    Phase,
    Capture,
    Time,
    Costly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    pub count: usize,
    pub description: String,
}

pub fn piece_name(piece: char) -> &'static str {
    match piece {
        'K' => "king",
        'Q' => "queen",
        'R' => "rook",
        'B' => "bishop",
        'N' => "knight",
        'P' => "pawn",
        _ => "pieces",
    }
}

/// Highest count, first entry wins ties.
fn dominant<K>(counts: impl IntoIterator<Item = (K, usize)>) -> Option<(K, usize)> {
    let mut best: Option<(K, usize)> = None;
    for (key, count) in counts {
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((key, count));
        }
    }
    best
}

fn dominant_phase(stats: &BlunderStats) -> Option<(GamePhase, usize)> {
    dominant(
        GamePhase::ALL
            .into_iter()
            .map(|p| (p, stats.by_phase.get(p.as_str()).copied().unwrap_or(0))),
    )
}

/// `ceil(total * percent / 100)` without floating point
fn share(total: usize, percent: usize) -> usize {
    (total * percent).div_ceil(100)
}

pub fn detect_patterns(stats: &BlunderStats) -> Vec<Pattern> {
    let mut patterns = Vec::new();

    if let Some((piece, count)) = dominant(stats.by_piece.iter().map(|(k, v)| (*k, *v))) {
        if count >= MIN_PATTERN_COUNT {
            patterns.push(Pattern {
                kind: PatternKind::Piece,
                count,
                description: format!(
                    "{count} of your blunders involved your {}",
                    piece_name(piece)
                ),
            });
        }
    }

    if let Some((phase, count)) = dominant_phase(stats) {
        if count >= MIN_PATTERN_COUNT {
            patterns.push(Pattern {
                kind: PatternKind::Phase,
                count,
                description: format!("{count} blunders happened in the {}", phase.as_str()),
            });
        }
    }

    if stats.missed_captures >= MIN_PATTERN_COUNT {
        patterns.push(Pattern {
            kind: PatternKind::Capture,
            count: stats.missed_captures,
            description: format!(
                "{} times you missed a winning capture",
                stats.missed_captures
            ),
        });
    }

    if stats.by_time_class.len() > 1 {
        if let Some((tc, count)) = dominant(stats.by_time_class.iter().map(|(k, v)| (*k, *v))) {
            if count >= MIN_PATTERN_COUNT {
                patterns.push(Pattern {
                    kind: PatternKind::Time,
                    count,
                    description: format!("{count} blunders came from {tc} games"),
                });
            }
        }
    }

    if stats.in_lost_games >= MIN_PATTERN_COUNT {
        patterns.push(Pattern {
            kind: PatternKind::Costly,
            count: stats.in_lost_games,
            description: format!("{} of these blunders led to losses", stats.in_lost_games),
        });
    }

    patterns
}

/// One paragraph of advice; empty when there is nothing to summarise.
pub fn summarize(stats: &BlunderStats) -> String {
    let total = stats.total;
    if total == 0 {
        return String::new();
    }

    let mut parts: Vec<String> = Vec::new();

    if let Some((phase, count)) = dominant_phase(stats) {
        if count >= share(total, 60) {
            parts.push(format!("Most of your mistakes happen in the {}.", phase.as_str()));
        }
    }

    if let Some((piece, count)) = dominant(stats.by_piece.iter().map(|(k, v)| (*k, *v))) {
        if count >= share(total, 40) {
            parts.push(format!(
                "Watch your {} moves more carefully.",
                piece_name(piece)
            ));
        }
    }

    if stats.missed_captures >= share(total, 40) {
        parts.push("You're missing winning captures - slow down and look for threats.".into());
    }

    if stats.by_time_class.len() > 1 {
        if let Some((_, count)) = dominant(stats.by_time_class.iter().map(|(k, v)| (*k, *v))) {
            if count >= share(total, 60) {
                parts.push("Consider playing slower time controls to reduce blunders.".into());
            }
        }
    }

    if parts.is_empty() {
        if stats.in_lost_games * 2 > total {
            parts.push(
                "These blunders are costing you games. Take an extra moment before making your move."
                    .into(),
            );
        } else {
            parts.push("Keep practicing! Focus on checking for threats before each move.".into());
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chess_core::TimeClass;

    use super::*;

    fn stats(
        pieces: &[(char, usize)],
        phases: [usize; 3],
        times: &[(TimeClass, usize)],
        missed: usize,
        lost: usize,
    ) -> BlunderStats {
        let total = pieces.iter().map(|(_, n)| n).sum();
        BlunderStats {
            total,
            by_piece: pieces.iter().copied().collect(),
            by_phase: GamePhase::ALL
                .iter()
                .zip(phases)
                .map(|(p, n)| (p.as_str().to_string(), n))
                .collect(),
            by_time_class: times.iter().copied().collect::<BTreeMap<_, _>>(),
            missed_captures: missed,
            in_lost_games: lost,
            average_drop: 300.0,
        }
    }

    #[test]
    fn test_patterns_need_two_occurrences() {
        let s = stats(&[('N', 1)], [1, 0, 0], &[(TimeClass::Blitz, 1)], 1, 1);
        assert!(detect_patterns(&s).is_empty());
    }

    #[test]
    fn test_patterns_found() {
        let s = stats(
            &[('N', 3), ('Q', 1)],
            [0, 3, 1],
            &[(TimeClass::Bullet, 3), (TimeClass::Rapid, 1)],
            2,
            2,
        );
        let kinds: Vec<PatternKind> = detect_patterns(&s).iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PatternKind::Piece,
                PatternKind::Phase,
                PatternKind::Capture,
                PatternKind::Time,
                PatternKind::Costly
            ]
        );
        let patterns = detect_patterns(&s);
        assert_eq!(patterns[0].description, "3 of your blunders involved your knight");
        assert_eq!(patterns[1].description, "3 blunders happened in the middlegame");
        assert_eq!(patterns[3].description, "3 blunders came from bullet games");
    }

    #[test]
    fn test_time_pattern_needs_several_classes() {
        let s = stats(&[('P', 4)], [4, 0, 0], &[(TimeClass::Blitz, 4)], 0, 0);
        assert!(!detect_patterns(&s).iter().any(|p| p.kind == PatternKind::Time));
    }

    #[test]
    fn test_summary_dominant_phase_and_piece() {
        let s = stats(&[('Q', 2), ('R', 1)], [0, 0, 3], &[(TimeClass::Rapid, 3)], 0, 0);
        assert_eq!(
            summarize(&s),
            "Most of your mistakes happen in the endgame. Watch your queen moves more carefully."
        );
    }

    #[test]
    fn test_summary_fallbacks() {
        let spread = [('Q', 1), ('R', 1), ('B', 1), ('N', 1), ('P', 1)];
        let costly = stats(&spread, [2, 2, 1], &[(TimeClass::Rapid, 5)], 0, 3);
        assert!(summarize(&costly).starts_with("These blunders are costing you games."));

        let fine = stats(&spread, [2, 2, 1], &[(TimeClass::Rapid, 5)], 0, 1);
        assert!(summarize(&fine).starts_with("Keep practicing!"));

        assert_eq!(summarize(&BlunderStats::default()), "");
    }
}
