//! Aggregation over a batch of blunders, pure functions only.
//! Every view is rebuilt from the blunder list; nothing is mutated in place.

use std::collections::{BTreeMap, HashMap};

use chess_core::{GameResult, TimeClass};
use serde::{Deserialize, Serialize};

use crate::detector::{Blunder, GamePhase};

/// Size of the "worst blunders" view
pub const MAX_BLUNDERS_TO_SHOW: usize = 5;

/// Which time classes to include; `None` means all.
pub type TimeClassFilter = Option<TimeClass>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    #[default]
    Overall,
    ByGame,
}

/// Blunders of one game, ordered by ply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameBlunders {
    pub game_url: String,
    pub opponent: String,
    pub blunders: Vec<Blunder>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlunderStats {
    pub total: usize,
    pub by_piece: BTreeMap<char, usize>,
    pub by_phase: BTreeMap<String, usize>,
    pub by_time_class: BTreeMap<TimeClass, usize>,
    /// Engine wanted a capture, the player did not capture
    pub missed_captures: usize,
    pub in_lost_games: usize,
    pub average_drop: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlunderReport {
    pub filter: TimeClassFilter,
    pub blunders: Vec<Blunder>,
    pub worst: Vec<Blunder>,
    pub by_game: Vec<GameBlunders>,
    pub stats: BlunderStats,
}

impl BlunderReport {
    pub fn build(all: &[Blunder], filter: TimeClassFilter, worst_n: usize) -> Self {
        let blunders = filter_blunders(all, filter);
        Self {
            filter,
            worst: worst_blunders(&blunders, worst_n),
            by_game: group_by_game(&blunders),
            stats: BlunderStats::from_blunders(&blunders),
            blunders,
        }
    }
}

pub fn filter_blunders(blunders: &[Blunder], filter: TimeClassFilter) -> Vec<Blunder> {
    blunders
        .iter()
        .filter(|b| filter.map_or(true, |tc| b.time_class == tc))
        .cloned()
        .collect()
}

/// Largest drops first; ties keep batch order.
pub fn worst_blunders(blunders: &[Blunder], n: usize) -> Vec<Blunder> {
    let mut sorted = blunders.to_vec();
    sorted.sort_by(|a, b| b.eval_drop.cmp(&a.eval_drop));
    sorted.truncate(n);
    sorted
}

/// Partition by game URL in order of first appearance.
pub fn group_by_game(blunders: &[Blunder]) -> Vec<GameBlunders> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GameBlunders> = Vec::new();

    for blunder in blunders {
        let slot = *index.entry(blunder.game_url.as_str()).or_insert_with(|| {
            groups.push(GameBlunders {
                game_url: blunder.game_url.clone(),
                opponent: blunder.opponent.clone(),
                blunders: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].blunders.push(blunder.clone());
    }

    for group in &mut groups {
        group.blunders.sort_by_key(|b| b.ply);
    }
    groups
}

impl BlunderStats {
    pub fn from_blunders(blunders: &[Blunder]) -> Self {
        let mut stats = BlunderStats {
            total: blunders.len(),
            ..Default::default()
        };
        for phase in GamePhase::ALL {
            stats.by_phase.insert(phase.as_str().to_string(), 0);
        }

        let mut drop_sum: i64 = 0;
        for b in blunders {
            *stats.by_piece.entry(b.piece_moved).or_default() += 1;
            *stats.by_phase.entry(b.game_phase.as_str().to_string()).or_default() += 1;
            *stats.by_time_class.entry(b.time_class).or_default() += 1;
            if b.best_move_was_capture && !b.was_capture {
                stats.missed_captures += 1;
            }
            if b.game_result == GameResult::Loss {
                stats.in_lost_games += 1;
            }
            drop_sum += i64::from(b.eval_drop);
        }

        if !blunders.is_empty() {
            stats.average_drop = drop_sum as f64 / blunders.len() as f64;
        }
        stats
    }
}
