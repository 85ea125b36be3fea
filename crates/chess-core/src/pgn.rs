//! PGN parsing: regex-based header extraction, movetext cleanup and replay.

use std::sync::LazyLock;

use regex::Regex;
use shakmaty::san::SanPlus;

use crate::error::ParseError;
use crate::ply::{self, PlyMove};

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static HEADER_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\[(\w+)\s+"([^"]*)"\]"#).unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^}]*\}").unwrap());
static LINE_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r";[^\n]*").unwrap());
static VARIATION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^()]*\)").unwrap());
static NAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\d+").unwrap());
static MOVE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.+").unwrap());

const RESULT_MARKERS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

/// Extract a string value from a PGN header (e.g. White, Result, Link).
pub fn extract_header(pgn: &str, header_name: &str) -> Option<String> {
    HEADER_FIELD_RE
        .captures_iter(pgn)
        .find(|cap| &cap[1] == header_name)
        .map(|cap| cap[2].to_string())
        .filter(|value| !value.is_empty())
}

/// Movetext with headers, comments, variations and NAGs removed.
pub fn movetext(pgn: &str) -> String {
    let no_headers = HEADER_RE.replace_all(pgn, "");
    let no_comments = COMMENT_RE.replace_all(&no_headers, " ");
    let mut text = LINE_COMMENT_RE.replace_all(&no_comments, " ").into_owned();

    // Variations nest, so peel the innermost ones until none remain
    while VARIATION_RE.is_match(&text) {
        text = VARIATION_RE.replace_all(&text, " ").into_owned();
    }

    NAG_RE.replace_all(&text, " ").into_owned()
}

/// Split cleaned movetext into SAN tokens, dropping move numbers,
/// annotation glyphs and the result marker.
pub fn san_tokens(pgn: &str) -> Vec<String> {
    movetext(pgn)
        .split_whitespace()
        .filter_map(|raw| {
            let token = MOVE_NUMBER_RE.replace(raw, "");
            let token = token.trim_end_matches(['!', '?']);
            if token.is_empty() || RESULT_MARKERS.contains(&token) {
                None
            } else {
                Some(token.to_string())
            }
        })
        .collect()
}

/// Replay a full PGN from the standard start position.
///
/// Fails on the first unreadable or illegal token; a game is either replayed
/// completely or not at all.
pub fn replay_pgn(pgn: &str) -> Result<Vec<PlyMove>, ParseError> {
    if extract_header(pgn, "SetUp").as_deref() == Some("1") {
        if let Some(fen) = extract_header(pgn, "FEN") {
            if fen != STANDARD_START_FEN {
                return Err(ParseError::NonStandardStart(fen));
            }
        }
    }

    let tokens = san_tokens(pgn);
    let mut sans = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let san: SanPlus = token.parse().map_err(|_| ParseError::InvalidToken {
            ply: i + 1,
            token: token.clone(),
        })?;
        sans.push((token.clone(), san));
    }

    ply::replay(&sans)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[Event "Live Chess"]
[White "Player1"]
[Black "Player2"]
[Result "1-0"]
[TimeControl "600"]

1. e4 {[%clk 0:09:58.1]} 1... e5 {[%clk 0:09:57.0]} 2. Nf3 (2. Bc4 Nc6 (2... Nf6)) 2... Nc6 $1
3. Bb5!? a6?! 4. Bxc6 dxc6 1-0"#;

    #[test]
    fn test_extract_header() {
        assert_eq!(extract_header(SAMPLE, "White").as_deref(), Some("Player1"));
        assert_eq!(extract_header(SAMPLE, "Result").as_deref(), Some("1-0"));
        assert_eq!(extract_header(SAMPLE, "Missing"), None);
    }

    #[test]
    fn test_extract_header_matches_whole_key() {
        let pgn = "[WhiteElo \"2810\"]\n[White \"Player1\"]\n[ECO \"\"]\n\n1. e4 *";
        assert_eq!(extract_header(pgn, "White").as_deref(), Some("Player1"));
        assert_eq!(extract_header(pgn, "WhiteElo").as_deref(), Some("2810"));
        assert_eq!(extract_header(pgn, "Elo"), None);
        assert_eq!(extract_header(pgn, "ECO"), None);
    }

    #[test]
    fn test_san_tokens_strip_noise() {
        assert_eq!(
            san_tokens(SAMPLE),
            vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Bxc6", "dxc6"]
        );
    }

    #[test]
    fn test_replay_full_game() {
        let plies = replay_pgn(SAMPLE).unwrap();
        assert_eq!(plies.len(), 8);
        assert_eq!(plies[0].fen_before, STANDARD_START_FEN);
        assert_eq!(plies[6].san, "Bxc6");
        assert_eq!(plies[6].from, "b5");
        assert_eq!(plies[6].to, "c6");
    }

    #[test]
    fn test_replay_rejects_truncated_movetext() {
        let err = replay_pgn("1. e4 e5 2. Nf").unwrap_err();
        assert!(matches!(err, ParseError::InvalidToken { ply: 3, .. }));
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let err = replay_pgn("1. e4 e5 2. Ke3").unwrap_err();
        assert_eq!(
            err,
            ParseError::IllegalMove {
                ply: 3,
                san: "Ke3".to_string()
            }
        );
    }

    #[test]
    fn test_replay_rejects_custom_start() {
        let pgn = "[SetUp \"1\"]\n[FEN \"8/8/8/8/8/8/8/K6k w - - 0 1\"]\n\n1. Kb1 *";
        assert!(matches!(replay_pgn(pgn), Err(ParseError::NonStandardStart(_))));
    }

    #[test]
    fn test_empty_movetext_has_no_plies() {
        assert!(replay_pgn("[Result \"*\"]\n\n*").unwrap().is_empty());
    }
}
