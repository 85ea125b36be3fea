//! Game source: recent games of a player from the chess.com public API.

use std::future::Future;

use chess_core::{GameRecord, TimeClass};
use chrono::{Datelike, Utc};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::SourceError;

pub const CHESS_COM_BASE_URL: &str = "https://api.chess.com";

/// Anything that can hand out a player's finished games.
pub trait GameSource {
    /// Up to `limit` most recent games, newest first.
    fn recent_games(
        &self,
        username: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<GameRecord>, SourceError>> + Send;
}

pub struct ChessComSource {
    client: Client,
    base_url: String,
}

impl ChessComSource {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent("ChessBlindspots/1.0")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| SourceError::Fetch(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Raw game objects of one monthly archive.
    async fn fetch_month(
        &self,
        username: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<Value>, SourceError> {
        let url = format!(
            "{}/pub/player/{}/games/{}/{:02}",
            self.base_url,
            username.to_lowercase(),
            year,
            month
        );
        debug!(%url, "Fetching monthly archive");

        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Fetch(format!("Request error: {e}")))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::PlayerNotFound(username.to_string()));
        }
        if !resp.status().is_success() {
            return Err(SourceError::Fetch(format!("HTTP {}", resp.status())));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| SourceError::Fetch(format!("JSON parse error: {e}")))?;

        Ok(data["games"].as_array().cloned().unwrap_or_default())
    }
}

impl GameSource for ChessComSource {
    async fn recent_games(&self, username: &str, limit: usize) -> Result<Vec<GameRecord>, SourceError> {
        let now = Utc::now();
        let (year, month) = (now.year(), now.month());

        let mut games = self.fetch_month(username, year, month).await?;

        if games.is_empty() {
            let (prev_year, prev_month) = previous_month(year, month);
            info!(username, prev_year, prev_month, "No games this month, trying previous month");
            // The player exists at this point; a failing fallback just means no games
            games = self
                .fetch_month(username, prev_year, prev_month)
                .await
                .unwrap_or_default();
        }

        let records = records_from_archive(&games, limit);
        if records.is_empty() {
            return Err(SourceError::NoRecentGames(username.to_string()));
        }
        Ok(records)
    }
}

/// Calendar month before `(year, month)`.
pub fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month <= 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Map the chronological archive to records, newest first, at most `limit`.
pub fn records_from_archive(games: &[Value], limit: usize) -> Vec<GameRecord> {
    games.iter().rev().filter_map(map_game).take(limit).collect()
}

fn map_game(game: &Value) -> Option<GameRecord> {
    // Skip variant games
    let rules = game.get("rules").and_then(|v| v.as_str()).unwrap_or("chess");
    if rules != "chess" {
        return None;
    }

    let pgn = game.get("pgn")?.as_str()?;
    let white = game.pointer("/white/username")?.as_str()?;
    let black = game.pointer("/black/username")?.as_str()?;
    let url = game.get("url").and_then(|v| v.as_str()).unwrap_or_default();
    let time_class = game
        .get("time_class")
        .and_then(|v| v.as_str())
        .map(TimeClass::from_label)
        .unwrap_or(TimeClass::Rapid);

    Some(GameRecord::new(pgn, white, black, url, time_class))
}
