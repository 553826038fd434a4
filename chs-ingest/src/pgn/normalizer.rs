//! Game normalizer: splitter + header parser + replay into `ParsedGame`s

use super::header::{parse_headers, tag};
use super::movetext::tokenize;
use super::splitter::split_games;
use crate::board::replay;
use crate::models::{GameResult, ParsedGame, ParsedMove, ParsedPosition};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Why a chunk produced no game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Neither tags nor moves
    Empty,
    /// Tags but no move tokens
    NoMoves,
    /// First move could not be replayed
    ReplayFailed,
}

/// Result of normalizing one chunk
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    Parsed(Box<ParsedGame>),
    Skipped { index: usize, reason: SkipReason },
}

/// Normalize a blob lazily, one outcome per chunk in document order
pub fn normalize(blob: &str) -> impl Iterator<Item = ChunkOutcome> + '_ {
    split_games(blob)
        .enumerate()
        .map(|(index, chunk)| normalize_chunk(index, chunk))
}

/// Parsed games only; skipped chunks are logged and dropped
pub fn parse_games(blob: &str) -> Vec<ParsedGame> {
    normalize(blob)
        .filter_map(|outcome| match outcome {
            ChunkOutcome::Parsed(game) => Some(*game),
            ChunkOutcome::Skipped { index, reason } => {
                debug!(index, ?reason, "Skipping chunk");
                None
            }
        })
        .collect()
}

fn normalize_chunk(index: usize, chunk: &str) -> ChunkOutcome {
    let split = parse_headers(chunk);
    let tokens = tokenize(split.movetext);

    if tokens.is_empty() {
        let reason = if split.headers.is_empty() {
            SkipReason::Empty
        } else {
            SkipReason::NoMoves
        };
        return ChunkOutcome::Skipped { index, reason };
    }

    let replayed = replay(&tokens);
    if replayed.plies.is_empty() {
        return ChunkOutcome::Skipped {
            index,
            reason: SkipReason::ReplayFailed,
        };
    }

    let headers = split.headers;
    let external_id = derive_external_id(&headers, chunk);

    if let Some(halt) = &replayed.halt {
        warn!(
            index,
            external_id = %external_id,
            ply = halt.ply,
            token = %halt.token,
            reason = %halt.reason,
            "Replay truncated"
        );
    }

    let non_blank = |key: &str| {
        tag(&headers, key)
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "?")
            .map(str::to_string)
    };

    let game = ParsedGame {
        end_time: parse_end_time(&headers),
        time_control: non_blank("TimeControl"),
        result: GameResult::from_tag(tag(&headers, "Result")),
        white: non_blank("White"),
        black: non_blank("Black"),
        white_rating: parse_rating(tag(&headers, "WhiteElo")),
        black_rating: parse_rating(tag(&headers, "BlackElo")),
        raw_text: chunk.to_string(),
        moves: replayed.plies.iter().map(ParsedMove::from).collect(),
        positions: replayed.plies.iter().map(ParsedPosition::from).collect(),
        truncated: replayed.halt,
        external_id,
        headers,
    };

    ChunkOutcome::Parsed(Box::new(game))
}

/// `Link` segment, then `Site` segment, then SHA-256 of the chunk text
pub fn derive_external_id(headers: &[(String, String)], raw_text: &str) -> String {
    ["Link", "Site"]
        .iter()
        .find_map(|key| tag(headers, key).and_then(last_path_segment))
        .unwrap_or_else(|| content_hash(raw_text))
}

/// Last path segment of a URL-ish value; None unless the value has a `/`
fn last_path_segment(value: &str) -> Option<String> {
    let value = value.trim();
    if !value.contains('/') {
        return None;
    }
    let path = value.split(['?', '#']).next().unwrap_or(value);
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

fn content_hash(raw_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `UTCDate` + `UTCTime`, falling back to `EndDate` + `EndTime`
fn parse_end_time(headers: &[(String, String)]) -> Option<DateTime<Utc>> {
    combine(tag(headers, "UTCDate"), tag(headers, "UTCTime"))
        .or_else(|| combine(tag(headers, "EndDate"), tag(headers, "EndTime")))
}

fn combine(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date?.trim(), "%Y.%m.%d").ok()?;
    let time = NaiveTime::parse_from_str(time?.trim(), "%H:%M:%S").ok()?;
    Some(NaiveDateTime::new(date, time).and_utc())
}

fn parse_rating(value: Option<&str>) -> Option<i32> {
    value?.trim().parse().ok()
}
