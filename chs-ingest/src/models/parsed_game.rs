//! Structured game records produced by the PGN normalizer

use crate::board::{Color, ReplayHalt, ReplayedPly};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Game outcome from the `Result` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameResult {
    WhiteWin,
    BlackWin,
    Draw,
    Unknown,
}

impl GameResult {
    /// Map a `Result` tag value; anything unrecognized is `Unknown`
    pub fn from_tag(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("1-0") => GameResult::WhiteWin,
            Some("0-1") => GameResult::BlackWin,
            Some("1/2-1/2") => GameResult::Draw,
            _ => GameResult::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameResult::WhiteWin => "WHITE_WIN",
            GameResult::BlackWin => "BLACK_WIN",
            GameResult::Draw => "DRAW",
            GameResult::Unknown => "UNKNOWN",
        }
    }
}

/// One half-move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedMove {
    pub ply: u32,
    /// SAN as recorded
    pub algebraic_notation: String,
    /// UCI (`e2e4`, `e7e8q`)
    pub compact_notation: String,
    /// Side that made this move
    pub side_to_move: Color,
}

/// Board state right after the move at `ply`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPosition {
    pub ply: u32,
    pub fen: String,
    pub side_to_move_after: Color,
    /// UCI moves available to `side_to_move_after`
    pub legal_moves: Vec<String>,
}

impl From<&ReplayedPly> for ParsedMove {
    fn from(ply: &ReplayedPly) -> Self {
        Self {
            ply: ply.ply,
            algebraic_notation: ply.san.clone(),
            compact_notation: ply.uci.clone(),
            side_to_move: ply.mover,
        }
    }
}

impl From<&ReplayedPly> for ParsedPosition {
    fn from(ply: &ReplayedPly) -> Self {
        Self {
            ply: ply.ply,
            fen: ply.fen.clone(),
            side_to_move_after: ply.side_to_move_after,
            legal_moves: ply.legal_moves.clone(),
        }
    }
}

/// One game extracted from a PGN blob
///
/// `moves` and `positions` always have the same length; `positions[i]` is the
/// board after `moves[0..=i]` from the initial position.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGame {
    pub external_id: String,
    pub end_time: Option<DateTime<Utc>>,
    pub time_control: Option<String>,
    pub result: GameResult,
    pub white: Option<String>,
    pub black: Option<String>,
    pub white_rating: Option<i32>,
    pub black_rating: Option<i32>,
    /// Tag pairs in document order
    pub headers: Vec<(String, String)>,
    pub raw_text: String,
    pub moves: Vec<ParsedMove>,
    pub positions: Vec<ParsedPosition>,
    /// Set when replay stopped before the end of the movetext
    pub truncated: Option<ReplayHalt>,
}

impl ParsedGame {
    pub fn ply_count(&self) -> usize {
        self.moves.len()
    }

    /// First value of a header tag
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}
