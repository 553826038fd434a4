//! Replay of a recorded move list from the initial position

use super::san::{parse_move_token, resolve};
use super::{Board, Color, MoveError};
use tracing::debug;

/// One applied half-move with the board state it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedPly {
    /// 1-based ply number
    pub ply: u32,
    /// Token as recorded (annotation suffixes kept)
    pub san: String,
    pub uci: String,
    /// Side that made the move
    pub mover: Color,
    /// Board after the move
    pub fen: String,
    pub side_to_move_after: Color,
    /// UCI moves legal for `side_to_move_after`
    pub legal_moves: Vec<String>,
}

/// Where and why replay stopped before the end of the move list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayHalt {
    /// Ply the offending token would have been
    pub ply: u32,
    pub token: String,
    pub reason: MoveError,
}

/// Result of replaying a token list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    pub plies: Vec<ReplayedPly>,
    pub halt: Option<ReplayHalt>,
}

impl Replay {
    pub fn is_truncated(&self) -> bool {
        self.halt.is_some()
    }
}

/// Replay SAN (or coordinate) tokens from the standard initial position
///
/// The first token that cannot be parsed or resolved stops the replay; plies
/// applied before it are kept.
pub fn replay<I, S>(tokens: I) -> Replay
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut board = Board::starting();
    let mut result = Replay::default();

    for (index, token) in tokens.into_iter().enumerate() {
        let token = token.as_ref();
        let ply = index as u32 + 1;

        let resolved = parse_move_token(token).and_then(|parsed| resolve(&board, &parsed));
        let mv = match resolved {
            Ok(mv) => mv,
            Err(reason) => {
                debug!(ply, token, %reason, "Replay halted");
                result.halt = Some(ReplayHalt {
                    ply,
                    token: token.to_string(),
                    reason,
                });
                break;
            }
        };

        let mover = board.turn();
        board.apply(&mv);
        result.plies.push(ReplayedPly {
            ply,
            san: token.to_string(),
            uci: mv.uci(),
            mover,
            fen: board.to_fen(),
            side_to_move_after: board.turn(),
            legal_moves: board.legal_moves().iter().map(|m| m.uci()).collect(),
        });
    }

    result
}
