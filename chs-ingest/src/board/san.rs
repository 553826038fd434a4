//! Move token parsing (SAN, with coordinate notation as a fallback) and
//! resolution against a board

use super::attacks::{can_reach, is_attacked};
use super::{file_index, rank_index, Board, CastleSide, Move, MoveKind, Piece, Role, Square};
use thiserror::Error;

/// Why a move token could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("unparseable move token")]
    Unparseable,

    #[error("no piece can make this move")]
    NoCandidate,

    #[error("move is ambiguous ({0} candidates)")]
    Ambiguous(usize),

    #[error("castling not allowed")]
    IllegalCastle,

    #[error("pawn reaching the last rank needs a promotion piece")]
    MissingPromotion,

    #[error("invalid promotion")]
    InvalidPromotion,
}

/// Parsed but unresolved move token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveToken {
    /// Standard algebraic notation
    San {
        role: Role,
        from_file: Option<u8>,
        from_rank: Option<u8>,
        to: Square,
        promotion: Option<Role>,
    },
    Castle(CastleSide),
    /// Coordinate notation (`e2e4`, `e7e8q`)
    Coordinate {
        from: Square,
        to: Square,
        promotion: Option<Role>,
    },
}

/// Strip check/mate/annotation suffixes: `Nf3+`, `e4!?`, `Qxh7#`
fn strip_suffixes(token: &str) -> &str {
    token.trim_end_matches(['+', '#', '!', '?'])
}

/// Parse a movetext token into a `MoveToken`
pub fn parse_move_token(token: &str) -> Result<MoveToken, MoveError> {
    let body = strip_suffixes(token.trim());
    if body.is_empty() {
        return Err(MoveError::Unparseable);
    }

    match body {
        "O-O" | "0-0" => return Ok(MoveToken::Castle(CastleSide::King)),
        "O-O-O" | "0-0-0" => return Ok(MoveToken::Castle(CastleSide::Queen)),
        _ => {}
    }

    if let Some(coordinate) = parse_coordinate(body) {
        return Ok(coordinate);
    }

    parse_san(body)
}

fn parse_coordinate(body: &str) -> Option<MoveToken> {
    if !(body.len() == 4 || body.len() == 5) || !body.is_ascii() {
        return None;
    }
    let from = Square::parse(&body[0..2])?;
    let to = Square::parse(&body[2..4])?;
    let promotion = match body[4..].chars().next() {
        None => None,
        Some(c) => Some(Role::from_san_char(c.to_ascii_uppercase()).filter(|r| r.is_promotion_target())?),
    };
    Some(MoveToken::Coordinate {
        from,
        to,
        promotion,
    })
}

fn parse_san(body: &str) -> Result<MoveToken, MoveError> {
    let chars: Vec<char> = body.chars().collect();

    // Promotion: `e8=Q` or `e8Q`
    let (core, promotion) = match chars.iter().position(|c| *c == '=') {
        Some(eq) => {
            if eq + 2 != chars.len() {
                return Err(MoveError::Unparseable);
            }
            let role = Role::from_san_char(chars[eq + 1])
                .filter(|r| r.is_promotion_target())
                .ok_or(MoveError::InvalidPromotion)?;
            (&chars[..eq], Some(role))
        }
        None => match chars.last() {
            Some(c) if chars.len() >= 3 && chars[chars.len() - 2].is_ascii_digit() => {
                match Role::from_san_char(*c).filter(|r| r.is_promotion_target()) {
                    Some(role) => (&chars[..chars.len() - 1], Some(role)),
                    None => (&chars[..], None),
                }
            }
            _ => (&chars[..], None),
        },
    };

    if core.len() < 2 {
        return Err(MoveError::Unparseable);
    }

    let dest: String = core[core.len() - 2..].iter().collect();
    let to = Square::parse(&dest).ok_or(MoveError::Unparseable)?;

    let mut prefix = &core[..core.len() - 2];
    let role = match prefix.first().and_then(|c| Role::from_san_char(*c)) {
        Some(role) => {
            prefix = &prefix[1..];
            role
        }
        None => Role::Pawn,
    };

    let mut from_file = None;
    let mut from_rank = None;
    for c in prefix {
        match c {
            'x' | ':' | '-' => {}
            c if file_index(*c).is_some() && from_file.is_none() => from_file = file_index(*c),
            c if rank_index(*c).is_some() && from_rank.is_none() => from_rank = rank_index(*c),
            _ => return Err(MoveError::Unparseable),
        }
    }

    if promotion.is_some() && role != Role::Pawn {
        return Err(MoveError::InvalidPromotion);
    }

    Ok(MoveToken::San {
        role,
        from_file,
        from_rank,
        to,
        promotion,
    })
}

/// Resolve a parsed token to the unique move it denotes on `board`
pub(super) fn resolve(board: &Board, token: &MoveToken) -> Result<Move, MoveError> {
    match token {
        MoveToken::Castle(side) => resolve_castle(board, *side),
        MoveToken::San {
            role,
            from_file,
            from_rank,
            to,
            promotion,
        } => {
            let candidates = match role {
                Role::Pawn => pawn_candidates(board, *from_file, *to),
                _ => piece_candidates(board, *role, *to),
            };

            let matching: Vec<Move> = candidates
                .into_iter()
                .filter(|mv| from_file.map_or(true, |f| mv.from.file() == f))
                .filter(|mv| from_rank.map_or(true, |r| mv.from.rank() == r))
                .filter(|mv| !leaves_king_in_check(board, mv))
                .collect();

            match matching.as_slice() {
                [] => Err(MoveError::NoCandidate),
                [single] => with_promotion(board, *single, *promotion),
                many => Err(MoveError::Ambiguous(many.len())),
            }
        }
        MoveToken::Coordinate {
            from,
            to,
            promotion,
        } => resolve_coordinate(board, *from, *to, *promotion),
    }
}

pub(super) fn piece_candidates(board: &Board, role: Role, to: Square) -> Vec<Move> {
    let turn = board.turn();
    if board.piece_at(to).map(|p| p.color) == Some(turn) {
        return Vec::new();
    }

    (0..64u8)
        .filter_map(|i| Square::new(i % 8, i / 8))
        .filter(|from| board.piece_at(*from) == Some(Piece::new(turn, role)))
        .filter(|from| can_reach(board, role, *from, to))
        .map(|from| Move {
            from,
            to,
            promotion: None,
            kind: MoveKind::Normal,
        })
        .collect()
}

pub(super) fn pawn_candidates(board: &Board, from_file: Option<u8>, to: Square) -> Vec<Move> {
    let turn = board.turn();
    let dir = turn.pawn_direction();
    let own_pawn = Piece::new(turn, Role::Pawn);
    let mut moves = Vec::new();

    let is_capture = from_file.map_or(false, |f| f != to.file());
    if is_capture {
        let Some(from) = from_file.and_then(|f| Square::new(f, to.rank())).and_then(|s| s.offset(0, -dir)) else {
            return moves;
        };
        if (from.file() as i8 - to.file() as i8).abs() != 1 || board.piece_at(from) != Some(own_pawn) {
            return moves;
        }
        match board.piece_at(to) {
            Some(target) if target.color != turn => moves.push(Move {
                from,
                to,
                promotion: None,
                kind: MoveKind::Normal,
            }),
            None if board.en_passant() == Some(to) => moves.push(Move {
                from,
                to,
                promotion: None,
                kind: MoveKind::EnPassant,
            }),
            _ => {}
        }
        return moves;
    }

    if board.piece_at(to).is_some() {
        return moves;
    }

    if let Some(from) = to.offset(0, -dir) {
        match board.piece_at(from) {
            Some(piece) if piece == own_pawn => moves.push(Move {
                from,
                to,
                promotion: None,
                kind: MoveKind::Normal,
            }),
            None => {
                if let Some(start) = from.offset(0, -dir) {
                    if start.rank() == turn.pawn_start_rank() && board.piece_at(start) == Some(own_pawn) {
                        moves.push(Move {
                            from: start,
                            to,
                            promotion: None,
                            kind: MoveKind::DoublePush,
                        });
                    }
                }
            }
            Some(_) => {}
        }
    }

    moves
}

/// Attach/validate the promotion piece for a resolved move
fn with_promotion(board: &Board, mv: Move, promotion: Option<Role>) -> Result<Move, MoveError> {
    let is_pawn = board.piece_at(mv.from).map(|p| p.role) == Some(Role::Pawn);
    let reaches_last_rank = is_pawn && mv.to.rank() == board.turn().promotion_rank();

    match (reaches_last_rank, promotion) {
        (true, Some(role)) => Ok(Move {
            promotion: Some(role),
            ..mv
        }),
        (true, None) => Err(MoveError::MissingPromotion),
        (false, Some(_)) => Err(MoveError::InvalidPromotion),
        (false, None) => Ok(mv),
    }
}

pub(super) fn resolve_castle(board: &Board, side: CastleSide) -> Result<Move, MoveError> {
    let turn = board.turn();
    if !board.castling().has(turn, side) {
        return Err(MoveError::IllegalCastle);
    }

    let rank = turn.back_rank();
    let square = |file: u8| Square::new(file, rank).ok_or(MoveError::IllegalCastle);
    let king_from = square(4)?;
    let king_to = square(side.king_to_file())?;
    let rook_from = square(side.rook_from_file())?;

    if board.piece_at(king_from) != Some(Piece::new(turn, Role::King))
        || board.piece_at(rook_from) != Some(Piece::new(turn, Role::Rook))
    {
        return Err(MoveError::IllegalCastle);
    }

    let (low, high) = if rook_from.file() < king_from.file() {
        (rook_from.file() + 1, king_from.file())
    } else {
        (king_from.file() + 1, rook_from.file())
    };
    for file in low..high {
        if board.piece_at(square(file)?).is_some() {
            return Err(MoveError::IllegalCastle);
        }
    }

    // King may not castle out of, through, or into check
    let (pass_low, pass_high) = if king_to.file() < king_from.file() {
        (king_to.file(), king_from.file())
    } else {
        (king_from.file(), king_to.file())
    };
    for file in pass_low..=pass_high {
        if is_attacked(board, square(file)?, turn.opposite()) {
            return Err(MoveError::IllegalCastle);
        }
    }

    Ok(Move {
        from: king_from,
        to: king_to,
        promotion: None,
        kind: MoveKind::Castle(side),
    })
}

fn resolve_coordinate(
    board: &Board,
    from: Square,
    to: Square,
    promotion: Option<Role>,
) -> Result<Move, MoveError> {
    let turn = board.turn();
    let piece = board
        .piece_at(from)
        .filter(|p| p.color == turn)
        .ok_or(MoveError::NoCandidate)?;

    let token = match piece.role {
        Role::King if from.rank() == to.rank() && (to.file() as i8 - from.file() as i8).abs() == 2 => {
            let side = if to.file() > from.file() {
                CastleSide::King
            } else {
                CastleSide::Queen
            };
            return resolve_castle(board, side);
        }
        role => MoveToken::San {
            role,
            from_file: Some(from.file()),
            from_rank: Some(from.rank()),
            to,
            promotion,
        },
    };

    resolve(board, &token)
}

pub(super) fn leaves_king_in_check(board: &Board, mv: &Move) -> bool {
    let mut next = board.clone();
    let mover = board.turn();
    next.apply(mv);
    next.in_check(mover)
}
