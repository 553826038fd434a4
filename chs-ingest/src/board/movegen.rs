//! Legal move generation

use super::san::{leaves_king_in_check, pawn_candidates, piece_candidates, resolve_castle};
use super::{Board, CastleSide, Move, Role, Square};

const PIECE_ROLES: [Role; 5] = [Role::Knight, Role::Bishop, Role::Rook, Role::Queen, Role::King];
const PROMOTION_ROLES: [Role; 4] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight];

/// Every legal move for the side to move, ordered by UCI text
pub(super) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();

    for to in (0..64u8).filter_map(|i| Square::new(i % 8, i / 8)) {
        for role in PIECE_ROLES {
            moves.extend(piece_candidates(board, role, to));
        }

        moves.extend(pawn_candidates(board, None, to));
        for df in [-1, 1] {
            if let Some(from_file) = to.offset(df, 0).map(|s| s.file()) {
                moves.extend(pawn_candidates(board, Some(from_file), to));
            }
        }
    }

    for side in [CastleSide::King, CastleSide::Queen] {
        if let Ok(castle) = resolve_castle(board, side) {
            moves.push(castle);
        }
    }

    let promotion_rank = board.turn().promotion_rank();
    let mut legal: Vec<Move> = moves
        .into_iter()
        .filter(|mv| !leaves_king_in_check(board, mv))
        .flat_map(|mv| {
            let is_pawn = board.piece_at(mv.from).map(|p| p.role) == Some(Role::Pawn);
            if is_pawn && mv.to.rank() == promotion_rank {
                PROMOTION_ROLES
                    .iter()
                    .map(|role| Move {
                        promotion: Some(*role),
                        ..mv
                    })
                    .collect()
            } else {
                vec![mv]
            }
        })
        .collect();

    legal.sort_by_cached_key(|mv| mv.uci());
    legal
}
