//! Square attack and reach tests

use super::{Board, Color, Piece, Role, Square};

pub(super) const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

pub(super) const KING_OFFSETS: [(i8, i8); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

const ROOK_RAYS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_RAYS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Whether any piece of color `by` attacks `target`
pub(super) fn is_attacked(board: &Board, target: Square, by: Color) -> bool {
    // Pawns attack diagonally forward, so look one rank "behind" the target
    let pawn_rank = -by.pawn_direction();
    for df in [-1, 1] {
        if let Some(from) = target.offset(df, pawn_rank) {
            if board.piece_at(from) == Some(Piece::new(by, Role::Pawn)) {
                return true;
            }
        }
    }

    let hits = |offsets: &[(i8, i8)], role: Role| {
        offsets.iter().any(|(df, dr)| {
            target
                .offset(*df, *dr)
                .map(|from| board.piece_at(from) == Some(Piece::new(by, role)))
                .unwrap_or(false)
        })
    };
    if hits(&KNIGHT_OFFSETS, Role::Knight) || hits(&KING_OFFSETS, Role::King) {
        return true;
    }

    ray_hits(board, target, by, &ROOK_RAYS, Role::Rook)
        || ray_hits(board, target, by, &BISHOP_RAYS, Role::Bishop)
}

/// First piece met along each ray; attacks if it is `by`'s slider or queen
fn ray_hits(board: &Board, target: Square, by: Color, rays: &[(i8, i8)], slider: Role) -> bool {
    rays.iter().any(|(df, dr)| {
        let mut current = target;
        while let Some(next) = current.offset(*df, *dr) {
            if let Some(piece) = board.piece_at(next) {
                return piece.color == by && (piece.role == slider || piece.role == Role::Queen);
            }
            current = next;
        }
        false
    })
}

/// Whether a non-pawn piece of `role` standing on `from` can move to `to`
/// (geometry plus clear path; occupancy of `to` is checked by the caller)
pub(super) fn can_reach(board: &Board, role: Role, from: Square, to: Square) -> bool {
    let df = to.file() as i8 - from.file() as i8;
    let dr = to.rank() as i8 - from.rank() as i8;
    if df == 0 && dr == 0 {
        return false;
    }

    match role {
        Role::Knight => KNIGHT_OFFSETS.contains(&(df, dr)),
        Role::King => df.abs() <= 1 && dr.abs() <= 1,
        Role::Rook => (df == 0 || dr == 0) && path_clear(board, from, to),
        Role::Bishop => df.abs() == dr.abs() && path_clear(board, from, to),
        Role::Queen => {
            (df == 0 || dr == 0 || df.abs() == dr.abs()) && path_clear(board, from, to)
        }
        Role::Pawn => false,
    }
}

/// Squares strictly between `from` and `to` on a line are empty
fn path_clear(board: &Board, from: Square, to: Square) -> bool {
    let step_f = (to.file() as i8 - from.file() as i8).signum();
    let step_r = (to.rank() as i8 - from.rank() as i8).signum();
    let mut current = from;
    loop {
        current = match current.offset(step_f, step_r) {
            Some(next) => next,
            None => return false,
        };
        if current == to {
            return true;
        }
        if board.piece_at(current).is_some() {
            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        Square::parse(name).unwrap()
    }

    #[test]
    fn test_pawn_attacks_are_directional() {
        let board = Board::from_fen("8/8/8/3p4/4P3/8/8/8 w - - 0 1").unwrap();
        assert!(is_attacked(&board, sq("d5"), Color::White));
        assert!(is_attacked(&board, sq("e4"), Color::Black));
        assert!(!is_attacked(&board, sq("e5"), Color::White));
    }

    #[test]
    fn test_slider_blocked_by_piece() {
        let board = Board::from_fen("4k3/8/8/8/4N3/8/8/4R1K1 w - - 0 1").unwrap();
        assert!(!is_attacked(&board, sq("e8"), Color::White));
        assert!(is_attacked(&board, sq("e3"), Color::White));
    }

    #[test]
    fn test_queen_attacks_diagonally() {
        let board = Board::from_fen("7k/8/8/8/8/8/8/Q6K w - - 0 1").unwrap();
        assert!(is_attacked(&board, sq("h8"), Color::White));
    }

    #[test]
    fn test_can_reach_respects_geometry() {
        let board = Board::starting();
        assert!(can_reach(&board, Role::Knight, sq("g1"), sq("f3")));
        assert!(!can_reach(&board, Role::Bishop, sq("c1"), sq("e3")));
        assert!(!can_reach(&board, Role::Rook, sq("a1"), sq("b3")));
        assert!(can_reach(&board, Role::King, sq("e1"), sq("e2")));
    }
}
