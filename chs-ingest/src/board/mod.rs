//! Virtual chess board used to replay recorded games
//!
//! The board is a plain value: each replay owns one, applies moves to it in
//! order and serializes it to FEN after every ply. Nothing here is shared
//! between concurrent replays.
//!
//! Only the rules needed to resolve recorded moves and produce FEN are
//! modelled (piece movement, castling, en passant, promotion, "own king not
//! left in check"), plus the legal move list stored with each position.
//! Draw rules, repetition and game-end detection are not.

mod attacks;
mod movegen;
mod replay;
mod san;

pub use replay::{replay, Replay, ReplayHalt, ReplayedPly};
pub use san::{parse_move_token, MoveError, MoveToken};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Side of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Stored representation (`WHITE` / `BLACK`)
    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        }
    }

    /// Rank delta of a single pawn push
    fn pawn_direction(self) -> i8 {
        match self {
            Color::White => 1,
            Color::Black => -1,
        }
    }

    /// Rank index (0-based) pawns start on
    fn pawn_start_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    /// Rank index (0-based) pawns promote on
    fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    /// Rank index (0-based) of the back rank
    fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Piece kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl Role {
    /// Role from an upper-case SAN letter (`N`, `B`, `R`, `Q`, `K`)
    pub fn from_san_char(c: char) -> Option<Role> {
        match c {
            'N' => Some(Role::Knight),
            'B' => Some(Role::Bishop),
            'R' => Some(Role::Rook),
            'Q' => Some(Role::Queen),
            'K' => Some(Role::King),
            _ => None,
        }
    }

    /// Lower-case letter used in FEN (black) and UCI promotion suffixes
    pub fn lower_char(self) -> char {
        match self {
            Role::Pawn => 'p',
            Role::Knight => 'n',
            Role::Bishop => 'b',
            Role::Rook => 'r',
            Role::Queen => 'q',
            Role::King => 'k',
        }
    }

    fn from_lower_char(c: char) -> Option<Role> {
        match c {
            'p' => Some(Role::Pawn),
            'n' => Some(Role::Knight),
            'b' => Some(Role::Bishop),
            'r' => Some(Role::Rook),
            'q' => Some(Role::Queen),
            'k' => Some(Role::King),
            _ => None,
        }
    }

    fn is_promotion_target(self) -> bool {
        matches!(self, Role::Knight | Role::Bishop | Role::Rook | Role::Queen)
    }
}

/// A colored piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub role: Role,
}

impl Piece {
    pub fn new(color: Color, role: Role) -> Self {
        Self { color, role }
    }

    fn fen_char(self) -> char {
        let c = self.role.lower_char();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    fn from_fen_char(c: char) -> Option<Piece> {
        let role = Role::from_lower_char(c.to_ascii_lowercase())?;
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(color, role))
    }
}

/// Board square, `a1 = 0` through `h8 = 63`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square(u8);

impl Square {
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(rank * 8 + file))
        } else {
            None
        }
    }

    pub fn file(self) -> u8 {
        self.0 % 8
    }

    pub fn rank(self) -> u8 {
        self.0 / 8
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Square shifted by a file/rank delta, if still on the board
    pub fn offset(self, df: i8, dr: i8) -> Option<Square> {
        let file = self.file() as i8 + df;
        let rank = self.rank() as i8 + dr;
        if (0..8).contains(&file) && (0..8).contains(&rank) {
            Square::new(file as u8, rank as u8)
        } else {
            None
        }
    }

    /// Parse algebraic square name (`e4`)
    pub fn parse(name: &str) -> Option<Square> {
        let mut chars = name.chars();
        let file = file_index(chars.next()?)?;
        let rank = rank_index(chars.next()?)?;
        if chars.next().is_some() {
            return None;
        }
        Square::new(file, rank)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            (b'a' + self.file()) as char,
            (b'1' + self.rank()) as char
        )
    }
}

pub(crate) fn file_index(c: char) -> Option<u8> {
    match c {
        'a'..='h' => Some(c as u8 - b'a'),
        _ => None,
    }
}

pub(crate) fn rank_index(c: char) -> Option<u8> {
    match c {
        '1'..='8' => Some(c as u8 - b'1'),
        _ => None,
    }
}

/// Castling availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    pub white_king_side: bool,
    pub white_queen_side: bool,
    pub black_king_side: bool,
    pub black_queen_side: bool,
}

impl CastlingRights {
    fn all() -> Self {
        Self {
            white_king_side: true,
            white_queen_side: true,
            black_king_side: true,
            black_queen_side: true,
        }
    }

    fn has(&self, color: Color, side: CastleSide) -> bool {
        match (color, side) {
            (Color::White, CastleSide::King) => self.white_king_side,
            (Color::White, CastleSide::Queen) => self.white_queen_side,
            (Color::Black, CastleSide::King) => self.black_king_side,
            (Color::Black, CastleSide::Queen) => self.black_queen_side,
        }
    }

    fn clear_color(&mut self, color: Color) {
        match color {
            Color::White => {
                self.white_king_side = false;
                self.white_queen_side = false;
            }
            Color::Black => {
                self.black_king_side = false;
                self.black_queen_side = false;
            }
        }
    }

    /// Drop the right tied to a rook's home corner when that square is vacated or captured
    fn clear_corner(&mut self, square: Square) {
        match square.to_string().as_str() {
            "a1" => self.white_queen_side = false,
            "h1" => self.white_king_side = false,
            "a8" => self.black_queen_side = false,
            "h8" => self.black_king_side = false,
            _ => {}
        }
    }

    fn to_fen(self) -> String {
        let mut s = String::new();
        if self.white_king_side {
            s.push('K');
        }
        if self.white_queen_side {
            s.push('Q');
        }
        if self.black_king_side {
            s.push('k');
        }
        if self.black_queen_side {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// Which rook the king castles with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastleSide {
    King,
    Queen,
}

impl CastleSide {
    fn king_to_file(self) -> u8 {
        match self {
            CastleSide::King => 6,
            CastleSide::Queen => 2,
        }
    }

    fn rook_from_file(self) -> u8 {
        match self {
            CastleSide::King => 7,
            CastleSide::Queen => 0,
        }
    }

    fn rook_to_file(self) -> u8 {
        match self {
            CastleSide::King => 5,
            CastleSide::Queen => 3,
        }
    }
}

/// Special handling a move needs when applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    Normal,
    DoublePush,
    EnPassant,
    Castle(CastleSide),
}

/// A fully resolved move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
    pub kind: MoveKind,
}

impl Move {
    /// Coordinate (UCI) encoding, e.g. `e2e4`, `e7e8q`, `e1g1`
    pub fn uci(&self) -> String {
        let mut s = format!("{}{}", self.from, self.to);
        if let Some(role) = self.promotion {
            s.push(role.lower_char());
        }
        s
    }
}

/// FEN parse failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid FEN ({field}): {fen}")]
pub struct FenError {
    pub field: &'static str,
    pub fen: String,
}

/// Board state: placement, side to move, castling, en passant and clocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; 64],
    turn: Color,
    castling: CastlingRights,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

/// FEN of the standard initial position
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Default for Board {
    fn default() -> Self {
        Self::starting()
    }
}

impl Board {
    /// Standard initial position
    pub fn starting() -> Self {
        let mut squares = [None; 64];
        let back = [
            Role::Rook,
            Role::Knight,
            Role::Bishop,
            Role::Queen,
            Role::King,
            Role::Bishop,
            Role::Knight,
            Role::Rook,
        ];
        for (file, role) in back.iter().enumerate() {
            squares[file] = Some(Piece::new(Color::White, *role));
            squares[8 + file] = Some(Piece::new(Color::White, Role::Pawn));
            squares[48 + file] = Some(Piece::new(Color::Black, Role::Pawn));
            squares[56 + file] = Some(Piece::new(Color::Black, *role));
        }

        Self {
            squares,
            turn: Color::White,
            castling: CastlingRights::all(),
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Parse a FEN string (clock fields optional)
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let err = |field: &'static str| FenError {
            field,
            fen: fen.to_string(),
        };
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or_else(|| err("placement"))?;
        let mut squares = [None; 64];
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(err("placement"));
        }
        for (i, rank_text) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_text.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(err("placement"));
                    }
                    file += skip as u8;
                    if file > 8 {
                        return Err(err("placement"));
                    }
                } else {
                    let piece = Piece::from_fen_char(c).ok_or_else(|| err("placement"))?;
                    let sq = Square::new(file, rank).ok_or_else(|| err("placement"))?;
                    squares[sq.index()] = Some(piece);
                    file += 1;
                }
            }
            if file != 8 {
                return Err(err("placement"));
            }
        }

        let turn = match fields.next() {
            Some("w") => Color::White,
            Some("b") => Color::Black,
            _ => return Err(err("side to move")),
        };

        let castling_text = fields.next().ok_or_else(|| err("castling"))?;
        let mut castling = CastlingRights::default();
        if castling_text != "-" {
            for c in castling_text.chars() {
                match c {
                    'K' => castling.white_king_side = true,
                    'Q' => castling.white_queen_side = true,
                    'k' => castling.black_king_side = true,
                    'q' => castling.black_queen_side = true,
                    _ => return Err(err("castling")),
                }
            }
        }

        let en_passant = match fields.next().ok_or_else(|| err("en passant"))? {
            "-" => None,
            name => Some(Square::parse(name).ok_or_else(|| err("en passant"))?),
        };

        let halfmove_clock = match fields.next() {
            Some(n) => n.parse().map_err(|_| err("halfmove clock"))?,
            None => 0,
        };
        let fullmove_number = match fields.next() {
            Some(n) => n.parse().map_err(|_| err("fullmove number"))?,
            None => 1,
        };

        Ok(Self {
            squares,
            turn,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    /// Serialize to FEN
    pub fn to_fen(&self) -> String {
        let mut placement = String::with_capacity(64);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.squares[(rank * 8 + file) as usize] {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        let side = match self.turn {
            Color::White => "w",
            Color::Black => "b",
        };
        let en_passant = self
            .en_passant
            .map(|sq| sq.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement,
            side,
            self.castling.to_fen(),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }

    /// Side whose turn it is
    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square.index()]
    }

    pub fn castling(&self) -> CastlingRights {
        self.castling
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    fn king_square(&self, color: Color) -> Option<Square> {
        (0..64u8)
            .map(Square)
            .find(|sq| self.piece_at(*sq) == Some(Piece::new(color, Role::King)))
    }

    /// Whether `color`'s king is attacked
    pub fn in_check(&self, color: Color) -> bool {
        self.king_square(color)
            .map(|king| attacks::is_attacked(self, king, color.opposite()))
            .unwrap_or(false)
    }

    /// All legal moves for the side to move, ordered by UCI text
    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(self)
    }

    /// Apply a resolved move without legality checks
    ///
    /// Callers resolve moves through `san::resolve`, which only produces moves
    /// valid for this position.
    pub(crate) fn apply(&mut self, mv: &Move) {
        let mover = self.turn;
        let moving = self.squares[mv.from.index()];
        let captured = self.squares[mv.to.index()];
        let is_pawn = matches!(moving, Some(Piece { role: Role::Pawn, .. }));

        self.squares[mv.from.index()] = None;
        let placed = match (moving, mv.promotion) {
            (Some(piece), Some(role)) => Some(Piece::new(piece.color, role)),
            (piece, None) => piece,
            (None, Some(_)) => None,
        };
        self.squares[mv.to.index()] = placed;

        match mv.kind {
            MoveKind::EnPassant => {
                if let Some(victim) = mv.to.offset(0, -mover.pawn_direction()) {
                    self.squares[victim.index()] = None;
                }
            }
            MoveKind::Castle(side) => {
                let rank = mover.back_rank();
                if let (Some(rook_from), Some(rook_to)) = (
                    Square::new(side.rook_from_file(), rank),
                    Square::new(side.rook_to_file(), rank),
                ) {
                    self.squares[rook_to.index()] = self.squares[rook_from.index()].take();
                }
            }
            MoveKind::Normal | MoveKind::DoublePush => {}
        }

        if matches!(moving, Some(Piece { role: Role::King, .. })) {
            self.castling.clear_color(mover);
        }
        self.castling.clear_corner(mv.from);
        self.castling.clear_corner(mv.to);

        self.en_passant = match mv.kind {
            MoveKind::DoublePush => mv.from.offset(0, mover.pawn_direction()),
            _ => None,
        };

        if is_pawn || captured.is_some() || mv.kind == MoveKind::EnPassant {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        if mover == Color::Black {
            self.fullmove_number += 1;
        }
        self.turn = mover.opposite();
    }
}
