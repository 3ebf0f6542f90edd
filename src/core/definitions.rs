use std::fmt::{Debug, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::utils::{compact_pos, is_valid_coord, unpack_pos};

/** Board coordinate kept in 0x88 layout: `rank << 4 | file`, both zero based. */
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Square(u8);

impl Square {
    /// `file` and `rank` are zero based, `Square::new(4, 3)` is `e4`.
    pub fn new(file: u8, rank: u8) -> Option<Square> {
        if file < 8 && rank < 8 {
            Some(Square(compact_pos(rank, file)))
        } else {
            None
        }
    }

    pub fn from_code(code: u8) -> Option<Square> {
        if is_valid_coord(code) {
            Some(Square(code))
        } else {
            None
        }
    }

    /** Parses the canonical `<file><rank>` form, e.g. `"e4"`. */
    pub fn parse(text: &str) -> Option<Square> {
        let mut chars = text.chars();
        let (file, rank) = (chars.next()?, chars.next()?);
        if chars.next().is_some() || !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return None;
        }
        Square::new(file as u8 - b'a', rank as u8 - b'1')
    }

    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn file(self) -> u8 {
        let (_, file): (u8, u8) = unpack_pos(self.0);
        file
    }

    pub fn rank(self) -> u8 {
        let (rank, _): (u8, u8) = unpack_pos(self.0);
        rank
    }

    /** Same rank, another file. */
    pub fn with_file(self, file: u8) -> Option<Square> {
        Square::new(file, self.rank())
    }

    /** Step by a raw 0x88 offset, `None` when it leaves the board. */
    #[inline]
    pub fn offset(self, step: u8) -> Option<Square> {
        Square::from_code(self.0.wrapping_add(step))
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", (b'a' + self.file()) as char, self.rank() + 1)
    }
}

impl Debug for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl TryFrom<u8> for Square {
    type Error = String;

    /** Rejects codes off the 0x88 board, so a decoded square is always valid. */
    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Square::from_code(code).ok_or_else(|| format!("0x{code:02x} is not a board square"))
    }
}

impl From<Square> for u8 {
    fn from(square: Square) -> Self {
        square.0
    }
}

impl FromStr for Square {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Square::parse(s).ok_or(())
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub enum Color {
    #[default]
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        if self == Color::White {
            Color::Black
        } else {
            Color::White
        }
    }

    /** 0x88 step of a pawn push. */
    pub fn forward(self) -> u8 {
        match self {
            Color::White => 0x10,
            Color::Black => 0xf0,
        }
    }

    pub fn pawn_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 6,
        }
    }

    pub fn promotion_rank(self) -> u8 {
        match self {
            Color::White => 7,
            Color::Black => 0,
        }
    }

    pub fn back_rank(self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => 7,
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(if self == &Self::White {
            "White"
        } else {
            "Black"
        })
    }
}

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /** Kind by export letter, either case. */
    pub fn from_symbol(symbol: char) -> Option<PieceKind> {
        match symbol.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }

    /** Uppercase letter for White, lowercase for Black. */
    pub fn symbol(self, color: Color) -> char {
        let symbol = match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        };
        match color {
            Color::White => symbol.to_ascii_uppercase(),
            Color::Black => symbol,
        }
    }
}

/** Pieces a pawn may turn into. */
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub const ALL: [Promotion; 4] = [
        Promotion::Queen,
        Promotion::Rook,
        Promotion::Bishop,
        Promotion::Knight,
    ];

    pub fn from_symbol(symbol: char) -> Option<Promotion> {
        match symbol.to_ascii_uppercase() {
            'Q' => Some(Promotion::Queen),
            'R' => Some(Promotion::Rook),
            'B' => Some(Promotion::Bishop),
            'N' => Some(Promotion::Knight),
            _ => None,
        }
    }
}

impl From<Promotion> for PieceKind {
    fn from(value: Promotion) -> Self {
        match value {
            Promotion::Queen => PieceKind::Queen,
            Promotion::Rook => PieceKind::Rook,
            Promotion::Bishop => PieceKind::Bishop,
            Promotion::Knight => PieceKind::Knight,
        }
    }
}

/** Value is the rook's starting file. */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CastlingSide {
    KingSide = 0x07,
    QueenSide = 0x00,
}

impl CastlingSide {
    pub fn rook_file(self) -> u8 {
        self as u8
    }

    /** File the king lands on. */
    pub fn king_target_file(self) -> u8 {
        match self {
            CastlingSide::KingSide => 6,
            CastlingSide::QueenSide => 2,
        }
    }

    /** File the rook lands on. */
    pub fn rook_target_file(self) -> u8 {
        match self {
            CastlingSide::KingSide => 5,
            CastlingSide::QueenSide => 3,
        }
    }

    pub fn from_king_target(file: u8) -> Option<CastlingSide> {
        match file {
            6 => Some(CastlingSide::KingSide),
            2 => Some(CastlingSide::QueenSide),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    #[default]
    Ongoing,
    Check,
    Checkmate,
    Stalemate,
}

impl GameState {
    pub fn is_final(self) -> bool {
        matches!(self, GameState::Checkmate | GameState::Stalemate)
    }
}

/** What changed after a call into the manager. */
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    BoardChanged,
    CurrentPlayerChanged(Color),
    PromotionPending(Square),
}
