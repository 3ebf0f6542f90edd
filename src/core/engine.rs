use std::fmt::{Debug, Display};

use log::trace;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::core::definitions::{CastlingSide, Color, PieceKind, Square};
use crate::core::utils::{
    between, chebyshev, distance, in_direction, is_in_diagonal_line, is_in_straight_line,
};

/** Variation of 0x88 board: 128 cells, the right half never holds a piece. */
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde_as(as = "[_; 128]")]
    cells: [Option<Piece>; 128],
}

impl Board {
    /** Empty board. Use `Board::default()` for the initial setup. */
    pub fn new() -> Board {
        Board {
            cells: [None; 128],
        }
    }

    pub fn get(&self, square: Square) -> Option<Piece> {
        self.cells[square.index()]
    }

    /** Puts `piece` on `square`, returning whatever stood there before. */
    pub fn place(&mut self, mut piece: Piece, square: Square) -> Option<Piece> {
        piece.square = square;
        self.cells[square.index()].replace(piece)
    }

    pub fn remove(&mut self, square: Square) -> Option<Piece> {
        self.cells[square.index()].take()
    }

    /** Raw move without any rule checks. Marks the piece as moved and returns
     * the displaced occupant of `to`. Does nothing when `from` is empty. */
    pub fn relocate(&mut self, from: Square, to: Square) -> Option<Piece> {
        let Some(mut piece) = self.remove(from) else {
            trace!("Relocating from empty square {from}");
            return None;
        };
        piece.moved = true;
        self.place(piece, to)
    }

    pub fn clear(&mut self) {
        self.cells = [None; 128];
    }

    /** Every piece sits in the cell its square points to. */
    pub fn is_consistent(&self) -> bool {
        self.cells
            .iter()
            .enumerate()
            .all(|(index, cell)| cell.map_or(true, |piece| piece.square.index() == index))
    }

    /** Occupied squares in file-major order: a1, a2, .., a8, b1, .. */
    pub fn occupied(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        ITER_INDEX
            .iter()
            .filter_map(|&i| self.cells[i].map(|piece| (piece.square, piece)))
    }

    pub fn pieces(&self, color: Color) -> impl Iterator<Item = Piece> + '_ {
        self.occupied()
            .map(|(_, piece)| piece)
            .filter(move |piece| piece.color == color)
    }

    pub fn king(&self, color: Color) -> Option<Piece> {
        self.pieces(color).find(|piece| piece.kind == PieceKind::King)
    }

    /** Whether any `by` piece attacks `square`. Kings only count their
     * neighbourhood, so this never recurses into king move generation. */
    pub fn is_attacked(&self, square: Square, by: Color) -> bool {
        self.pieces(by).any(|piece| piece.can_attack(square, self))
    }

    pub fn is_checked(&self, color: Color) -> bool {
        self.king(color)
            .map(|king| self.is_attacked(king.square, color.opposite()))
            .unwrap_or(false)
    }

    pub fn can_castle(&self, king: &Piece, side: CastlingSide) -> bool {
        if king.kind != PieceKind::King
            || king.moved
            || king.square.file() != KING_FILE
            || king.square.rank() != king.color.back_rank()
        {
            return false;
        }
        let Some(rook_square) = king.square.with_file(side.rook_file()) else {
            return false;
        };
        let rook_ready = matches!(
            self.get(rook_square),
            Some(rook) if rook.kind == PieceKind::Rook && rook.color == king.color && !rook.moved
        );
        if !rook_ready
            || between(king.square.code(), rook_square.code())
                .any(|pos| self.cells[pos as usize].is_some())
        {
            return false;
        }
        let enemy = king.color.opposite();
        let target = side.king_target_file();
        let (low, high) = (KING_FILE.min(target), KING_FILE.max(target));
        (low..=high)
            .filter_map(|file| king.square.with_file(file))
            .all(|pos| !self.is_attacked(pos, enemy))
    }

    /** Standard opening position. */
    fn setup(&mut self) {
        const BACK_RANK: [PieceKind; 8] = [
            PieceKind::Rook,
            PieceKind::Knight,
            PieceKind::Bishop,
            PieceKind::Queen,
            PieceKind::King,
            PieceKind::Bishop,
            PieceKind::Knight,
            PieceKind::Rook,
        ];
        for color in [Color::White, Color::Black] {
            for (file, kind) in (0u8..).zip(BACK_RANK) {
                if let Some(square) = Square::new(file, color.back_rank()) {
                    self.place(Piece::new(kind, color, square), square);
                }
                if let Some(square) = Square::new(file, color.pawn_rank()) {
                    self.place(Piece::new(PieceKind::Pawn, color, square), square);
                }
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        let mut board = Board::new();
        board.setup();
        board
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8u8 {
                let symbol = Square::new(file, rank)
                    .and_then(|square| self.get(square))
                    .map(|piece| piece.symbol())
                    .unwrap_or('.');
                write!(f, " {symbol}")?;
            }
            writeln!(f)?;
        }
        write!(f, "   a b c d e f g h")
    }
}

const KING_FILE: u8 = 4;

const ITER_INDEX: [usize; 64] = {
    let mut arr = [0; 64];
    let mut file = 0;
    let mut rank = 0;
    while file < 8 {
        arr[file * 8 + rank] = rank << 4 | file;
        if rank < 7 {
            rank += 1;
        } else {
            rank = 0;
            file += 1;
        }
    }
    arr
};

/** Tables directions for pieces */
const BISHOP_DIR: &[u8] = &[0x11, 0x0f, 0xef, 0xf1];
const ROOK_DIR: &[u8] = &[0x10, 0xff, 0xf0, 0x01];
const QUEEN_DIR: &[u8] = &[0x11, 0x0f, 0xef, 0xf1, 0x10, 0xff, 0xf0, 0x01];

/** Possible moves for pieces */
const KING_MOVES: &[u8] = QUEEN_DIR;
const KNIGHT_MOVES: &[u8] = &[0x12, 0x21, 0x1f, 0x0e, 0xee, 0xdf, 0xe1, 0xf2];

/** Pawn capture sides: one file right, one file left. */
const PAWN_CAPTURES: [u8; 2] = [0x01, 0xff];

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    kind: PieceKind,
    color: Color,
    square: Square,
    moved: bool,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color, square: Square) -> Piece {
        Piece {
            kind,
            color,
            square,
            moved: false,
        }
    }

    /** Parses one export token such as `Ke1*` or `pd5`. */
    pub fn from_token(text: &str) -> Result<Piece, ImportError> {
        let mut chars = text.chars();
        let symbol = chars
            .next()
            .ok_or_else(|| ImportError::Token(text.to_owned()))?;
        let kind = PieceKind::from_symbol(symbol).ok_or(ImportError::UnknownPiece(symbol))?;
        let rest = chars.as_str();
        let (coords, unmoved) = match rest.strip_suffix('*') {
            Some(coords) => (coords, true),
            None => (rest, false),
        };
        let square = Square::parse(coords).ok_or_else(|| ImportError::Square(coords.to_owned()))?;
        let color = if symbol.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Ok(Piece {
            kind,
            color,
            square,
            moved: !unmoved,
        })
    }

    /** Export token; only unmoved kings and rooks carry the `*` marker. */
    pub fn token(&self) -> String {
        let marker = if !self.moved && matches!(self.kind, PieceKind::King | PieceKind::Rook) {
            "*"
        } else {
            ""
        };
        format!("{}{}{}", self.symbol(), self.square, marker)
    }

    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn square(&self) -> Square {
        self.square
    }

    pub fn has_moved(&self) -> bool {
        self.moved
    }

    pub fn set_moved(&mut self, moved: bool) {
        self.moved = moved;
    }

    pub fn symbol(&self) -> char {
        self.kind.symbol(self.color)
    }

    /** Pseudo-legal destinations. Own-king safety is left to the rule engine,
     * except that a king never steps onto an attacked square. */
    pub fn pseudo_moves(&self, board: &Board, en_passant: Option<Square>) -> Vec<Square> {
        let mut moves = Vec::with_capacity(28);
        match self.kind {
            PieceKind::Pawn => self.pawn_moves(board, en_passant, &mut moves),
            PieceKind::Knight => self.step_moves(board, KNIGHT_MOVES, &mut moves),
            PieceKind::Bishop => self.slide_moves(board, BISHOP_DIR, &mut moves),
            PieceKind::Rook => self.slide_moves(board, ROOK_DIR, &mut moves),
            PieceKind::Queen => self.slide_moves(board, QUEEN_DIR, &mut moves),
            PieceKind::King => {
                let enemy = self.color.opposite();
                self.step_moves(board, KING_MOVES, &mut moves);
                moves.retain(|pos| !board.is_attacked(*pos, enemy));
                for side in [CastlingSide::KingSide, CastlingSide::QueenSide] {
                    if board.can_castle(self, side) {
                        moves.extend(self.square.with_file(side.king_target_file()));
                    }
                }
            }
        }
        moves
    }

    fn is_free_for_me(&self, board: &Board, pos: Square) -> bool {
        board
            .get(pos)
            .map(|other| other.color != self.color)
            .unwrap_or(true)
    }

    fn step_moves(&self, board: &Board, offsets: &[u8], moves: &mut Vec<Square>) {
        moves.extend(
            offsets
                .iter()
                .filter_map(|step| self.square.offset(*step))
                .filter(|pos| self.is_free_for_me(board, *pos)),
        );
    }

    fn slide_moves(&self, board: &Board, directions: &[u8], moves: &mut Vec<Square>) {
        for dir in directions {
            for pos in in_direction(self.square.code(), *dir) {
                match board.cells[pos as usize] {
                    None => moves.extend(Square::from_code(pos)),
                    Some(other) => {
                        if other.color != self.color {
                            moves.push(other.square);
                        }
                        break;
                    }
                }
            }
        }
    }

    fn pawn_moves(&self, board: &Board, en_passant: Option<Square>, moves: &mut Vec<Square>) {
        let step = self.color.forward();
        let Some(front) = self.square.offset(step) else {
            return;
        };
        // push
        if board.get(front).is_none() {
            moves.push(front);
            // double push
            if self.square.rank() == self.color.pawn_rank() {
                if let Some(double) = front.offset(step) {
                    if board.get(double).is_none() {
                        moves.push(double);
                    }
                }
            }
        }
        // capture and enpassant
        for side in PAWN_CAPTURES {
            let Some(pos) = front.offset(side) else {
                continue;
            };
            match board.get(pos) {
                Some(target) if target.color != self.color => moves.push(pos),
                None if en_passant == Some(pos) => moves.push(pos),
                _ => (),
            }
        }
    }

    /** Attack geometry, independent of whose turn it is. Sliders see up to and
     * including the first occupied cell, so defended pieces count as attacked. */
    pub fn can_attack(&self, target: Square, board: &Board) -> bool {
        let (from, to) = (self.square.code(), target.code());
        if from == to {
            return false;
        }
        let clear_path = || between(from, to).all(|pos| board.cells[pos as usize].is_none());
        match self.kind {
            PieceKind::Pawn => self
                .square
                .offset(self.color.forward())
                .map(|front| front.rank() == target.rank() && front.file().abs_diff(target.file()) == 1)
                .unwrap_or(false),
            PieceKind::Knight => distance(from, to) == 3 && chebyshev(from, to) == 2,
            PieceKind::Bishop => is_in_diagonal_line(from, to) && clear_path(),
            PieceKind::Rook => is_in_straight_line(from, to) && clear_path(),
            PieceKind::Queen => {
                (is_in_straight_line(from, to) || is_in_diagonal_line(from, to)) && clear_path()
            }
            PieceKind::King => chebyshev(from, to) == 1,
        }
    }
}

impl Debug for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Piece")
            .field("kind", &self.kind)
            .field("color", &self.color)
            .field("square", &self.square)
            .field("moved", &self.moved)
            .finish()
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    Side(String),
    Token(String),
    UnknownPiece(char),
    Square(String),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Side(side) => write!(f, "unknown side to move `{side}`"),
            ImportError::Token(token) => write!(f, "malformed piece token `{token}`"),
            ImportError::UnknownPiece(symbol) => write!(f, "unknown piece symbol `{symbol}`"),
            ImportError::Square(square) => write!(f, "invalid square `{square}`"),
        }
    }
}

impl std::error::Error for ImportError {}
