use std::sync::Arc;

use log::{debug, trace, warn};
use postcard::to_allocvec;
use serde::{Deserialize, Serialize};

use crate::core::definitions::{CastlingSide, Color, GameState, PieceKind, Promotion, Square};
use crate::core::engine::{Board, ImportError, Piece};
use crate::core::journal::{default_sink, LogSink};

/** What a move did. Copies are taken before the move, so flags are the
 * pre-move ones. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Played {
    pub mover: Piece,
    /** Captured piece, its square is where it stood. */
    pub captured: Option<Piece>,
    /** Castling rook as it stood, and where it went. */
    pub castling: Option<(Piece, Square)>,
    pub en_passant: bool,
}

impl Played {
    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }
}

/** Applies a pseudo-legal move, special moves included, without any legality
 * checks. Shared by the real move and by the king-safety simulation. */
fn play_on(
    board: &mut Board,
    from: Square,
    to: Square,
    en_passant: Option<Square>,
) -> Option<Played> {
    let mover = board.get(from)?;
    let mut played = Played {
        mover,
        captured: None,
        castling: None,
        en_passant: false,
    };
    match mover.kind() {
        PieceKind::King if from.file().abs_diff(to.file()) == 2 => {
            let rook_squares = CastlingSide::from_king_target(to.file()).and_then(|side| {
                Some((
                    from.with_file(side.rook_file())?,
                    from.with_file(side.rook_target_file())?,
                ))
            });
            if let Some((rook_from, rook_to)) = rook_squares {
                if let Some(rook) = board.get(rook_from) {
                    board.relocate(rook_from, rook_to);
                    played.castling = Some((rook, rook_to));
                }
            }
        }
        PieceKind::Pawn if en_passant == Some(to) && from.file() != to.file() => {
            // captured pawn sits beside the mover, not on the target
            if let Some(capture_square) = Square::new(to.file(), from.rank()) {
                played.captured = board.remove(capture_square);
                played.en_passant = played.captured.is_some();
            }
        }
        _ => (),
    }
    if let Some(captured) = board.relocate(from, to) {
        played.captured = Some(captured);
    }
    Some(played)
}

/** Rule engine: one board plus turn, state and special-move bookkeeping. */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    board: Board,
    side_to_move: Color,
    state: GameState,
    winner: Option<Color>,
    en_passant: Option<Square>,
    pending_promotion: Option<Square>,
    white_name: String,
    black_name: String,
    #[serde(skip, default = "default_sink")]
    sink: Arc<dyn LogSink>,
}

impl Game {
    pub fn new() -> Game {
        Game::with_players("White", "Black")
    }

    pub fn with_players(white: impl Into<String>, black: impl Into<String>) -> Game {
        Game::with_sink(white, black, default_sink())
    }

    pub fn with_sink(
        white: impl Into<String>,
        black: impl Into<String>,
        sink: Arc<dyn LogSink>,
    ) -> Game {
        let game = Game {
            board: Board::default(),
            side_to_move: Color::White,
            state: GameState::Ongoing,
            winner: None,
            en_passant: None,
            pending_promotion: None,
            white_name: white.into(),
            black_name: black.into(),
            sink,
        };
        game.note(format!(
            "New game started: {} (White) vs {} (Black)",
            game.white_name, game.black_name
        ));
        game
    }

    /** Default game with the position replaced by an exported one. */
    pub fn from_export(text: &str) -> Result<Game, ImportError> {
        let mut game = Game::new();
        game.import(text)?;
        Ok(game)
    }

    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    pub fn set_sink(&mut self, sink: Arc<dyn LogSink>) {
        self.sink = sink;
    }

    fn note(&self, entry: impl AsRef<str>) {
        self.sink.append(entry.as_ref());
    }

    /** Moves a piece given squares in `<file><rank>` form. Any malformed or
     * illegal request is answered with `false` and leaves the game unchanged. */
    pub fn move_piece(&mut self, from: &str, to: &str) -> bool {
        match (Square::parse(from), Square::parse(to)) {
            (Some(from), Some(to)) => self.move_squares(from, to),
            _ => {
                trace!("Malformed move request {from:?} -> {to:?}");
                false
            }
        }
    }

    pub fn move_squares(&mut self, from: Square, to: Square) -> bool {
        self.play(from, to).is_some()
    }

    /** The move itself; `None` when it was refused. */
    pub(crate) fn play(&mut self, from: Square, to: Square) -> Option<Played> {
        if let Some(square) = self.pending_promotion {
            self.note(format!(
                "Move from {from} to {to} refused: promotion on {square} is pending."
            ));
            return None;
        }
        let piece = self.board.get(from)?;
        if piece.color() != self.side_to_move {
            return None;
        }
        if !piece.pseudo_moves(&self.board, self.en_passant).contains(&to) {
            self.note(format!("Invalid move from {from} to {to}."));
            return None;
        }
        if !self.is_safe(&piece, to) {
            self.note(format!(
                "Invalid move from {from} to {to}: the king would be left in check."
            ));
            return None;
        }

        let played = play_on(&mut self.board, from, to, self.en_passant)?;
        if let Some((rook, rook_to)) = played.castling {
            self.note(format!(
                "{} castled, rook moved from {} to {rook_to}.",
                piece.color(),
                rook.square()
            ));
        }
        if let (true, Some(captured)) = (played.en_passant, played.captured) {
            self.note(format!("En passant capture on {}.", captured.square()));
        }
        self.note(format!("Piece moved from {from} to {to}: {}", piece.symbol()));

        if piece.kind() == PieceKind::Pawn && to.rank() == piece.color().promotion_rank() {
            self.pending_promotion = Some(to);
            self.en_passant = None;
            self.update_state();
            return Some(played);
        }

        self.en_passant = if piece.kind() == PieceKind::Pawn && from.rank().abs_diff(to.rank()) == 2
        {
            from.offset(piece.color().forward())
        } else {
            None
        };
        self.side_to_move = self.side_to_move.opposite();
        self.update_state();
        Some(played)
    }

    /** Plays the move on a copy of the board and reports whether the mover's
     * king is out of check afterwards. */
    fn is_safe(&self, piece: &Piece, to: Square) -> bool {
        let mut board = self.board.clone();
        play_on(&mut board, piece.square(), to, self.en_passant);
        !board.is_checked(piece.color())
    }

    fn has_legal_move(&self, color: Color) -> bool {
        self.board.pieces(color).any(|piece| {
            piece
                .pseudo_moves(&self.board, self.en_passant)
                .into_iter()
                .any(|to| self.is_safe(&piece, to))
        })
    }

    pub(crate) fn update_state(&mut self) {
        let side = self.side_to_move;
        let in_check = self.board.is_checked(side);
        let has_moves = self.has_legal_move(side);
        (self.state, self.winner) = match (in_check, has_moves) {
            (true, false) => (GameState::Checkmate, Some(side.opposite())),
            (false, false) => (GameState::Stalemate, None),
            (true, true) => (GameState::Check, None),
            (false, true) => (GameState::Ongoing, None),
        };
        debug!("State for {side}: {:?}", self.state);
        match self.state {
            GameState::Checkmate => {
                self.note(format!("Checkmate. Winner: {}", self.winner_name()))
            }
            GameState::Stalemate => self.note("Stalemate."),
            GameState::Check => self.note(format!(
                "Player in check: {}",
                self.current_player_name()
            )),
            GameState::Ongoing => (),
        }
    }

    pub fn is_square_attacked(&self, square: Square, by: Color) -> bool {
        self.board.is_attacked(square, by)
    }

    pub fn can_castle(&self, king: &Piece, side: CastlingSide) -> bool {
        self.board.can_castle(king, side)
    }

    /** Replaces the pawn waiting on `square`. Only valid right after a pawn
     * reached the last rank; otherwise nothing happens. */
    pub fn promote(&mut self, square: Square, choice: Promotion) -> bool {
        if self.pending_promotion != Some(square) {
            self.note(format!("No promotion is pending on {square}."));
            return false;
        }
        let Some(pawn) = self.board.get(square) else {
            return false;
        };
        let kind = PieceKind::from(choice);
        let mut promoted = Piece::new(kind, pawn.color(), square);
        promoted.set_moved(true);
        self.board.place(promoted, square);
        self.pending_promotion = None;
        self.side_to_move = self.side_to_move.opposite();
        self.update_state();
        self.note(format!("Pawn promoted to {kind:?} on {square}."));
        true
    }

    pub fn export(&self) -> String {
        let mut text = String::from(match self.side_to_move {
            Color::White => "WHITE",
            Color::Black => "BLACK",
        });
        text.push_str(",\n");
        for (_, piece) in self.board.occupied() {
            text.push_str(&piece.token());
            text.push(',');
        }
        text
    }

    /** Replaces the position from the text format. Blank input is ignored.
     * On error the game is left exactly as it was. En passant and pending
     * promotion are never part of the text, so both are reset. */
    pub fn import(&mut self, text: &str) -> Result<(), ImportError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let (side, pieces) = match parse_position(text) {
            Ok(position) => position,
            Err(err) => {
                self.note(format!("Import failed: {err}"));
                return Err(err);
            }
        };
        self.board.clear();
        for piece in pieces {
            self.board.place(piece, piece.square());
        }
        self.side_to_move = side;
        self.en_passant = None;
        self.pending_promotion = None;
        self.update_state();
        self.note("Game imported from text.");
        Ok(())
    }

    /** Opaque binary snapshot of the whole game. The log sink is not part of it. */
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        to_allocvec(self)
    }

    /** Decodes a snapshot. Squares are checked while decoding; a board whose
     * pieces disagree with their cells is rejected as well. */
    pub fn from_bytes(bytes: &[u8]) -> Result<Game, postcard::Error> {
        let game: Game = postcard::from_bytes(bytes)?;
        if !game.board.is_consistent() {
            warn!("Decoded board has pieces outside their cells");
            return Err(postcard::Error::SerdeDeCustom);
        }
        Ok(game)
    }

    /** Legal destinations of the piece on `square`, if it belongs to the side
     * to move. */
    pub fn possible_moves(&self, square: Square) -> Vec<Square> {
        match self.board.get(square) {
            Some(piece) if piece.color() == self.side_to_move && self.pending_promotion.is_none() => {
                piece
                    .pseudo_moves(&self.board, self.en_passant)
                    .into_iter()
                    .filter(|to| self.is_safe(&piece, *to))
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    /** Every legal (from, to) pair for the side to move. */
    pub fn legal_moves(&self) -> Vec<(Square, Square)> {
        if self.pending_promotion.is_some() {
            return Vec::new();
        }
        self.board
            .pieces(self.side_to_move)
            .flat_map(|piece| {
                self.possible_moves(piece.square())
                    .into_iter()
                    .map(move |to| (piece.square(), to))
            })
            .collect()
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    /** Puts turn bookkeeping back after a move was reversed on the board. */
    pub(crate) fn restore(&mut self, side_to_move: Color, en_passant: Option<Square>) {
        self.side_to_move = side_to_move;
        self.en_passant = en_passant;
        self.pending_promotion = None;
        self.update_state();
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.get(square)
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn winner(&self) -> Option<Color> {
        self.winner
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_final()
    }

    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn promotion_square(&self) -> Option<Square> {
        self.pending_promotion
    }

    pub fn is_waiting_for_promotion(&self) -> bool {
        self.pending_promotion.is_some()
    }

    pub fn white_name(&self) -> &str {
        &self.white_name
    }

    pub fn black_name(&self) -> &str {
        &self.black_name
    }

    pub fn player_name(&self, color: Color) -> &str {
        match color {
            Color::White => &self.white_name,
            Color::Black => &self.black_name,
        }
    }

    pub fn current_player_name(&self) -> &str {
        self.player_name(self.side_to_move)
    }

    /** Winner's name, `"DRAW"` when nobody won. */
    pub fn winner_name(&self) -> &str {
        match self.winner {
            Some(color) => self.player_name(color),
            None => "DRAW",
        }
    }
}

impl Default for Game {
    fn default() -> Self {
        Game::new()
    }
}

fn parse_position(text: &str) -> Result<(Color, Vec<Piece>), ImportError> {
    let mut segments = text.split(',').map(str::trim);
    let side = segments.next().unwrap_or_default();
    let side = if side.eq_ignore_ascii_case("WHITE") {
        Color::White
    } else if side.eq_ignore_ascii_case("BLACK") {
        Color::Black
    } else {
        return Err(ImportError::Side(side.to_owned()));
    };
    let pieces = segments
        .filter(|segment| !segment.is_empty())
        .map(Piece::from_token)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((side, pieces))
}
