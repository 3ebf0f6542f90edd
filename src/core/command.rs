use log::{debug, warn};

use crate::core::definitions::{Color, PieceKind, Promotion, Square};
use crate::core::game::{Game, Played};

/** State lost by a move: enough to put the game back exactly. */
#[derive(Debug, Clone, Copy)]
struct Record {
    played: Played,
    side_to_move: Color,
    en_passant: Option<Square>,
}

/** One move request together with what it takes to reverse it. */
#[derive(Debug, Clone)]
pub struct MoveCommand {
    from: Square,
    to: Square,
    record: Option<Record>,
    /** Filled once the player picked a piece, replayed on redo. */
    promotion: Option<Promotion>,
}

impl MoveCommand {
    pub fn new(from: Square, to: Square) -> Self {
        MoveCommand {
            from,
            to,
            record: None,
            promotion: None,
        }
    }

    pub fn from(&self) -> Square {
        self.from
    }

    pub fn to(&self) -> Square {
        self.to
    }

    pub fn promotion(&self) -> Option<Promotion> {
        self.promotion
    }

    /** Whether the executed move took a pawn to the last rank. */
    pub fn is_promotion(&self) -> bool {
        self.record
            .map(|record| {
                let pawn = record.played.mover;
                pawn.kind() == PieceKind::Pawn
                    && self.to.rank() == pawn.color().promotion_rank()
            })
            .unwrap_or(false)
    }

    /** Plays the move, remembering the pre-move state. Nothing is kept when
     * the game refuses it. */
    pub fn execute(&mut self, game: &mut Game) -> bool {
        let (side_to_move, en_passant) = (game.side_to_move(), game.en_passant_target());
        let Some(played) = game.play(self.from, self.to) else {
            return false;
        };
        self.record = Some(Record {
            played,
            side_to_move,
            en_passant,
        });
        if let Some(choice) = self.promotion {
            if !game.promote(self.to, choice) {
                warn!("Replayed promotion on {} was refused", self.to);
            }
        }
        true
    }

    /** Reverses an executed move. Refused when the board no longer shows the
     * move, e.g. after the position was replaced behind the history's back. */
    pub fn undo(&self, game: &mut Game) -> bool {
        let Some(record) = self.record else {
            return false;
        };
        let played = record.played;
        match game.piece_at(self.to) {
            Some(piece) if piece.color() == played.mover.color() => (),
            _ => {
                warn!("Can't undo {} -> {}: the board has changed", self.from, self.to);
                return false;
            }
        }
        let board = game.board_mut();
        // mover goes back as it was, a promoted piece turns into its pawn again
        board.remove(self.to);
        board.place(played.mover, self.from);
        if let Some(captured) = played.captured {
            board.place(captured, captured.square());
        }
        if let Some((rook, rook_to)) = played.castling {
            board.remove(rook_to);
            board.place(rook, rook.square());
        }
        game.restore(record.side_to_move, record.en_passant);
        debug!("Undone move {} -> {}", self.from, self.to);
        true
    }
}

/** Linear undo/redo history. A new move drops every redo entry. */
#[derive(Debug, Default)]
pub struct CommandManager {
    history: Vec<MoveCommand>,
    redo: Vec<MoveCommand>,
}

impl CommandManager {
    pub fn new() -> Self {
        Default::default()
    }

    /** Parses the squares and invokes a move command. */
    pub fn execute(&mut self, game: &mut Game, from: &str, to: &str) -> bool {
        match (Square::parse(from), Square::parse(to)) {
            (Some(from), Some(to)) => self.invoke(game, from, to),
            _ => false,
        }
    }

    pub fn invoke(&mut self, game: &mut Game, from: Square, to: Square) -> bool {
        let mut command = MoveCommand::new(from, to);
        if !command.execute(game) {
            return false;
        }
        self.history.push(command);
        self.redo.clear();
        true
    }

    pub fn undo(&mut self, game: &mut Game) -> bool {
        let Some(command) = self.history.pop() else {
            return false;
        };
        if !command.undo(game) {
            self.history.push(command);
            return false;
        }
        self.redo.push(command);
        true
    }

    pub fn redo(&mut self, game: &mut Game) -> bool {
        let Some(mut command) = self.redo.pop() else {
            return false;
        };
        if !command.execute(game) {
            warn!(
                "Redo of {} -> {} was refused, dropping redo history",
                command.from, command.to
            );
            self.redo.clear();
            return false;
        }
        self.history.push(command);
        true
    }

    /** Attaches the chosen piece to the latest move so redo can replay it. */
    pub fn record_promotion(&mut self, choice: Promotion) {
        if let Some(command) = self.history.last_mut() {
            command.promotion = Some(choice);
        }
    }

    pub fn last(&self) -> Option<&MoveCommand> {
        self.history.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.redo.clear();
    }
}
