pub mod core;
pub mod manager;
pub mod utils;

// module re-exports
pub use crate::core::command::{CommandManager, MoveCommand};
pub use crate::core::definitions::{
    CastlingSide, Color, GameEvent, GameState, PieceKind, Promotion, Square,
};
pub use crate::core::engine::{Board, ImportError, Piece};
pub use crate::core::game::{Game, Played};
pub use crate::core::journal::{LogSink, ModelLog, NullLog};
pub use crate::manager::GameManager;

#[cfg(test)]
mod tests;
