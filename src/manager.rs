use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::{info, warn};

use crate::core::command::CommandManager;
use crate::core::definitions::{GameEvent, Promotion};
use crate::core::engine::ImportError;
use crate::core::game::Game;
use crate::core::journal::{LogSink, ModelLog};

/// Entry point for a front end: one game, its history and the events the
/// last calls produced.
///
/// Nothing is pushed to the caller. Every call that changes what a player
/// sees queues [`GameEvent`]s, and the caller collects them with
/// [`GameManager::drain_events`].
#[derive(Debug)]
pub struct GameManager {
    game: Game,
    commands: CommandManager,
    sink: Arc<dyn LogSink>,
    events: Vec<GameEvent>,
}

impl GameManager {
    pub fn new() -> Self {
        GameManager::with_sink(Arc::new(ModelLog::new()))
    }

    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        GameManager {
            game: Game::with_sink("White", "Black", sink.clone()),
            commands: CommandManager::new(),
            sink,
            events: Vec::new(),
        }
    }

    pub fn new_game(&mut self, white: impl Into<String>, black: impl Into<String>) {
        self.game = Game::with_sink(white, black, self.sink.clone());
        self.commands.clear();
        self.board_and_player();
    }

    pub fn move_piece(&mut self, from: &str, to: &str) -> bool {
        if !self.commands.execute(&mut self.game, from, to) {
            // lets a front end drop its stale selection
            self.events.push(GameEvent::BoardChanged);
            return false;
        }
        if let Some(square) = self.game.promotion_square() {
            self.events.push(GameEvent::PromotionPending(square));
        }
        self.board_and_player();
        true
    }

    /** Completes the pending promotion with `choice`. */
    pub fn promote(&mut self, choice: Promotion) -> bool {
        let Some(square) = self.game.promotion_square() else {
            return false;
        };
        if !self.game.promote(square, choice) {
            return false;
        }
        self.commands.record_promotion(choice);
        self.board_and_player();
        true
    }

    pub fn undo(&mut self) -> bool {
        let done = self.commands.undo(&mut self.game);
        if done {
            self.board_and_player();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.commands.redo(&mut self.game);
        if done {
            if let Some(square) = self.game.promotion_square() {
                self.events.push(GameEvent::PromotionPending(square));
            }
            self.board_and_player();
        }
        done
    }

    pub fn can_undo(&self) -> bool {
        self.commands.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.commands.can_redo()
    }

    pub fn export(&self) -> String {
        self.game.export()
    }

    /** Loads a position from the text format. History does not survive a
     * successful import; a failed one changes nothing. */
    pub fn import(&mut self, text: &str) -> Result<(), ImportError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        if let Err(err) = self.game.import(text) {
            warn!("Import rejected: {err}");
            return Err(err);
        }
        self.commands.clear();
        self.board_and_player();
        Ok(())
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    pub fn is_game_over(&self) -> bool {
        self.game.is_game_over()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        self.game.to_bytes()
    }

    /** Replaces the game with a snapshot; the manager's sink is attached to it. */
    pub fn from_bytes(&mut self, bytes: &[u8]) -> Result<(), postcard::Error> {
        let mut game = Game::from_bytes(bytes)?;
        game.set_sink(self.sink.clone());
        self.game = game;
        self.commands.clear();
        self.board_and_player();
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes().context("Failed to serialize game")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write game to {}", path.display()))?;
        info!("Game saved to {}", path.display());
        Ok(())
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read game from {}", path.display()))?;
        self.from_bytes(&bytes)
            .with_context(|| format!("Corrupted game file {}", path.display()))?;
        info!("Game loaded from {}", path.display());
        Ok(())
    }

    fn board_and_player(&mut self) {
        self.events.push(GameEvent::BoardChanged);
        self.events
            .push(GameEvent::CurrentPlayerChanged(self.game.side_to_move()));
    }
}

impl Default for GameManager {
    fn default() -> Self {
        GameManager::new()
    }
}
