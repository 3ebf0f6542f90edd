pub mod command;
pub mod definitions;
pub mod engine;
pub mod game;
pub mod journal;
pub mod utils;
