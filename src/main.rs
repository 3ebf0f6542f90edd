use std::env;
use std::io::{self, BufRead, Write};

use chess_rules::{GameEvent, GameManager, ModelLog, Promotion, Square};
use log::info;

const HELP: &str = "\
commands:
  <from> <to>     move a piece, e.g. `e2 e4` or `e2e4`
  promote <q|r|b|n>
  moves <square>  legal destinations of a piece
  undo | redo
  export          print the position in text form
  import <text>   load a position, `\\n` may stand for a new line
  save <path> | load <path>
  new [white] [black]
  log             print the game log
  quit";

fn print_events(manager: &mut GameManager) {
    let mut board_changed = false;
    for event in manager.drain_events() {
        match event {
            GameEvent::BoardChanged => board_changed = true,
            GameEvent::CurrentPlayerChanged(color) => {
                println!("{} to move ({color})", manager.game().player_name(color))
            }
            GameEvent::PromotionPending(square) => {
                println!("Pawn on {square} awaits promotion: promote <q|r|b|n>")
            }
        }
    }
    if board_changed {
        println!("{}", manager.game().board());
    }
    if manager.is_game_over() {
        println!(
            "Game over: {:?}, winner: {}",
            manager.game().state(),
            manager.game().winner_name()
        );
    }
}

fn split_move(words: &[&str]) -> Option<(String, String)> {
    match words {
        [from, to] => Some((from.to_string(), to.to_string())),
        [both] if both.len() == 4 && both.is_ascii() => {
            Some((both[..2].to_owned(), both[2..].to_owned()))
        }
        _ => None,
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();
    let white = args.first().map(String::as_str).unwrap_or("White");
    let black = args.get(1).map(String::as_str).unwrap_or("Black");

    let log = ModelLog::new();
    let mut manager = GameManager::with_sink(std::sync::Arc::new(log.clone()));
    manager.new_game(white, black);
    info!("Starting game {white} vs {black}");
    println!("{HELP}");
    print_events(&mut manager);

    let stdin = io::stdin();
    let mut seen = log.len();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["help"] => println!("{HELP}"),
            ["undo"] => {
                if !manager.undo() {
                    println!("Nothing to undo");
                }
            }
            ["redo"] => {
                if !manager.redo() {
                    println!("Nothing to redo");
                }
            }
            ["promote", piece] => {
                let choice = piece.chars().next().and_then(Promotion::from_symbol);
                match choice {
                    Some(choice) if manager.promote(choice) => (),
                    _ => println!("Can't promote to `{piece}`"),
                }
            }
            ["moves", square] => match Square::parse(square) {
                Some(square) => {
                    let moves: Vec<String> = manager
                        .game()
                        .possible_moves(square)
                        .into_iter()
                        .map(|to| to.to_string())
                        .collect();
                    println!("{}", moves.join(" "));
                }
                None => println!("Invalid square `{square}`"),
            },
            ["export"] => println!("{}", manager.export()),
            ["import", ..] => {
                let text = line.trim_start()["import".len()..].trim().replace("\\n", "\n");
                if let Err(err) = manager.import(&text) {
                    println!("Import failed: {err}");
                }
            }
            ["save", path] => {
                if let Err(err) = manager.save(path) {
                    println!("{err:#}");
                }
            }
            ["load", path] => {
                if let Err(err) = manager.load(path) {
                    println!("{err:#}");
                }
            }
            ["new", names @ ..] => {
                let white = names.first().copied().unwrap_or(white);
                let black = names.get(1).copied().unwrap_or(black);
                manager.new_game(white, black);
            }
            ["log"] => {
                for entry in log.entries() {
                    println!("  {entry}");
                }
            }
            words => match split_move(words) {
                Some((from, to)) => {
                    if !manager.move_piece(&from, &to) {
                        println!("Illegal move {from} -> {to}");
                    }
                }
                None => println!("Unknown command, type `help`"),
            },
        }
        // fresh log entries since the last command
        let entries = log.entries();
        for entry in entries.iter().skip(seen) {
            println!("  {entry}");
        }
        seen = entries.len();
        print_events(&mut manager);
    }
    Ok(())
}
