use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::core::utils::{between, compact_pos, is_in_diagonal_line, is_in_straight_line};
use crate::utils::{perf_test, perft};

use super::*;

const KIWIPETE: &str = "WHITE,\nRa1*,Ke1*,Rh1*,Pa2,Pb2,Pc2,Bd2,Be2,Pf2,Pg2,Ph2,Nc3,Qf3,ph3,pb4,Pe4,\
Pd5,Ne5,ba6,nb6,pe6,nf6,pg6,pa7,pc7,pd7,qe7,pf7,bg7,ra8*,ke8*,rh8*";

const START_EXPORT: &str = "WHITE,\nRa1*,Pa2,pa7,ra8*,Nb1,Pb2,pb7,nb8,Bc1,Pc2,pc7,bc8,\
Qd1,Pd2,pd7,qd8,Ke1*,Pe2,pe7,ke8*,Bf1,Pf2,pf7,bf8,Ng1,Pg2,pg7,ng8,Rh1*,Ph2,ph7,rh8*,";

fn sq(text: &str) -> Square {
    Square::parse(text).unwrap()
}

fn position(text: &str) -> Game {
    Game::from_export(text).unwrap()
}

#[test]
fn math() {
    assert!(is_in_diagonal_line(71, 116), "This line is diagonal");
    let cells: Vec<_> = between(71, 116).collect();
    assert_eq!(cells, vec![86, 101]);
    assert_eq!(between(0x00, 0x07).count(), 6);
    assert_eq!(between(0x22, 0x22).count(), 0);
}

#[test]
fn straight_line() {
    const STRAIGHT_LINE: [u8; 9] = [0x02, 0x12, 0x20, 0x21, 0x22, 0x23, 0x24, 0x32, 0x42];
    let center = 0x22;
    for rank in 0..5 {
        for file in 0..5 {
            let pos = compact_pos(rank, file);
            assert_eq!(STRAIGHT_LINE.contains(&pos), is_in_straight_line(center, pos));
            assert_eq!(STRAIGHT_LINE.contains(&pos), is_in_straight_line(pos, center));
        }
    }
}

#[test]
fn diagonal_line() {
    const DIAGONAL_LINE: [u8; 9] = [0x00, 0x04, 0x11, 0x13, 0x22, 0x31, 0x33, 0x40, 0x44];
    let center = 0x22;
    for rank in 0..5 {
        for file in 0..5 {
            let pos = compact_pos(rank, file);
            assert_eq!(DIAGONAL_LINE.contains(&pos), is_in_diagonal_line(center, pos));
            assert_eq!(DIAGONAL_LINE.contains(&pos), is_in_diagonal_line(pos, center));
        }
    }
}

#[test]
fn square_notation() {
    assert_eq!(sq("a1"), Square::new(0, 0).unwrap());
    assert_eq!(sq("e4").code(), 0x34);
    assert_eq!(sq("h8").to_string(), "h8");
    for bad in ["", "e", "e9", "i1", "e44", "E4"] {
        assert!(Square::parse(bad).is_none(), "`{bad}` must not parse");
    }
    assert!(Square::new(8, 0).is_none());
}

#[test]
fn test_iters() {
    let board = Board::default();
    let order: Vec<String> = board
        .occupied()
        .take(6)
        .map(|(square, _)| square.to_string())
        .collect();
    assert_eq!(order, ["a1", "a2", "a7", "a8", "b1", "b2"]);
    assert_eq!(board.occupied().count(), 32);
    assert_eq!(board.pieces(Color::Black).count(), 16);
    for (square, piece) in board.occupied() {
        assert_eq!(square, piece.square(), "Piece is out of sync with its cell!");
    }
}

#[test]
fn initial_export() {
    let game = Game::new();
    assert_eq!(game.export(), START_EXPORT);
    assert_eq!(game.state(), GameState::Ongoing);
    assert_eq!(game.legal_moves().len(), 20);
}

#[test]
fn opening_move() {
    let mut game = Game::new();
    assert!(game.move_piece("e2", "e4"));
    assert_eq!(game.side_to_move(), Color::Black);
    assert_eq!(game.en_passant_target(), Some(sq("e3")));
    let pawn = game.piece_at(sq("e4")).unwrap();
    assert_eq!((pawn.kind(), pawn.color()), (PieceKind::Pawn, Color::White));
    assert!(game.piece_at(sq("e2")).is_none());
    assert!(game.move_piece("g8", "f6"));
    assert_eq!(game.en_passant_target(), None);
}

#[test]
fn rejected_moves() {
    let mut game = Game::new();
    let before = game.export();
    assert!(!game.move_piece("e2", "e5"), "Pawn can't jump three ranks");
    assert!(!game.move_piece("e7", "e5"), "Black can't move first");
    assert!(!game.move_piece("e3", "e4"), "Empty origin");
    assert!(!game.move_piece("z9", "e4"), "Malformed origin");
    assert!(!game.move_piece("e2", "e2"), "Null move");
    assert!(!game.move_piece("a1", "a3"), "Rook is blocked");
    assert_eq!(game.export(), before);
    assert_eq!(game.side_to_move(), Color::White);
}

#[test]
fn promotion_gate() {
    let mut game = position("WHITE,Pa7");
    assert!(game.move_piece("a7", "a8"));
    assert!(game.is_waiting_for_promotion());
    assert_eq!(game.promotion_square(), Some(sq("a8")));
    assert_eq!(game.side_to_move(), Color::White, "Turn passes only on promotion");
    assert!(game.legal_moves().is_empty());
    assert!(!game.promote(sq("b8"), Promotion::Queen));
    assert!(game.promote(sq("a8"), Promotion::Knight));
    let knight = game.piece_at(sq("a8")).unwrap();
    assert_eq!(knight.kind(), PieceKind::Knight);
    assert!(knight.has_moved());
    assert!(!game.is_waiting_for_promotion());
    assert_eq!(game.side_to_move(), Color::Black);
}

#[test]
fn moves_blocked_while_promotion_pending() {
    let mut game = position("WHITE,\nKe1,Pb7,kh8");
    assert!(game.move_piece("b7", "b8"));
    assert!(!game.move_piece("e1", "e2"));
    assert!(game.possible_moves(sq("e1")).is_empty());
    assert!(game.promote(sq("b8"), Promotion::Queen));
    assert_eq!(game.state(), GameState::Check);
    assert!(game.move_piece("h8", "h7"));
}

#[test]
fn checkmate() {
    let mut game = position("WHITE,\nKe1,Ra7,Qh1,ke8");
    assert!(game.move_piece("h1", "h8"));
    assert_eq!(game.state(), GameState::Checkmate);
    assert_eq!(game.winner(), Some(Color::White));
    assert_eq!(game.winner_name(), "White");
    assert!(game.is_game_over());
    assert!(game.legal_moves().is_empty());
}

#[test]
fn stalemate() {
    let game = position("BLACK,\nKf7,Qg6,kh8");
    assert_eq!(game.state(), GameState::Stalemate);
    assert_eq!(game.winner(), None);
    assert_eq!(game.winner_name(), "DRAW");
}

#[test]
fn pinned_piece_and_defended_piece() {
    let game = position("WHITE,\nKe1,Be2,ke8,re7");
    assert!(game.possible_moves(sq("e2")).is_empty(), "Bishop is pinned");

    let game = position("BLACK,\nKh1,Ra1,Pa2,kb3");
    assert!(game.is_square_attacked(sq("a2"), Color::White));
    assert!(!game.possible_moves(sq("b3")).contains(&sq("a2")));
    assert_eq!(game.state(), GameState::Check, "Pawn on a2 attacks b3");
}

#[test]
fn attack_geometry() {
    let board = position("WHITE,\nKe1,Pd4,ke8,nb8").board().clone();
    // pawns attack both forward diagonals, never straight ahead
    assert!(board.is_attacked(sq("c5"), Color::White));
    assert!(board.is_attacked(sq("e5"), Color::White));
    assert!(!board.is_attacked(sq("d5"), Color::White));
    assert!(board.is_attacked(sq("d7"), Color::Black), "Knight and king both hit d7");
    assert!(board.is_attacked(sq("c6"), Color::Black));
    assert!(!board.is_attacked(sq("b8"), Color::Black), "A piece never attacks its own cell");
    assert!(board.is_attacked(sq("f2"), Color::White));
    assert!(!board.is_attacked(sq("g3"), Color::White));
}

#[test]
fn en_passant() {
    let mut game = Game::new();
    for (from, to) in [("a2", "a3"), ("d7", "d5"), ("a3", "a4"), ("d5", "d4"), ("e2", "e4")] {
        assert!(game.move_piece(from, to), "{from} -> {to}");
    }
    assert_eq!(game.en_passant_target(), Some(sq("e3")));
    assert!(game.possible_moves(sq("d4")).contains(&sq("e3")));
    assert!(game.move_piece("d4", "e3"));
    assert!(game.piece_at(sq("e4")).is_none(), "Captured pawn must be gone");
    assert_eq!(game.piece_at(sq("e3")).unwrap().color(), Color::Black);
    assert_eq!(game.en_passant_target(), None);
}

#[test]
fn en_passant_expires() {
    let mut game = Game::new();
    for (from, to) in [("a2", "a3"), ("d7", "d5"), ("a3", "a4"), ("d5", "d4"), ("e2", "e4")] {
        assert!(game.move_piece(from, to));
    }
    assert!(game.move_piece("h7", "h6"));
    assert!(game.move_piece("h2", "h3"));
    assert!(!game.move_piece("d4", "e3"));
}

#[test]
fn castling() {
    let mut game = position("WHITE,\nKe1*,Rh1*,Ra1*,ke8");
    let moves = game.possible_moves(sq("e1"));
    assert!(moves.contains(&sq("g1")) && moves.contains(&sq("c1")));
    assert!(game.move_piece("e1", "g1"));
    assert_eq!(game.piece_at(sq("f1")).unwrap().kind(), PieceKind::Rook);
    assert!(game.piece_at(sq("h1")).is_none());

    let mut game = position("WHITE,\nKe1*,Rh1*,Ra1*,ke8");
    assert!(game.move_piece("e1", "c1"));
    assert_eq!(game.piece_at(sq("d1")).unwrap().kind(), PieceKind::Rook);
    assert!(game.piece_at(sq("a1")).is_none());
}

#[test]
fn castling_restrictions() {
    // f1 is attacked
    let game = position("WHITE,\nKe1*,Rh1*,Ra1*,ke8,rf8");
    let moves = game.possible_moves(sq("e1"));
    assert!(!moves.contains(&sq("g1")));
    assert!(moves.contains(&sq("c1")));
    // in check
    let game = position("WHITE,\nKe1*,Rh1*,ka8,re7");
    assert_eq!(game.state(), GameState::Check);
    assert!(!game.possible_moves(sq("e1")).contains(&sq("g1")));
    // king already moved
    let game = position("WHITE,\nKe1,Rh1*,ke8");
    assert!(!game.possible_moves(sq("e1")).contains(&sq("g1")));
    // rook already moved
    let game = position("WHITE,\nKe1*,Rh1,ke8");
    assert!(!game.possible_moves(sq("e1")).contains(&sq("g1")));
    // piece in between
    let game = position("WHITE,\nKe1*,Ra1*,Nb1,ke8");
    assert!(!game.possible_moves(sq("e1")).contains(&sq("c1")));
}

#[test]
fn round_trip() {
    let mut game = Game::new();
    for (from, to) in [("e2", "e4"), ("d7", "d5"), ("e4", "d5"), ("g8", "f6")] {
        assert!(game.move_piece(from, to));
    }
    let text = game.export();
    let mut copy = Game::new();
    copy.import(&text).unwrap();
    assert_eq!(copy.export(), text);
    assert_eq!(copy.side_to_move(), game.side_to_move());
    assert_eq!(copy.en_passant_target(), None);

    let mut game = position("WHITE,Pa7");
    assert!(game.move_piece("a7", "a8"));
    let copy = position(&game.export());
    assert!(!copy.is_waiting_for_promotion());
}

#[test]
fn import_parsing() {
    let game = position(" black ,\n Ke1* , ,ke8* ,");
    assert_eq!(game.side_to_move(), Color::Black);
    assert!(!game.piece_at(sq("e1")).unwrap().has_moved());
    assert_eq!(game.board().occupied().count(), 2);

    let mut game = Game::new();
    assert!(game.import("  \n ").is_ok());
    assert_eq!(game.export(), START_EXPORT);
}

#[test]
fn import_errors() {
    let mut game = Game::new();
    assert!(game.move_piece("e2", "e4"));
    let before = game.export();
    assert_eq!(game.import("PURPLE,Ke1"), Err(ImportError::Side("PURPLE".into())));
    assert_eq!(game.import("WHITE,Ke1,Zz9"), Err(ImportError::UnknownPiece('Z')));
    assert_eq!(game.import("WHITE,Ki9"), Err(ImportError::Square("i9".into())));
    assert_eq!(game.import("WHITE,Ke1**"), Err(ImportError::Square("e1*".into())));
    assert_eq!(Piece::from_token(""), Err(ImportError::Token("".into())));
    assert_eq!(game.export(), before, "Failed import must not touch the game");
    assert_eq!(game.en_passant_target(), Some(sq("e3")));
}

#[test]
fn persistence() {
    let mut game = position(KIWIPETE);
    assert!(game.move_piece("e1", "g1"));
    let bytes = game.to_bytes().unwrap();
    let restored = Game::from_bytes(&bytes).unwrap();
    assert_eq!(restored.export(), game.export());
    assert_eq!(restored.board(), game.board());
    assert_eq!(restored.side_to_move(), Color::Black);
    assert!(Game::from_bytes(&bytes[..bytes.len() / 2]).is_err());
}

#[test]
fn corrupted_snapshot() {
    assert!(postcard::from_bytes::<Square>(&[0x08]).is_err());
    assert_eq!(postcard::from_bytes::<Square>(&[0x34]).unwrap(), sq("e4"));

    let bytes = position("WHITE,\nKe1").to_bytes().unwrap();
    // e1 is the only 0x04 in the blob: the king's stored square
    assert_eq!(bytes.iter().filter(|byte| **byte == 0x04).count(), 1);
    let king = bytes.iter().position(|byte| *byte == 0x04).unwrap();
    let mut off_board = bytes.clone();
    off_board[king] = 0xff;
    assert!(Game::from_bytes(&off_board).is_err(), "Square off the board");
    let mut wrong_cell = bytes.clone();
    wrong_cell[king] = 0x05;
    assert!(Game::from_bytes(&wrong_cell).is_err(), "King stored as f1 in the e1 cell");

    let mut game = position("WHITE,Pa7");
    assert!(game.move_piece("a7", "a8"));
    let mut bytes = game.to_bytes().unwrap();
    let pending = bytes.iter().rposition(|byte| *byte == 0x70).unwrap();
    bytes[pending] = 0xf0;
    assert!(Game::from_bytes(&bytes).is_err());
    let mut manager = GameManager::new();
    assert!(manager.from_bytes(&bytes).is_err());
    assert_eq!(manager.export(), START_EXPORT, "Failed load keeps the game");
}

#[test]
fn log_sink() {
    let log = ModelLog::new();
    let mut game = Game::with_sink("Alice", "Bob", Arc::new(log.clone()));
    assert!(log.entries()[0].contains("Alice"));
    assert!(!game.move_piece("e2", "e5"));
    assert!(log.entries().iter().any(|entry| entry.contains("Invalid move from e2 to e5")));
    log.clear();
    assert!(log.is_empty());
    assert!(game.move_piece("e2", "e4"));
    assert!(!log.is_empty());

    let mut quiet = Game::with_sink("Alice", "Bob", Arc::new(NullLog));
    assert!(quiet.move_piece("e2", "e4"));
}

#[test]
fn command_undo_redo() {
    let mut game = Game::new();
    let mut commands = CommandManager::new();
    assert!(!commands.undo(&mut game));
    assert!(!commands.redo(&mut game));
    assert!(commands.execute(&mut game, "e2", "e4"));
    assert!(!commands.execute(&mut game, "e2", "e4"), "Refused move is not recorded");
    assert!(commands.can_undo());
    assert!(commands.undo(&mut game));
    assert_eq!(game.export(), START_EXPORT);
    assert_eq!(game.side_to_move(), Color::White);
    assert!(!game.piece_at(sq("e2")).unwrap().has_moved());
    assert!(commands.redo(&mut game));
    assert_eq!(game.en_passant_target(), Some(sq("e3")));

    assert!(commands.undo(&mut game));
    assert!(commands.execute(&mut game, "d2", "d4"));
    assert!(!commands.can_redo(), "New move drops redo history");
}

#[test]
fn undo_refused_after_position_replaced() {
    let mut game = Game::new();
    let mut commands = CommandManager::new();
    assert!(commands.execute(&mut game, "e2", "e4"));
    game.import("BLACK,\nKe1,ke8").unwrap();
    let before = game.export();
    assert!(!commands.undo(&mut game));
    assert_eq!(game.export(), before);
    assert!(commands.can_undo(), "Refused command stays in history");
    assert!(!commands.can_redo());
}

#[test]
fn undo_special_moves() {
    let mut game = position("WHITE,\nKe1*,Rh1*,Ra1*,ke8");
    let before = game.export();
    let mut commands = CommandManager::new();
    assert!(commands.execute(&mut game, "e1", "c1"));
    assert!(commands.undo(&mut game));
    assert_eq!(game.export(), before);
    assert!(game.possible_moves(sq("e1")).contains(&sq("c1")));

    let mut game = Game::new();
    let mut commands = CommandManager::new();
    for (from, to) in [("a2", "a3"), ("d7", "d5"), ("a3", "a4"), ("d5", "d4"), ("e2", "e4")] {
        assert!(commands.execute(&mut game, from, to));
    }
    let before = game.board().clone();
    assert!(commands.execute(&mut game, "d4", "e3"));
    assert!(commands.undo(&mut game));
    assert_eq!(game.board(), &before);
    assert_eq!(game.en_passant_target(), Some(sq("e3")));
    assert_eq!(game.side_to_move(), Color::Black);
}

#[test]
fn manager_events() {
    let mut manager = GameManager::new();
    assert!(manager.drain_events().is_empty());
    manager.new_game("Alice", "Bob");
    assert_eq!(
        manager.drain_events(),
        [GameEvent::BoardChanged, GameEvent::CurrentPlayerChanged(Color::White)]
    );
    assert!(manager.move_piece("e2", "e4"));
    assert_eq!(
        manager.drain_events(),
        [GameEvent::BoardChanged, GameEvent::CurrentPlayerChanged(Color::Black)]
    );
    assert!(!manager.move_piece("e2", "e4"));
    assert_eq!(manager.drain_events(), [GameEvent::BoardChanged]);
    assert!(manager.drain_events().is_empty());
    assert!(!manager.redo());
    assert!(manager.drain_events().is_empty());
}

#[test]
fn manager_promotion_history() {
    let mut manager = GameManager::new();
    manager.import("WHITE,\nKe1,Pa7,kh8").unwrap();
    manager.drain_events();
    assert!(!manager.promote(Promotion::Queen), "Nothing to promote yet");
    assert!(manager.move_piece("a7", "a8"));
    assert_eq!(
        manager.drain_events(),
        [
            GameEvent::PromotionPending(sq("a8")),
            GameEvent::BoardChanged,
            GameEvent::CurrentPlayerChanged(Color::White)
        ]
    );
    assert!(!manager.move_piece("e1", "e2"));
    assert_eq!(manager.drain_events(), [GameEvent::BoardChanged]);
    assert!(manager.promote(Promotion::Queen));
    assert_eq!(
        manager.drain_events(),
        [GameEvent::BoardChanged, GameEvent::CurrentPlayerChanged(Color::Black)]
    );
    assert_eq!(manager.game().state(), GameState::Check);

    assert!(manager.undo());
    let pawn = manager.game().piece_at(sq("a7")).unwrap();
    assert_eq!(pawn.kind(), PieceKind::Pawn);
    assert!(manager.game().piece_at(sq("a8")).is_none());
    assert_eq!(manager.game().side_to_move(), Color::White);
    assert!(!manager.game().is_waiting_for_promotion());

    assert!(manager.redo());
    assert_eq!(manager.game().piece_at(sq("a8")).unwrap().kind(), PieceKind::Queen);
    assert_eq!(manager.game().side_to_move(), Color::Black);
    assert!(!manager.game().is_waiting_for_promotion());
}

#[test]
fn manager_import_and_persistence() {
    let mut manager = GameManager::new();
    assert!(manager.move_piece("e2", "e4"));
    assert!(manager.import("WHITE,Ke1,Zz9").is_err());
    assert!(manager.can_undo(), "Failed import keeps history");
    manager.import(KIWIPETE).unwrap();
    assert!(!manager.can_undo());

    let bytes = manager.to_bytes().unwrap();
    let mut other = GameManager::new();
    other.from_bytes(&bytes).unwrap();
    assert_eq!(other.export(), manager.export());

    let path = std::env::temp_dir().join(format!("chess-rules-{}.bin", std::process::id()));
    manager.save(&path).unwrap();
    assert!(other.move_piece("e1", "g1"));
    other.load(&path).unwrap();
    assert_eq!(other.export(), manager.export());
    assert!(!other.can_undo());
    std::fs::remove_file(&path).unwrap();
    assert!(other.load(&path).is_err());
}

fn random_playout(rng: &mut StdRng, manager: &mut GameManager, plies: usize) -> usize {
    let mut played = 0;
    for _ in 0..plies {
        let moves = manager.game().legal_moves();
        let Some((from, to)) = moves.choose(rng).copied() else {
            break;
        };
        let mover = manager.game().side_to_move();
        assert!(manager.move_piece(&from.to_string(), &to.to_string()));
        if manager.game().is_waiting_for_promotion() {
            let choice = *Promotion::ALL.choose(rng).unwrap();
            assert!(manager.promote(choice));
        }
        assert!(
            !manager.game().board().is_checked(mover),
            "{from} -> {to} left the king in check"
        );
        let text = manager.export();
        let mut copy = Game::with_sink("White", "Black", Arc::new(NullLog));
        copy.import(&text).unwrap();
        assert_eq!(copy.export(), text);
        assert_eq!(copy.side_to_move(), manager.game().side_to_move());
        assert_eq!(copy.en_passant_target(), None);
        assert!(!copy.is_waiting_for_promotion());
        played += 1;
    }
    played
}

#[test]
fn random_undo_redo_identity() {
    let mut rng = StdRng::seed_from_u64(0x88);
    for _ in 0..8 {
        let mut manager = GameManager::with_sink(Arc::new(NullLog));
        let start = manager.game().board().clone();
        let played = random_playout(&mut rng, &mut manager, 60);
        let end = manager.game().board().clone();
        let (end_side, end_ep) = (manager.game().side_to_move(), manager.game().en_passant_target());
        for _ in 0..played {
            assert!(manager.undo());
        }
        assert!(!manager.undo());
        assert_eq!(manager.game().board(), &start);
        assert_eq!(manager.game().side_to_move(), Color::White);
        assert_eq!(manager.game().en_passant_target(), None);
        for _ in 0..played {
            assert!(manager.redo());
        }
        assert_eq!(manager.game().board(), &end);
        assert_eq!(manager.game().side_to_move(), end_side);
        assert_eq!(manager.game().en_passant_target(), end_ep);
    }
}

#[test]
fn move_generation() {
    let game = Game::new();
    assert_eq!(perft(&game, 1).all, 20);
    assert_eq!(perft(&game, 2).all, 400);
    let result = perft(&game, 3);
    assert_eq!(result.all, 8902);
    assert_eq!(result.captures, 34);
    assert_eq!(result.checks, 12);

    let kiwipete = position(KIWIPETE);
    let result = perft(&kiwipete, 1);
    assert_eq!(result.all, 48);
    assert_eq!(result.captures, 8);
    assert_eq!(result.castles, 2);
    assert!(perf_test(KIWIPETE, 2, 2039, false));
}

#[test]
#[ignore = "slow"]
fn move_generation_deep() {
    assert!(perf_test(START_EXPORT, 4, 197281, true));
    let result = perft(&position(KIWIPETE), 3);
    assert_eq!(result.all, 97862);
    assert_eq!(result.en_passant, 45);
    assert_eq!(result.castles, 3162);
}
