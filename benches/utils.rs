use std::sync::Arc;

use chess_rules::{utils::perft, Game, GameManager, NullLog};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

const KIWIPETE: &str = "WHITE,\nRa1*,Ke1*,Rh1*,Pa2,Pb2,Pc2,Bd2,Be2,Pf2,Pg2,Ph2,Nc3,Qf3,ph3,pb4,Pe4,\
Pd5,Ne5,ba6,nb6,pe6,nf6,pg6,pa7,pc7,pd7,qe7,pf7,bg7,ra8*,ke8*,rh8*";

fn random_game(max_steps: usize) -> GameManager {
    let mut rng = StdRng::seed_from_u64(42);
    let mut manager = GameManager::with_sink(Arc::new(NullLog));
    for _ in 0..max_steps {
        let Some((from, to)) = manager.game().legal_moves().choose(&mut rng).copied() else {
            break;
        };
        manager.move_piece(&from.to_string(), &to.to_string());
        if manager.game().is_waiting_for_promotion() {
            manager.promote(chess_rules::Promotion::Queen);
        }
    }
    manager
}

fn criterion_benchmark(c: &mut Criterion) {
    let start = Game::new();
    let kiwipete = Game::from_export(KIWIPETE).unwrap();
    c.bench_function("legal moves start", |b| b.iter(|| black_box(&start).legal_moves()));
    c.bench_function("legal moves kiwipete", |b| {
        b.iter(|| black_box(&kiwipete).legal_moves())
    });
    c.bench_function("export import", |b| {
        b.iter(|| Game::from_export(&black_box(&kiwipete).export()))
    });
    c.bench_function("perft 2 kiwipete", |b| b.iter(|| perft(black_box(&kiwipete), 2)));
    c.bench_function("random game 100", |b| b.iter(|| random_game(100)));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
