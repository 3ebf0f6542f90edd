use std::{fmt::Display, ops::AddAssign, sync::Arc};

use log::warn;

use crate::core::definitions::{GameState, Promotion, Square};
use crate::core::game::{Game, Played};
use crate::core::journal::NullLog;

/** Leaf counts of a move-generation walk, with a breakdown by move kind. */
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PerftResult {
    pub all: usize,
    pub captures: usize,
    pub en_passant: usize,
    pub castles: usize,
    pub promotions: usize,
    pub checks: usize,
    pub checkmates: usize,
}

impl PerftResult {
    pub fn combine(self, other: PerftResult) -> Self {
        PerftResult {
            all: self.all + other.all,
            captures: self.captures + other.captures,
            en_passant: self.en_passant + other.en_passant,
            castles: self.castles + other.castles,
            promotions: self.promotions + other.promotions,
            checks: self.checks + other.checks,
            checkmates: self.checkmates + other.checkmates,
        }
    }
}

impl AddAssign for PerftResult {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.combine(rhs);
    }
}

impl Display for PerftResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - cp: {:<4} ep: {:<4} cs: {:<4} pr: {:<4} Ch: {:<4} CM: {:4}",
            self.all,
            self.captures,
            self.en_passant,
            self.castles,
            self.promotions,
            self.checks,
            self.checkmates
        )
    }
}

fn count_leaf(game: &Game, played: &Played, promotion: bool) -> PerftResult {
    PerftResult {
        all: 1,
        captures: played.is_capture() as usize,
        en_passant: played.en_passant as usize,
        castles: played.castling.is_some() as usize,
        promotions: promotion as usize,
        checks: matches!(game.state(), GameState::Check | GameState::Checkmate) as usize,
        checkmates: (game.state() == GameState::Checkmate) as usize,
    }
}

/** Every position reachable by one legal move, promotions expanded over the
 * four choices. */
fn children(game: &Game) -> Vec<(Square, Square, Option<Promotion>, Game, Played)> {
    let mut result = Vec::new();
    for (from, to) in game.legal_moves() {
        let mut next = game.clone();
        let Some(played) = next.play(from, to) else {
            continue;
        };
        if next.is_waiting_for_promotion() {
            for choice in Promotion::ALL {
                let mut promoted = next.clone();
                promoted.promote(to, choice);
                result.push((from, to, Some(choice), promoted, played));
            }
        } else {
            result.push((from, to, None, next, played));
        }
    }
    result
}

fn perft_step(game: &Game, depth: usize) -> PerftResult {
    if depth == 0 {
        return PerftResult {
            all: 1,
            ..Default::default()
        };
    }
    children(game)
        .into_iter()
        .map(|(_, _, choice, next, played)| {
            if depth == 1 {
                count_leaf(&next, &played, choice.is_some())
            } else {
                perft_step(&next, depth - 1)
            }
        })
        .fold(PerftResult::default(), PerftResult::combine)
}

/** Counts leaf positions `depth` plies below `game`. The walk runs on a
 * silent copy, so the caller's log stays untouched. */
pub fn perft(game: &Game, depth: usize) -> PerftResult {
    let mut game = game.clone();
    game.set_sink(Arc::new(NullLog));
    perft_step(&game, depth)
}

/** Runs [`perft`] on a position in the text format and compares the leaf
 * count. `verbose` prints the count below every root move. */
pub fn perf_test(position: &str, depth: usize, expected: usize, verbose: bool) -> bool {
    let mut game = match Game::from_export(position) {
        Ok(game) => game,
        Err(err) => {
            warn!("Can't set up position for perft: {err}");
            return false;
        }
    };
    game.set_sink(Arc::new(NullLog));
    #[cfg(test)]
    println!(" - setup: | {position:?} | depth: {depth} verbose: {verbose}");
    if verbose && depth > 0 {
        let mut total = PerftResult::default();
        for (from, to, choice, next, played) in children(&game) {
            let result = if depth == 1 {
                count_leaf(&next, &played, choice.is_some())
            } else {
                perft_step(&next, depth - 1)
            };
            let suffix = choice
                .map(|choice| format!("={choice:?}"))
                .unwrap_or_default();
            println!(" {from}{to}{suffix} : {result}");
            total += result;
        }
        println!("+ total: {total}");
        total.all == expected
    } else {
        let result = perft_step(&game, depth);
        #[cfg(test)]
        println!(" details: {result}");
        result.all == expected
    }
}
