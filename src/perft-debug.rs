use std::env;

use anyhow::{bail, Context};
use chess_rules::utils::perf_test;

/// `perft-debug <position> <depth> <expected>`: prints the count below every
/// root move, fails when the total differs.
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!("usage: {} <position> <depth> <expected>", args[0]);
    }
    // positions are usually passed on one line
    let position = args[1].replace("\\n", "\n");
    let depth: usize = args[2].parse().context("depth must be a number")?;
    let expected: usize = args[3].parse().context("expected count must be a number")?;
    if perf_test(&position, depth, expected, true) {
        Ok(())
    } else {
        bail!("move count differs from {expected}")
    }
}
