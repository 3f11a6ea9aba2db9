//! Seed a small demo book and print the depth ladder.
//!
//! Bids land between $90 and $100, asks between $100 and $110, three ticks
//! a side with two orders each. The seed is fixed so the ladder is the
//! same on every run.

use gridbook::render::ladder;
use gridbook::{BookSide, Orderbook};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const SEED: u64 = 12;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let mut book = Orderbook::new(4_096);
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);

    for _ in 0..3 {
        let tick = rng.gen_range(9_000..=10_000);
        book.add(rng.gen_range(1..=100), tick, BookSide::Bid)
            .expect("seed bid");
        book.add(rng.gen_range(1..=100), tick, BookSide::Bid)
            .expect("seed bid");
    }
    for _ in 0..3 {
        let tick = rng.gen_range(10_000..=11_000);
        book.add(rng.gen_range(1..=100), tick, BookSide::Ask)
            .expect("seed ask");
        book.add(rng.gen_range(1..=100), tick, BookSide::Ask)
            .expect("seed ask");
    }

    print!("{}", ladder(&book, 16));
}
