//! Per-operation latency report.
//!
//! Seeds a deep book, then measures each operation class in isolation and
//! prints an hdrhistogram percentile table. All randomness is ChaCha-seeded
//! so two runs exercise the identical operation stream.

use std::time::Instant;

use gridbook::{BookSide, Orderbook, Side};
use hdrhistogram::Histogram;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

const SEED: u64 = 0xB00C;
const BOOK_DEPTH: usize = 100_000;
const OPS: usize = 200_000;

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    println!("Preparing latency benchmark...");
    let mut engine = Orderbook::new(1_000_000);
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);

    // Seed phase: non-crossing liquidity, bids below asks.
    let mut resting: Vec<u64> = Vec::with_capacity(BOOK_DEPTH);
    let mut add_hist = hist();
    for i in 0..BOOK_DEPTH {
        let (side, tick) = if i % 2 == 0 {
            (BookSide::Bid, rng.gen_range(9_000..10_000))
        } else {
            (BookSide::Ask, rng.gen_range(10_000..11_000))
        };
        let qty = rng.gen_range(1..1_000);

        let start = Instant::now();
        let id = std::hint::black_box(engine.add(qty, tick, side)).expect("seed add");
        record(&mut add_hist, start);
        resting.push(id);
    }

    // Exec phase: marketable limits and small market sweeps.
    let mut sweep_hist = hist();
    for _ in 0..OPS / 2 {
        let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
        let qty = rng.gen_range(1..500);

        let start = Instant::now();
        std::hint::black_box(engine.market(qty, side)).expect("market");
        record(&mut sweep_hist, start);
    }

    // Amend phase: modify and cancel random resting orders. Some ids will
    // have been consumed by the sweeps; those return false and still count,
    // the registry miss being part of the operation's cost profile.
    let mut modify_hist = hist();
    let mut cancel_hist = hist();
    for _ in 0..OPS / 2 {
        let id = resting[rng.gen_range(0..resting.len())];
        if rng.gen_bool(0.5) {
            let qty = rng.gen_range(1..1_000);
            let start = Instant::now();
            std::hint::black_box(engine.modify(id, qty));
            record(&mut modify_hist, start);
        } else {
            let start = Instant::now();
            std::hint::black_box(engine.cancel(id));
            record(&mut cancel_hist, start);
        }
    }

    report("add (rest)", &add_hist);
    report("market sweep", &sweep_hist);
    report("modify", &modify_hist);
    report("cancel", &cancel_hist);

    println!(
        "\nFinal book: {} open orders, best bid {:?}, best ask {:?}",
        engine.open_orders(),
        engine.best(BookSide::Bid),
        engine.best(BookSide::Ask),
    );
}

fn hist() -> Histogram<u64> {
    Histogram::new_with_bounds(1, 10_000_000, 3).expect("histogram bounds")
}

fn record(hist: &mut Histogram<u64>, start: Instant) {
    hist.record(start.elapsed().as_nanos() as u64).unwrap_or(());
}

fn report(name: &str, hist: &Histogram<u64>) {
    println!("\n=== {name} (ns) ===");
    println!("Samples: {}", hist.len());
    println!("Min:    {:6}", hist.min());
    println!("P50:    {:6}", hist.value_at_quantile(0.50));
    println!("P90:    {:6}", hist.value_at_quantile(0.90));
    println!("P99:    {:6}", hist.value_at_quantile(0.99));
    println!("P99.9:  {:6}", hist.value_at_quantile(0.999));
    println!("Max:    {:6}", hist.max());
}
