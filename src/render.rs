//! ASCII depth ladder.
//!
//! Thin read-only wrapper over the engine's accessors: asks in red from the
//! worst active tick down to the best, a spread line in basis points, then
//! bids in green best-first. One block glyph per ten resting units. Prices
//! are shown in the external unit (tick / 100); this is the only place the
//! crate formats prices at all.

use std::fmt::Write;

use crossterm::style::{style, Color, Stylize};

use crate::engine::Orderbook;
use crate::types::{BookSide, Tick};

/// Render both sides of the book, at most `depth` ticks per side.
pub fn ladder(book: &Orderbook, depth: usize) -> String {
    let mut out = String::new();
    out.push_str("========== Orderbook =========\n");

    // Asks print worst-first so the best ask sits next to the spread line.
    let asks: Vec<Tick> = book.asks().walk_from_best().take(depth).collect();
    for &tick in asks.iter().rev() {
        level_line(book, BookSide::Ask, tick, Color::Red, &mut out);
    }

    out.push_str(&spread_line(book));

    for tick in book.bids().walk_from_best().take(depth) {
        level_line(book, BookSide::Bid, tick, Color::Green, &mut out);
    }

    out.push_str("==============================\n");
    out
}

fn level_line(book: &Orderbook, side: BookSide, tick: Tick, color: Color, out: &mut String) {
    let (qty, _) = book.depth_at(side, tick);
    let price = tick as f64 / 100.0;
    let bar = "\u{2588}".repeat((qty / 10) as usize);
    let text = format!("\t${price:>8.2} {qty:>6} {bar}");
    let _ = writeln!(out, "{}", style(text).with(color));
}

fn spread_line(book: &Orderbook) -> String {
    let line = match (book.best(BookSide::Bid), book.best(BookSide::Ask)) {
        (Some(bid), Some(ask)) => {
            let bps = 10_000.0 * (ask - bid) as f64 / bid as f64;
            format!("======  {bps:.2} bps  ======")
        }
        _ => "======  one-sided  ======".to_string(),
    };
    format!("\n{}\n\n", style(line).with(Color::Yellow))
}
