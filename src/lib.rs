//! # Gridbook
//!
//! A single-symbol limit order book matching engine on a bounded integer
//! tick grid.
//!
//! ## Design Principles
//!
//! - **Single-Writer**: one thread owns the book exclusively (no locks)
//! - **Bounded Grid**: prices are integer ticks on `[1, 200000]`; the
//!   per-tick ladder is a dense preallocated array
//! - **Pooled Storage**: a fixed-capacity arena hands out order slots, so
//!   nothing allocates on the matching path
//! - **Cached Top-of-Book**: best quotes are field reads, refreshed only
//!   when the best level drains
//!
//! ## Architecture
//!
//! ```text
//! [Caller] --> Orderbook (engine)
//!                 |-- OrderPool   fixed arena, id counter
//!                 |-- SideBook x2 dense ladder + active ticks + best cache
//!                 |     '-- PriceLevel  per-tick FIFO, lazy head cursor
//!                 '-- registry    id -> (side, tick)
//! ```

pub mod engine;
pub mod error;
pub mod level;
pub mod order;
pub mod pool;
#[cfg(feature = "cli")]
pub mod render;
pub mod side;
pub mod types;

// Re-exports for convenience
pub use engine::{Orderbook, Residency};
pub use error::OrderError;
pub use level::PriceLevel;
pub use order::{Order, OrderHandle};
pub use pool::OrderPool;
pub use side::SideBook;
pub use types::{
    BookSide, Execution, OrderId, OrderType, Qty, Side, Tick, MAX_TICK, MIN_TICK, TICK_SPAN,
};
