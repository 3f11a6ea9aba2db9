//! Error taxonomy for order submission.
//!
//! Recoverable conditions surface as [`OrderError`]. Structural invariant
//! violations inside the pool (foreign handle, double release) are bugs,
//! not runtime conditions, and abort via `panic!` instead.

use thiserror::Error;

use crate::types::{Qty, Tick};

/// Reasons an order operation is rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderError {
    /// Price tick falls outside the closed grid.
    #[error("tick {tick} outside the price grid [1, 200000]")]
    TickOutOfRange { tick: Tick },

    /// Quantity must be strictly positive.
    #[error("quantity {qty} is not strictly positive")]
    InvalidQuantity { qty: Qty },

    /// A limit order was submitted without a limit tick.
    #[error("limit order submitted without a limit tick")]
    MissingLimitTick,

    /// The order pool has no free slots left.
    #[error("order pool exhausted")]
    PoolExhausted,
}
