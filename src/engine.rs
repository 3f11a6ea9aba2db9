//! The matching engine: both book sides, the order pool, and the id
//! registry, orchestrated behind the public operations.
//!
//! Control flow for a submitted order is cross-then-rest: consume the
//! opposite side while the price barrier holds, then park any residual on
//! the inbound order's own side. Market orders sweep without a barrier and
//! never rest.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::OrderError;
use crate::order::OrderHandle;
use crate::pool::OrderPool;
use crate::side::SideBook;
use crate::types::{
    tick_in_range, BookSide, Execution, OrderId, OrderType, Qty, Side, Tick,
};

/// Where a resting order lives: which side, at which tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Residency {
    pub side: BookSide,
    pub tick: Tick,
}

/// Single-symbol limit order book.
///
/// Not safe for concurrent mutation; callers serialize submissions. Every
/// operation runs to completion, performs no I/O, and never blocks.
pub struct Orderbook {
    pool: OrderPool,
    bids: SideBook,
    asks: SideBook,
    registry: FxHashMap<OrderId, Residency>,
}

impl Orderbook {
    /// Engine with room for `capacity` resting orders.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: OrderPool::new(capacity),
            bids: SideBook::new(BookSide::Bid),
            asks: SideBook::new(BookSide::Ask),
            registry: FxHashMap::default(),
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Insert a resting order without matching, even at a crossing price.
    ///
    /// This is the seed-loader path; [`Orderbook::submit`] is the trading
    /// path. Returns the assigned identifier.
    pub fn add(&mut self, qty: Qty, tick: Tick, side: BookSide) -> Result<OrderId, OrderError> {
        if !tick_in_range(tick) {
            trace!(tick, "add rejected: tick off the grid");
            return Err(OrderError::TickOutOfRange { tick });
        }
        if qty <= 0 {
            trace!(qty, "add rejected: non-positive quantity");
            return Err(OrderError::InvalidQuantity { qty });
        }
        self.rest(qty, tick, side)
    }

    /// Execute a market or limit order.
    ///
    /// `limit_tick` is required for limit orders and ignored for market
    /// orders. A marketable limit consumes the opposite side up to its
    /// limit, then rests the residual on its own side; a market order's
    /// residual is discarded. Returns the fill summary.
    ///
    /// On [`OrderError::PoolExhausted`] the fills already executed stand;
    /// only the residual failed to rest.
    pub fn submit(
        &mut self,
        order_type: OrderType,
        qty: Qty,
        side: Side,
        limit_tick: Option<Tick>,
    ) -> Result<Execution, OrderError> {
        if qty <= 0 {
            trace!(qty, "submit rejected: non-positive quantity");
            return Err(OrderError::InvalidQuantity { qty });
        }
        match order_type {
            OrderType::Market => Ok(self.sweep(side.matches_against(), qty, None)),
            OrderType::Limit => {
                let limit = limit_tick.ok_or(OrderError::MissingLimitTick)?;
                if !tick_in_range(limit) {
                    trace!(limit, "submit rejected: limit tick off the grid");
                    return Err(OrderError::TickOutOfRange { tick: limit });
                }
                let exec = self.sweep(side.matches_against(), qty, Some(limit));
                let residual = qty - exec.qty;
                if residual > 0 {
                    self.rest(residual, limit, side.rests_on())?;
                }
                Ok(exec)
            }
        }
    }

    /// Convenience wrapper: market order.
    #[inline]
    pub fn market(&mut self, qty: Qty, side: Side) -> Result<Execution, OrderError> {
        self.submit(OrderType::Market, qty, side, None)
    }

    /// Convenience wrapper: limit order.
    #[inline]
    pub fn limit(&mut self, qty: Qty, side: Side, tick: Tick) -> Result<Execution, OrderError> {
        self.submit(OrderType::Limit, qty, side, Some(tick))
    }

    // ========================================================================
    // Amendment
    // ========================================================================

    /// Overwrite the remaining quantity of a resting order.
    ///
    /// Queue position is preserved, including on an increase; side and
    /// tick cannot change (cancel and resubmit instead). Returns false for
    /// an unknown identifier or a non-positive quantity.
    pub fn modify(&mut self, id: OrderId, new_qty: Qty) -> bool {
        if new_qty <= 0 {
            return false;
        }
        let residency = match self.registry.get(&id) {
            Some(r) => *r,
            None => return false,
        };
        match self.locate(id, residency) {
            Some(h) => {
                self.pool.get_mut(h).qty = new_qty;
                true
            }
            None => {
                debug_assert!(false, "registry entry without a queued record");
                false
            }
        }
    }

    /// Remove a resting order and reclaim its slot.
    ///
    /// Returns false for an unknown identifier.
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let residency = match self.registry.remove(&id) {
            Some(r) => r,
            None => return false,
        };
        let handle = match self.locate(id, residency) {
            Some(h) => h,
            None => {
                debug_assert!(false, "registry entry without a queued record");
                return false;
            }
        };
        match residency.side {
            BookSide::Bid => self.bids.erase(handle, residency.tick),
            BookSide::Ask => self.asks.erase(handle, residency.tick),
        };
        self.pool.release(handle);
        true
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Cached top-of-book tick for a side. O(1).
    #[inline]
    pub fn best(&self, side: BookSide) -> Option<Tick> {
        self.side(side).best_tick()
    }

    /// The bid ladder.
    #[inline]
    pub fn bids(&self) -> &SideBook {
        &self.bids
    }

    /// The ask ladder.
    #[inline]
    pub fn asks(&self) -> &SideBook {
        &self.asks
    }

    /// Ladder for either polarity.
    #[inline]
    pub fn side(&self, side: BookSide) -> &SideBook {
        match side {
            BookSide::Bid => &self.bids,
            BookSide::Ask => &self.asks,
        }
    }

    /// Total quantity and order count resting at a tick.
    pub fn depth_at(&self, side: BookSide, tick: Tick) -> (i64, usize) {
        if !tick_in_range(tick) {
            return (0, 0);
        }
        let level = self.side(side).level(tick);
        let mut qty = 0i64;
        let mut count = 0usize;
        for handle in level.iter() {
            qty += self.pool.get(handle).qty as i64;
            count += 1;
        }
        (qty, count)
    }

    /// `(id, qty)` pairs resting at a tick, in queue order.
    pub fn orders_at(&self, side: BookSide, tick: Tick) -> Vec<(OrderId, Qty)> {
        if !tick_in_range(tick) {
            return Vec::new();
        }
        self.side(side)
            .level(tick)
            .iter()
            .map(|h| {
                let order = self.pool.get(h);
                (order.id, order.qty)
            })
            .collect()
    }

    /// Resting orders across both sides.
    #[inline]
    pub fn open_orders(&self) -> usize {
        self.registry.len()
    }

    /// Registered residency of an order, if it rests.
    #[inline]
    pub fn residency(&self, id: OrderId) -> Option<Residency> {
        self.registry.get(&id).copied()
    }

    /// Free slots left in the pool.
    #[inline]
    pub fn pool_available(&self) -> usize {
        self.pool.available()
    }

    /// Pool capacity fixed at construction.
    #[inline]
    pub fn pool_capacity(&self) -> usize {
        self.pool.capacity()
    }

    /// Drop every resting order and reclaim all pool slots.
    ///
    /// Identifiers are not reset; orders placed after a clear continue the
    /// same monotonic sequence.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
        self.pool.clear();
        self.registry.clear();
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Consume the `target` side best-first while `barrier` holds.
    ///
    /// Partial fill of the head record decrements it in place and leaves
    /// it at the head with its registry entry untouched. Full fill removes
    /// the registry entry, pops the head, and releases the slot; draining
    /// a level deactivates its tick and refreshes the cached best.
    fn sweep(&mut self, target: BookSide, mut remaining: Qty, barrier: Option<Tick>) -> Execution {
        let book = match target {
            BookSide::Bid => &mut self.bids,
            BookSide::Ask => &mut self.asks,
        };
        let pool = &mut self.pool;
        let registry = &mut self.registry;

        let mut exec = Execution::empty();
        while remaining > 0 {
            let tick = match book.best_tick() {
                Some(t) => t,
                None => break,
            };
            if let Some(limit) = barrier {
                // Ticks only get worse in walk order, so one failure ends
                // the whole sweep.
                let crosses = match target {
                    BookSide::Bid => tick >= limit,
                    BookSide::Ask => tick <= limit,
                };
                if !crosses {
                    break;
                }
            }
            while remaining > 0 {
                let handle = match book.front(tick) {
                    Some(h) => h,
                    None => break,
                };
                let available = pool.get(handle).qty;
                if available > remaining {
                    exec.record(remaining, tick);
                    pool.get_mut(handle).qty = available - remaining;
                    remaining = 0;
                } else {
                    exec.record(available, tick);
                    remaining -= available;
                    let id = pool.get(handle).id;
                    registry.remove(&id);
                    book.pop_front(tick);
                    pool.release(handle);
                }
            }
        }
        exec
    }

    /// Acquire a slot, queue it, and register the id.
    fn rest(&mut self, qty: Qty, tick: Tick, side: BookSide) -> Result<OrderId, OrderError> {
        let handle = self
            .pool
            .acquire(qty, tick)
            .ok_or(OrderError::PoolExhausted)?;
        let id = self.pool.get(handle).id;
        match side {
            BookSide::Bid => self.bids.insert(handle, tick),
            BookSide::Ask => self.asks.insert(handle, tick),
        }
        self.registry.insert(id, Residency { side, tick });
        Ok(id)
    }

    /// Find the queued handle for a registered id.
    fn locate(&self, id: OrderId, residency: Residency) -> Option<OrderHandle> {
        self.side(residency.side)
            .level(residency.tick)
            .iter()
            .find(|&h| self.pool.get(h).id == id)
    }
}

impl Default for Orderbook {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Orderbook {
        Orderbook::new(1_000)
    }

    #[test]
    fn test_add_and_best() {
        let mut book = engine();
        book.add(100, 10_050, BookSide::Bid).unwrap();
        book.add(200, 10_100, BookSide::Ask).unwrap();

        assert_eq!(book.best(BookSide::Bid), Some(10_050));
        assert_eq!(book.best(BookSide::Ask), Some(10_100));
        assert_eq!(book.depth_at(BookSide::Bid, 10_050), (100, 1));
        assert_eq!(book.depth_at(BookSide::Ask, 10_100), (200, 1));
        assert_eq!(book.open_orders(), 2);
    }

    #[test]
    fn test_add_rejects_off_grid_tick() {
        let mut book = engine();
        assert_eq!(
            book.add(100, 0, BookSide::Bid),
            Err(OrderError::TickOutOfRange { tick: 0 })
        );
        assert_eq!(
            book.add(100, 200_001, BookSide::Ask),
            Err(OrderError::TickOutOfRange { tick: 200_001 })
        );
        assert_eq!(book.open_orders(), 0);
    }

    #[test]
    fn test_add_rejects_non_positive_qty() {
        let mut book = engine();
        assert_eq!(
            book.add(0, 10_000, BookSide::Bid),
            Err(OrderError::InvalidQuantity { qty: 0 })
        );
        assert_eq!(
            book.add(-5, 10_000, BookSide::Bid),
            Err(OrderError::InvalidQuantity { qty: -5 })
        );
    }

    #[test]
    fn test_market_sell_fills_bids_fifo() {
        let mut book = engine();
        book.add(100, 10_050, BookSide::Bid).unwrap();
        book.add(150, 10_050, BookSide::Bid).unwrap();

        let exec = book.market(200, Side::Sell).unwrap();
        assert_eq!(exec.qty, 200);
        assert_eq!(exec.notional, 200 * 10_050);

        // First order consumed entirely, second reduced to 50.
        assert_eq!(book.depth_at(BookSide::Bid, 10_050), (50, 1));
        assert_eq!(book.best(BookSide::Bid), Some(10_050));
    }

    #[test]
    fn test_market_on_empty_book() {
        let mut book = engine();
        let exec = book.market(500, Side::Buy).unwrap();
        assert_eq!(exec, Execution::empty());
        assert_eq!(book.open_orders(), 0);
        assert_eq!(book.pool_available(), book.pool_capacity());
    }

    #[test]
    fn test_market_residual_discarded() {
        let mut book = engine();
        book.add(50, 10_100, BookSide::Ask).unwrap();
        let exec = book.market(200, Side::Buy).unwrap();
        assert_eq!(exec.qty, 50);
        assert!(book.asks().is_empty());
        // Nothing rested for the unfilled 150.
        assert_eq!(book.open_orders(), 0);
    }

    #[test]
    fn test_marketable_limit_buy() {
        let mut book = engine();
        book.add(200, 10_100, BookSide::Ask).unwrap();
        book.add(250, 10_100, BookSide::Ask).unwrap();

        let exec = book.limit(300, Side::Buy, 10_100).unwrap();
        assert_eq!(exec.qty, 300);
        assert_eq!(exec.notional, 300 * 10_100);
        assert_eq!(book.depth_at(BookSide::Ask, 10_100), (150, 1));
        // Fully filled: nothing rests on the bid side.
        assert!(book.bids().is_empty());
    }

    #[test]
    fn test_limit_residual_rests_on_own_side() {
        let mut book = engine();
        book.add(100, 10_100, BookSide::Ask).unwrap();

        let exec = book.limit(300, Side::Buy, 10_100).unwrap();
        assert_eq!(exec.qty, 100);
        assert!(book.asks().is_empty());
        // Residual 200 rests as a bid at the limit tick.
        assert_eq!(book.depth_at(BookSide::Bid, 10_100), (200, 1));
        assert_eq!(book.best(BookSide::Bid), Some(10_100));
    }

    #[test]
    fn test_non_marketable_limit_rests() {
        let mut book = engine();
        let exec = book.limit(50, Side::Buy, 9_000).unwrap();
        assert_eq!(exec, Execution::empty());
        assert_eq!(book.best(BookSide::Bid), Some(9_000));
        assert_eq!(book.bids().active_ticks(), 1);
    }

    #[test]
    fn test_limit_crosses_inclusively() {
        let mut book = engine();
        book.add(100, 10_100, BookSide::Ask).unwrap();
        // Exactly at the best ask: matches.
        let exec = book.limit(100, Side::Buy, 10_100).unwrap();
        assert_eq!(exec.qty, 100);
    }

    #[test]
    fn test_limit_outside_best_rests_without_matching() {
        let mut book = engine();
        book.add(100, 10_100, BookSide::Ask).unwrap();
        // One tick below the best ask: no match, rests.
        let exec = book.limit(100, Side::Buy, 10_099).unwrap();
        assert_eq!(exec.qty, 0);
        assert_eq!(book.best(BookSide::Bid), Some(10_099));
        assert_eq!(book.depth_at(BookSide::Ask, 10_100), (100, 1));
    }

    #[test]
    fn test_limit_sell_sweeps_down_to_barrier() {
        let mut book = engine();
        book.add(100, 10_200, BookSide::Bid).unwrap();
        book.add(100, 10_100, BookSide::Bid).unwrap();
        book.add(100, 10_000, BookSide::Bid).unwrap();

        let exec = book.limit(300, Side::Sell, 10_100).unwrap();
        // 10_200 and 10_100 cross; 10_000 is below the limit.
        assert_eq!(exec.qty, 200);
        assert_eq!(exec.notional, 100 * 10_200 + 100 * 10_100);
        // Residual 100 rests as an ask at 10_100.
        assert_eq!(book.depth_at(BookSide::Ask, 10_100), (100, 1));
        assert_eq!(book.best(BookSide::Bid), Some(10_000));
    }

    #[test]
    fn test_sweep_spans_multiple_ticks_best_first() {
        let mut book = engine();
        book.add(50, 10_020, BookSide::Ask).unwrap();
        book.add(50, 10_000, BookSide::Ask).unwrap();
        book.add(50, 10_010, BookSide::Ask).unwrap();

        let exec = book.limit(120, Side::Buy, 10_020).unwrap();
        assert_eq!(exec.qty, 120);
        assert_eq!(exec.notional, 50i64 * 10_000 + 50 * 10_010 + 20 * 10_020);
        assert_eq!(book.depth_at(BookSide::Ask, 10_020), (30, 1));
        assert_eq!(book.best(BookSide::Ask), Some(10_020));
    }

    #[test]
    fn test_best_quote_advances_on_depletion() {
        let mut book = engine();
        book.add(10, 10_100, BookSide::Ask).unwrap();
        book.add(10, 10_200, BookSide::Ask).unwrap();

        let exec = book.market(10, Side::Buy).unwrap();
        assert_eq!(exec.qty, 10);
        assert_eq!(book.best(BookSide::Ask), Some(10_200));
        assert_eq!(book.asks().active_ticks(), 1);
    }

    #[test]
    fn test_cancel_roundtrip_restores_state() {
        let mut book = engine();
        let free_before = book.pool_available();
        let id = book.add(100, 10_050, BookSide::Bid).unwrap();

        assert!(book.cancel(id));
        assert_eq!(book.best(BookSide::Bid), None);
        assert_eq!(book.bids().active_ticks(), 0);
        assert_eq!(book.pool_available(), free_before);
        assert_eq!(book.open_orders(), 0);
        // Second cancel: the id is gone.
        assert!(!book.cancel(id));
    }

    #[test]
    fn test_cancel_unknown_id() {
        let mut book = engine();
        assert!(!book.cancel(999));
    }

    #[test]
    fn test_cancel_interior_preserves_fifo() {
        let mut book = engine();
        let a = book.add(10, 10_000, BookSide::Bid).unwrap();
        let b = book.add(20, 10_000, BookSide::Bid).unwrap();
        let c = book.add(30, 10_000, BookSide::Bid).unwrap();

        assert!(book.cancel(b));
        let rest = book.orders_at(BookSide::Bid, 10_000);
        assert_eq!(rest, vec![(a, 10), (c, 30)]);
    }

    #[test]
    fn test_modify_overwrites_qty_in_place() {
        let mut book = engine();
        let id = book.add(100, 10_050, BookSide::Bid).unwrap();
        assert!(book.modify(id, 999));
        assert_eq!(book.orders_at(BookSide::Bid, 10_050), vec![(id, 999)]);
        // Registry untouched: still cancellable.
        assert!(book.cancel(id));
    }

    #[test]
    fn test_modify_keeps_queue_position() {
        let mut book = engine();
        let a = book.add(100, 10_000, BookSide::Bid).unwrap();
        let b = book.add(100, 10_000, BookSide::Bid).unwrap();

        assert!(book.modify(a, 500));
        let exec = book.market(200, Side::Sell).unwrap();
        assert_eq!(exec.qty, 200);
        assert_eq!(exec.notional, 200 * 10_000);

        // A stayed at the head: partially consumed to 300, B untouched.
        let rest = book.orders_at(BookSide::Bid, 10_000);
        assert_eq!(rest, vec![(a, 300), (b, 100)]);
    }

    #[test]
    fn test_modify_unknown_or_invalid() {
        let mut book = engine();
        let id = book.add(100, 10_000, BookSide::Bid).unwrap();
        assert!(!book.modify(999, 50));
        assert!(!book.modify(id, 0));
        assert!(!book.modify(id, -10));
        assert_eq!(book.orders_at(BookSide::Bid, 10_000), vec![(id, 100)]);
    }

    #[test]
    fn test_full_fill_removes_registry_entry() {
        let mut book = engine();
        let id = book.add(100, 10_100, BookSide::Ask).unwrap();
        book.market(100, Side::Buy).unwrap();
        assert!(book.residency(id).is_none());
        assert!(!book.cancel(id));
        assert!(!book.modify(id, 50));
    }

    #[test]
    fn test_partial_fill_keeps_registry_entry() {
        let mut book = engine();
        let id = book.add(100, 10_100, BookSide::Ask).unwrap();
        book.market(40, Side::Buy).unwrap();
        assert_eq!(
            book.residency(id),
            Some(Residency {
                side: BookSide::Ask,
                tick: 10_100
            })
        );
        assert!(book.modify(id, 10));
        assert!(book.cancel(id));
    }

    #[test]
    fn test_pool_exhaustion_surfaces_error() {
        let mut book = Orderbook::new(2);
        book.add(1, 10_000, BookSide::Bid).unwrap();
        book.add(1, 10_001, BookSide::Bid).unwrap();
        assert_eq!(
            book.add(1, 10_002, BookSide::Bid),
            Err(OrderError::PoolExhausted)
        );
        // Cancel frees a slot and adds succeed again.
        assert!(book.cancel(1));
        book.add(1, 10_002, BookSide::Bid).unwrap();
    }

    #[test]
    fn test_submit_requires_limit_tick() {
        let mut book = engine();
        assert_eq!(
            book.submit(OrderType::Limit, 10, Side::Buy, None),
            Err(OrderError::MissingLimitTick)
        );
        // Market ignores the limit tick.
        let exec = book
            .submit(OrderType::Market, 10, Side::Buy, Some(10_000))
            .unwrap();
        assert_eq!(exec, Execution::empty());
    }

    #[test]
    fn test_submit_rejects_bad_inputs() {
        let mut book = engine();
        assert_eq!(
            book.submit(OrderType::Market, 0, Side::Buy, None),
            Err(OrderError::InvalidQuantity { qty: 0 })
        );
        assert_eq!(
            book.limit(10, Side::Buy, 300_000),
            Err(OrderError::TickOutOfRange { tick: 300_000 })
        );
    }

    #[test]
    fn test_clear_resets_book_but_not_ids() {
        let mut book = engine();
        let a = book.add(10, 10_000, BookSide::Bid).unwrap();
        book.add(10, 10_100, BookSide::Ask).unwrap();

        book.clear();
        assert_eq!(book.open_orders(), 0);
        assert_eq!(book.best(BookSide::Bid), None);
        assert_eq!(book.best(BookSide::Ask), None);
        assert_eq!(book.pool_available(), book.pool_capacity());

        let b = book.add(10, 10_000, BookSide::Bid).unwrap();
        assert!(b > a);
    }

    #[test]
    fn test_scan_best_matches_cache_through_mutation() {
        let mut book = engine();
        book.add(100, 10_000, BookSide::Bid).unwrap();
        book.add(100, 10_050, BookSide::Bid).unwrap();
        let id = book.add(100, 10_100, BookSide::Bid).unwrap();
        assert_eq!(book.bids().scan_best(), book.best(BookSide::Bid));

        book.cancel(id);
        assert_eq!(book.bids().scan_best(), book.best(BookSide::Bid));

        book.market(100, Side::Sell).unwrap();
        assert_eq!(book.bids().scan_best(), book.best(BookSide::Bid));
    }
}
