//! One side of the book: dense per-tick ladder, active-tick index, and a
//! cached best tick.
//!
//! The dense array gives O(1) access to any level. The ordered active set
//! answers "which ticks hold liquidity" without scanning the grid, and the
//! cached best makes top-of-book a plain field read. The cache is only
//! recomputed when the level holding the current best drains; ordinary
//! inserts either leave it alone or overwrite it with a strictly better
//! tick.

use std::collections::BTreeSet;

use crate::level::PriceLevel;
use crate::order::OrderHandle;
use crate::types::{BookSide, Tick, MIN_TICK, TICK_SPAN};

/// Bid or ask ladder over the full price grid.
pub struct SideBook {
    polarity: BookSide,
    levels: Vec<PriceLevel>,
    active: BTreeSet<Tick>,
    best: Option<Tick>,
}

#[inline]
fn slot(tick: Tick) -> usize {
    (tick - MIN_TICK) as usize
}

impl SideBook {
    /// Preallocate the full ladder for one polarity.
    pub fn new(polarity: BookSide) -> Self {
        Self {
            polarity,
            levels: vec![PriceLevel::new(); TICK_SPAN],
            active: BTreeSet::new(),
            best: None,
        }
    }

    /// Which polarity this ladder carries.
    #[inline]
    pub fn polarity(&self) -> BookSide {
        self.polarity
    }

    /// Cached top-of-book tick. O(1).
    #[inline]
    pub fn best_tick(&self) -> Option<Tick> {
        self.best
    }

    /// True when no tick holds liquidity.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Number of active ticks.
    #[inline]
    pub fn active_ticks(&self) -> usize {
        self.active.len()
    }

    /// The level at `tick`. Caller guarantees the tick is on the grid.
    #[inline]
    pub fn level(&self, tick: Tick) -> &PriceLevel {
        &self.levels[slot(tick)]
    }

    /// Queue a handle at `tick`, activating the level if it was empty.
    pub fn insert(&mut self, handle: OrderHandle, tick: Tick) {
        let level = &mut self.levels[slot(tick)];
        if level.is_empty() {
            self.active.insert(tick);
        }
        level.push_back(handle);

        let improves = match (self.best, self.polarity) {
            (None, _) => true,
            (Some(best), BookSide::Bid) => tick > best,
            (Some(best), BookSide::Ask) => tick < best,
        };
        if improves {
            self.best = Some(tick);
        }
    }

    /// Handle at the front of the queue at `tick`.
    #[inline]
    pub fn front(&self, tick: Tick) -> Option<OrderHandle> {
        self.levels[slot(tick)].front()
    }

    /// Pop the head of the queue at `tick`, deactivating a drained level.
    pub fn pop_front(&mut self, tick: Tick) -> Option<OrderHandle> {
        let level = &mut self.levels[slot(tick)];
        let handle = level.pop_front()?;
        if level.is_empty() {
            self.deactivate(tick);
        }
        Some(handle)
    }

    /// Erase `handle` from the queue at `tick`, deactivating a drained
    /// level. Returns false when the handle is not queued there.
    pub fn erase(&mut self, handle: OrderHandle, tick: Tick) -> bool {
        let level = &mut self.levels[slot(tick)];
        if !level.erase(handle) {
            return false;
        }
        if level.is_empty() {
            self.deactivate(tick);
        }
        true
    }

    /// Active ticks in match priority order: descending for bids,
    /// ascending for asks.
    pub fn walk_from_best(&self) -> Box<dyn Iterator<Item = Tick> + '_> {
        match self.polarity {
            BookSide::Bid => Box::new(self.active.iter().rev().copied()),
            BookSide::Ask => Box::new(self.active.iter().copied()),
        }
    }

    /// Linear rescan of the dense ladder.
    ///
    /// Diagnostic only: must agree with [`Self::best_tick`] whenever the
    /// bookkeeping is intact.
    pub fn scan_best(&self) -> Option<Tick> {
        match self.polarity {
            BookSide::Bid => (0..self.levels.len())
                .rev()
                .find(|&i| !self.levels[i].is_empty())
                .map(|i| i as Tick + MIN_TICK),
            BookSide::Ask => (0..self.levels.len())
                .find(|&i| !self.levels[i].is_empty())
                .map(|i| i as Tick + MIN_TICK),
        }
    }

    /// Drop all resting orders. Only touches the active levels.
    pub fn clear(&mut self) {
        for &tick in &self.active {
            self.levels[slot(tick)].clear();
        }
        self.active.clear();
        self.best = None;
    }

    fn deactivate(&mut self, tick: Tick) {
        self.active.remove(&tick);
        if self.best == Some(tick) {
            self.best = match self.polarity {
                BookSide::Bid => self.active.iter().next_back().copied(),
                BookSide::Ask => self.active.iter().next().copied(),
            };
        }
    }
}
