//! Fixed-capacity order pool.
//!
//! Pre-allocates the whole backing array at construction, so no per-order
//! heap allocation happens on the hot path and handles stay valid for the
//! lifetime of the order. The free list is LIFO: a just-released slot is
//! the next one handed out, which keeps recently touched memory warm.
//!
//! The pool also owns the identifier counter. Ids start at 1, increment on
//! every successful acquire, and are never reused.

use tracing::{debug, warn};

use crate::order::{Order, OrderHandle};
use crate::types::{OrderId, Qty, Tick};

/// Arena of order slots with O(1) acquire and release.
pub struct OrderPool {
    /// Contiguous backing storage. Never resized after construction.
    slots: Vec<Order>,
    /// Indices of free slots, popped from the back.
    free: Vec<u32>,
    /// Next identifier to assign.
    next_id: OrderId,
}

impl OrderPool {
    /// Create a pool holding at most `capacity` live orders.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity <= u32::MAX as usize, "pool capacity exceeds u32 indexing");
        debug!(capacity, "order pool initialised");
        Self {
            slots: vec![Order::vacant(); capacity],
            // Reverse order so the first acquire hands out slot 0.
            free: (0..capacity as u32).rev().collect(),
            next_id: 1,
        }
    }

    /// Take a free slot, assign it a fresh identifier, and write the order.
    ///
    /// Returns `None` when every slot is live; the engine maps that to
    /// [`crate::OrderError::PoolExhausted`].
    #[inline]
    pub fn acquire(&mut self, qty: Qty, tick: Tick) -> Option<OrderHandle> {
        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                warn!(capacity = self.slots.len(), "order pool exhausted");
                return None;
            }
        };
        let id = self.next_id;
        self.next_id += 1;

        let slot = &mut self.slots[idx as usize];
        slot.id = id;
        slot.tick = tick;
        slot.qty = qty;
        slot.live = true;
        Some(OrderHandle(idx))
    }

    /// Return a slot to the free list.
    ///
    /// # Panics
    ///
    /// Panics when the handle does not refer to a slot in this pool or the
    /// slot is not live (double release). Both indicate a structural bug in
    /// the caller, never a runtime condition.
    #[inline]
    pub fn release(&mut self, handle: OrderHandle) {
        assert!(
            handle.index() < self.slots.len(),
            "release of foreign handle {} (pool capacity {})",
            handle.0,
            self.slots.len()
        );
        let slot = &mut self.slots[handle.index()];
        assert!(slot.live, "double release of order slot {}", handle.0);
        slot.live = false;
        self.free.push(handle.0);
    }

    /// Read a slot.
    #[inline]
    pub fn get(&self, handle: OrderHandle) -> &Order {
        &self.slots[handle.index()]
    }

    /// Mutate a slot.
    #[inline]
    pub fn get_mut(&mut self, handle: OrderHandle) -> &mut Order {
        &mut self.slots[handle.index()]
    }

    /// Free slots remaining.
    #[inline]
    pub fn available(&self) -> usize {
        self.free.len()
    }

    /// Live orders currently allocated.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Total slot count fixed at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Identifier the next acquire will assign.
    #[inline]
    pub fn next_id(&self) -> OrderId {
        self.next_id
    }

    /// Release every live slot at once. The id counter is not reset;
    /// identifiers stay unique across a clear.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.live = false;
        }
        self.free.clear();
        self.free.extend((0..self.slots.len() as u32).rev());
    }
}
