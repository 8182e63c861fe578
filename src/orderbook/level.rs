//! A price level: the FIFO queue of resting orders at one price.
//!
//! The queue is an intrusive doubly linked list over slab keys; this
//! struct holds only the endpoints and the aggregates. New orders append
//! at the tail, matching consumes from the head, and any order can be
//! excised in O(1) given its key.
//!
//! Invariant: `total_quantity` equals the sum of the remaining quantities
//! of the queued orders. An empty level must be removed from its side map
//! by the owner.

use slab::Slab;

use crate::orderbook::OrderNode;
use crate::types::{Price, Quantity};

/// Queue metadata for all resting orders at a single price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Price shared by every order in the queue.
    pub price: Price,
    /// Sum of remaining quantities in the queue.
    pub total_quantity: Quantity,
    /// Oldest order (matched first).
    head: Option<usize>,
    /// Newest order (appended last).
    tail: Option<usize>,
    /// Number of queued orders.
    len: usize,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            total_quantity: 0,
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Oldest order's slab key, the next to match at this price.
    #[inline]
    pub fn front(&self) -> Option<usize> {
        self.head
    }

    /// Append `key` at the tail, preserving time priority. The node's
    /// current remaining quantity joins the aggregate.
    pub fn push_back(&mut self, key: usize, arena: &mut Slab<OrderNode>) {
        let node = arena.get_mut(key).expect("level push: key not in arena");
        let qty = node.remaining();
        node.prev = self.tail;
        node.next = None;

        match self.tail {
            Some(tail_key) => {
                arena
                    .get_mut(tail_key)
                    .expect("level push: dangling tail key")
                    .next = Some(key);
            }
            None => self.head = Some(key),
        }

        self.tail = Some(key);
        self.len += 1;
        self.total_quantity += qty;
    }

    /// Excise `key` from anywhere in the queue. Returns the remaining
    /// quantity the order carried out of the aggregate.
    pub fn remove(&mut self, key: usize, arena: &mut Slab<OrderNode>) -> Quantity {
        let node = arena.get(key).expect("level remove: key not in arena");
        let qty = node.remaining();
        let prev = node.prev;
        let next = node.next;

        match prev {
            Some(prev_key) => {
                arena
                    .get_mut(prev_key)
                    .expect("level remove: dangling prev key")
                    .next = next;
            }
            None => self.head = next,
        }
        match next {
            Some(next_key) => {
                arena
                    .get_mut(next_key)
                    .expect("level remove: dangling next key")
                    .prev = prev;
            }
            None => self.tail = prev,
        }

        let node = arena.get_mut(key).expect("level remove: key not in arena");
        node.prev = None;
        node.next = None;

        self.len -= 1;
        self.total_quantity -= qty;
        qty
    }

    /// Knock `filled` off the aggregate after a partial fill of a queued
    /// order.
    #[inline]
    pub fn reduce(&mut self, filled: Quantity) {
        self.total_quantity -= filled;
    }

    /// Slab keys in FIFO order. Used for snapshots and digests, not on
    /// the matching path.
    pub fn keys_fifo(&self, arena: &Slab<OrderNode>) -> Vec<usize> {
        let mut keys = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(key) = cursor {
            keys.push(key);
            cursor = arena.get(key).expect("level walk: dangling key").next;
        }
        keys
    }
}
