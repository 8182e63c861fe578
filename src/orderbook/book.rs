//! The book index: order arena, id index, and sorted price-level maps.
//!
//! ## Layout
//!
//! - **Slab arena**: every admitted order occupies one slot for the
//!   engine's lifetime, so `get_order` and duplicate detection work for
//!   terminal orders too.
//! - **BTreeMap sides**: bids keyed by `Reverse(price)` (best = highest
//!   first), asks keyed by `price` (best = lowest first).
//! - **HashMap index**: `OrderId -> slab key`, the stable handle that
//!   makes cancel and modify O(log P) instead of a book walk.
//!
//! Only active limit-like orders are *linked* into a price level;
//! untriggered stops and terminal orders sit in the arena unlinked.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use slab::Slab;

use crate::orderbook::{OrderNode, PriceLevel};
use crate::types::{Order, OrderId, Price, Quantity, Side};

/// Two-sided book over a shared order arena.
#[derive(Debug, Default)]
pub struct Book {
    arena: Slab<OrderNode>,
    index: HashMap<OrderId, usize>,
    bids: BTreeMap<Reverse<Price>, PriceLevel>,
    asks: BTreeMap<Price, PriceLevel>,
    open_bids: usize,
    open_asks: usize,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate arena and index capacity for `orders` slots.
    pub fn with_capacity(orders: usize) -> Self {
        Self {
            arena: Slab::with_capacity(orders),
            index: HashMap::with_capacity(orders),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            open_bids: 0,
            open_asks: 0,
        }
    }

    // ------------------------------------------------------------------
    // Arena and index
    // ------------------------------------------------------------------

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Count of admitted orders, any status.
    #[inline]
    pub fn known_orders(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    #[inline]
    pub fn key_of(&self, order_id: OrderId) -> Option<usize> {
        self.index.get(&order_id).copied()
    }

    #[inline]
    pub fn node(&self, key: usize) -> &OrderNode {
        self.arena.get(key).expect("book: key not in arena")
    }

    #[inline]
    pub fn node_mut(&mut self, key: usize) -> &mut OrderNode {
        self.arena.get_mut(key).expect("book: key not in arena")
    }

    #[inline]
    pub fn order(&self, key: usize) -> &Order {
        &self.node(key).order
    }

    #[inline]
    pub fn arena(&self) -> &Slab<OrderNode> {
        &self.arena
    }

    /// Record a validated order in the arena and the id index. The caller
    /// must have screened for duplicate ids. Does not link the order into
    /// a level.
    pub fn admit(&mut self, order: Order) -> usize {
        let order_id = order.id();
        let key = self.arena.insert(OrderNode::new(order));
        self.index.insert(order_id, key);
        key
    }

    // ------------------------------------------------------------------
    // Linking resting orders
    // ------------------------------------------------------------------

    /// Append the order at `key` to the tail of its price level, creating
    /// the level if absent. The order must be limit-like and active.
    pub fn link(&mut self, key: usize) {
        let node = self.node(key);
        let side = node.order.side();
        let price = node
            .resting_price()
            .expect("book link: order has no resting price");
        match side {
            Side::Buy => {
                let level = self
                    .bids
                    .entry(Reverse(price))
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(key, &mut self.arena);
                self.open_bids += 1;
            }
            Side::Sell => {
                let level = self
                    .asks
                    .entry(price)
                    .or_insert_with(|| PriceLevel::new(price));
                level.push_back(key, &mut self.arena);
                self.open_asks += 1;
            }
        }
    }

    /// Excise the order at `key` from its price level, dropping the level
    /// if it empties. The order must currently be linked.
    pub fn unlink(&mut self, key: usize) {
        let node = self.node(key);
        let side = node.order.side();
        let price = node
            .resting_price()
            .expect("book unlink: order has no resting price");
        match side {
            Side::Buy => {
                let level = self
                    .bids
                    .get_mut(&Reverse(price))
                    .expect("book unlink: bid level missing");
                level.remove(key, &mut self.arena);
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                self.open_bids -= 1;
            }
            Side::Sell => {
                let level = self
                    .asks
                    .get_mut(&price)
                    .expect("book unlink: ask level missing");
                level.remove(key, &mut self.arena);
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                self.open_asks -= 1;
            }
        }
    }

    /// Reduce a level's aggregate after a partial fill of a queued order.
    pub fn reduce_level(&mut self, side: Side, price: Price, filled: Quantity) {
        match side {
            Side::Buy => {
                self.bids
                    .get_mut(&Reverse(price))
                    .expect("book reduce: bid level missing")
                    .reduce(filled);
            }
            Side::Sell => {
                self.asks
                    .get_mut(&price)
                    .expect("book reduce: ask level missing")
                    .reduce(filled);
            }
        }
    }

    // ------------------------------------------------------------------
    // Best prices and matching access
    // ------------------------------------------------------------------

    /// Highest bid price with a non-empty level.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next().map(|r| r.0)
    }

    /// Lowest ask price with a non-empty level.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// The front resting order of the best level opposite `taker_side`,
    /// with its level price. This is the next order a taker would trade
    /// against.
    pub fn front_of_best(&self, taker_side: Side) -> Option<(Price, usize)> {
        match taker_side {
            Side::Buy => self
                .asks
                .values()
                .next()
                .map(|level| (level.price, level.front().expect("empty level in ask map"))),
            Side::Sell => self
                .bids
                .values()
                .next()
                .map(|level| (level.price, level.front().expect("empty level in bid map"))),
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Aggregate resting quantity at `(side, price)`; zero if no level.
    pub fn volume_at(&self, side: Side, price: Price) -> Quantity {
        match side {
            Side::Buy => self
                .bids
                .get(&Reverse(price))
                .map_or(0, |level| level.total_quantity),
            Side::Sell => self.asks.get(&price).map_or(0, |level| level.total_quantity),
        }
    }

    /// `(price, aggregate quantity)` for up to `max_levels` levels from
    /// best outward.
    pub fn depth(&self, side: Side, max_levels: usize) -> Vec<(Price, Quantity)> {
        self.levels(side)
            .take(max_levels)
            .map(|level| (level.price, level.total_quantity))
            .collect()
    }

    /// Price levels from best outward.
    pub fn levels(&self, side: Side) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match side {
            Side::Buy => Box::new(self.bids.values()),
            Side::Sell => Box::new(self.asks.values()),
        }
    }

    /// Number of resting orders on `side`.
    #[inline]
    pub fn open_count(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.open_bids,
            Side::Sell => self.open_asks,
        }
    }

    /// Number of non-empty price levels on `side`.
    #[inline]
    pub fn level_count(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    /// True when nothing rests on either side.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderSpec;

    fn admit_linked(book: &mut Book, spec: OrderSpec, seq: u64) -> usize {
        let key = book.admit(Order::new(spec, seq));
        book.link(key);
        key
    }

    #[test]
    fn empty_book() {
        let book = Book::new();
        assert!(book.is_empty());
        assert_eq!(book.known_orders(), 0);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.front_of_best(Side::Buy), None);
        assert_eq!(book.volume_at(Side::Buy, 100), 0);
    }

    #[test]
    fn with_capacity_preallocates() {
        let book = Book::with_capacity(1024);
        assert!(book.capacity() >= 1024);
        assert!(book.is_empty());
    }

    #[test]
    fn best_prices_order_correctly() {
        let mut book = Book::new();
        admit_linked(&mut book, OrderSpec::limit(1, Side::Buy, 10, 95), 1);
        admit_linked(&mut book, OrderSpec::limit(2, Side::Buy, 5, 100), 2);
        admit_linked(&mut book, OrderSpec::limit(3, Side::Buy, 7, 97), 3);
        admit_linked(&mut book, OrderSpec::limit(4, Side::Sell, 8, 105), 4);
        admit_linked(&mut book, OrderSpec::limit(5, Side::Sell, 3, 103), 5);

        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), Some(103));
        assert_eq!(book.level_count(Side::Buy), 3);
        assert_eq!(book.level_count(Side::Sell), 2);
        assert_eq!(book.open_count(Side::Buy), 3);
        assert_eq!(book.open_count(Side::Sell), 2);
    }

    #[test]
    fn negative_tick_prices_sort() {
        let mut book = Book::new();
        admit_linked(&mut book, OrderSpec::limit(1, Side::Buy, 10, -5), 1);
        admit_linked(&mut book, OrderSpec::limit(2, Side::Buy, 10, -2), 2);
        admit_linked(&mut book, OrderSpec::limit(3, Side::Sell, 10, -1), 3);

        assert_eq!(book.best_bid(), Some(-2));
        assert_eq!(book.best_ask(), Some(-1));
    }

    #[test]
    fn front_of_best_is_fifo() {
        let mut book = Book::new();
        let first = admit_linked(&mut book, OrderSpec::limit(1, Side::Sell, 3, 103), 1);
        admit_linked(&mut book, OrderSpec::limit(2, Side::Sell, 5, 103), 2);
        admit_linked(&mut book, OrderSpec::limit(3, Side::Sell, 8, 105), 3);

        assert_eq!(book.front_of_best(Side::Buy), Some((103, first)));
        assert_eq!(book.front_of_best(Side::Sell), None);
    }

    #[test]
    fn volume_aggregates_per_level() {
        let mut book = Book::new();
        admit_linked(&mut book, OrderSpec::limit(1, Side::Buy, 10, 100), 1);
        admit_linked(&mut book, OrderSpec::limit(2, Side::Buy, 20, 100), 2);
        admit_linked(&mut book, OrderSpec::limit(3, Side::Buy, 30, 100), 3);

        assert_eq!(book.volume_at(Side::Buy, 100), 60);
        assert_eq!(book.level_count(Side::Buy), 1);
    }

    #[test]
    fn unlink_drops_empty_level() {
        let mut book = Book::new();
        let a = admit_linked(&mut book, OrderSpec::limit(1, Side::Buy, 10, 100), 1);
        admit_linked(&mut book, OrderSpec::limit(2, Side::Buy, 10, 99), 2);

        assert_eq!(book.level_count(Side::Buy), 2);
        book.unlink(a);
        assert_eq!(book.level_count(Side::Buy), 1);
        assert_eq!(book.best_bid(), Some(99));
        assert_eq!(book.open_count(Side::Buy), 1);

        // The order is still known after unlinking.
        assert!(book.contains(1));
        assert_eq!(book.known_orders(), 2);
    }

    #[test]
    fn reduce_level_mirrors_fills() {
        let mut book = Book::new();
        let key = admit_linked(&mut book, OrderSpec::limit(1, Side::Sell, 10, 103), 1);

        assert!(book.node_mut(key).order.fill(4));
        book.reduce_level(Side::Sell, 103, 4);
        assert_eq!(book.volume_at(Side::Sell, 103), 6);
    }

    #[test]
    fn depth_walks_best_outward() {
        let mut book = Book::new();
        admit_linked(&mut book, OrderSpec::limit(1, Side::Sell, 8, 105), 1);
        admit_linked(&mut book, OrderSpec::limit(2, Side::Sell, 3, 103), 2);
        admit_linked(&mut book, OrderSpec::limit(3, Side::Sell, 5, 110), 3);
        admit_linked(&mut book, OrderSpec::limit(4, Side::Buy, 7, 97), 4);
        admit_linked(&mut book, OrderSpec::limit(5, Side::Buy, 5, 100), 5);

        assert_eq!(book.depth(Side::Sell, 2), vec![(103, 3), (105, 8)]);
        assert_eq!(book.depth(Side::Buy, 8), vec![(100, 5), (97, 7)]);
    }

    #[test]
    fn admitted_but_unlinked_is_invisible() {
        let mut book = Book::new();
        let key = book.admit(Order::new(OrderSpec::stop(1, Side::Buy, 10, 105), 1));

        assert!(book.contains(1));
        assert_eq!(book.key_of(1), Some(key));
        assert!(book.is_empty());
        assert_eq!(book.volume_at(Side::Buy, 105), 0);
    }
}
