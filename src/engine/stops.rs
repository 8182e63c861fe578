//! Holding pen for stop and stop-limit orders that have not triggered.
//!
//! Orders wait here in arrival order. After any batch of trades moves the
//! last trade price, the matcher sweeps the queue: every order whose
//! trigger predicate holds is marked triggered and extracted, preserving
//! FIFO order, ready to be re-injected into the matcher.

use std::collections::VecDeque;

use crate::orderbook::Book;
use crate::types::Price;

/// FIFO queue of arena keys for untriggered stop orders.
#[derive(Debug, Default)]
pub struct StopQueue {
    pending: VecDeque<usize>,
}

impl StopQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Hold `key` until its trigger fires. Arrival order is preserved.
    pub fn push(&mut self, key: usize) {
        self.pending.push_back(key);
    }

    /// Drop `key` from the queue (cancel/modify path). Returns whether it
    /// was held.
    pub fn remove(&mut self, key: usize) -> bool {
        match self.pending.iter().position(|&k| k == key) {
            Some(pos) => {
                self.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Extract every order whose trigger predicate holds against
    /// `last_trade_price`, marking each triggered. Extracted keys come
    /// back in the order they were held; the rest keep their order.
    pub fn sweep(&mut self, last_trade_price: Price, book: &mut Book) -> Vec<usize> {
        let mut fired = Vec::new();
        let mut kept = VecDeque::with_capacity(self.pending.len());
        for key in self.pending.drain(..) {
            if book.order(key).should_trigger(last_trade_price) {
                fired.push(key);
            } else {
                kept.push_back(key);
            }
        }
        self.pending = kept;
        for &key in &fired {
            book.node_mut(key).order.mark_triggered();
        }
        fired
    }

    /// Held keys in arrival order.
    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.pending.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Order, OrderSpec, OrderStatus, Side};

    fn admit_stop(book: &mut Book, id: u64, side: Side, stop: i64) -> usize {
        book.admit(Order::new(OrderSpec::stop(id, side, 10, stop), id))
    }

    #[test]
    fn sweep_extracts_in_arrival_order() {
        let mut book = Book::new();
        let mut stops = StopQueue::new();

        let a = admit_stop(&mut book, 1, Side::Buy, 105);
        let b = admit_stop(&mut book, 2, Side::Buy, 103);
        let c = admit_stop(&mut book, 3, Side::Buy, 120);
        stops.push(a);
        stops.push(b);
        stops.push(c);

        let fired = stops.sweep(110, &mut book);
        assert_eq!(fired, vec![a, b]);
        assert_eq!(stops.len(), 1);
        assert_eq!(stops.keys().collect::<Vec<_>>(), vec![c]);
    }

    #[test]
    fn sweep_marks_triggered_active() {
        let mut book = Book::new();
        let mut stops = StopQueue::new();

        let key = admit_stop(&mut book, 1, Side::Sell, 95);
        stops.push(key);

        assert!(stops.sweep(96, &mut book).is_empty());
        assert_eq!(book.order(key).status(), OrderStatus::New);

        let fired = stops.sweep(95, &mut book);
        assert_eq!(fired, vec![key]);
        assert!(book.order(key).is_triggered());
        assert_eq!(book.order(key).status(), OrderStatus::Active);
    }

    #[test]
    fn remove_held_key() {
        let mut book = Book::new();
        let mut stops = StopQueue::new();

        let a = admit_stop(&mut book, 1, Side::Buy, 105);
        let b = admit_stop(&mut book, 2, Side::Buy, 106);
        stops.push(a);
        stops.push(b);

        assert!(stops.remove(a));
        assert!(!stops.remove(a));
        assert_eq!(stops.keys().collect::<Vec<_>>(), vec![b]);
    }
}
