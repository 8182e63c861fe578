//! The matching engine: admission, crossing, and the stop cascade.
//!
//! ## Submission flow
//!
//! 1. Screen: duplicate id, validation, unfillable fill-and-kill.
//! 2. Classify: market/limit orders go straight to the matcher; stop
//!    kinds go to the stop queue unless the last trade price already
//!    fires their trigger.
//! 3. Match: walk the opposite side best-price-first, FIFO within each
//!    level, filling both orders and emitting a trade at the resting
//!    order's price.
//! 4. Dispose: residual quantity rests (good-till-cancel limit) or is
//!    discarded (fill-and-kill, market).
//! 5. Cascade: each batch of trades moves the last trade price; the stop
//!    queue is swept and every fired order re-injected, repeating until a
//!    sweep extracts nothing.
//!
//! The cascade is an explicit outer loop, so at most one matching pass is
//! in flight per submission and a pass never re-enters itself.

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::engine::StopQueue;
use crate::orderbook::Book;
use crate::types::{
    Order, OrderId, OrderKind, OrderSpec, OrderView, Price, Quantity, RejectReason, Seq, Side,
    TimeInForce, Trade,
};

/// Single-symbol matching engine with price-time priority.
///
/// The engine owns the book, the stop queue, and the last trade price as
/// one consistency domain; every operation takes `&mut self` and
/// completes synchronously, so a submission's full trade sequence
/// (including any stop cascade) is visible before the next operation
/// begins.
///
/// # Example
///
/// ```
/// use tickmatch::{MatchingEngine, OrderSpec, Side};
///
/// let mut engine = MatchingEngine::new();
/// engine.submit(OrderSpec::limit(1, Side::Sell, 3, 103)).unwrap();
/// engine.submit(OrderSpec::limit(2, Side::Sell, 8, 105)).unwrap();
///
/// let trades = engine.submit(OrderSpec::market(3, Side::Buy, 2)).unwrap();
/// assert_eq!(trades.len(), 1);
/// assert_eq!(trades[0].price, 103);
/// assert_eq!(engine.volume_at(Side::Sell, 103), 1);
/// ```
#[derive(Debug)]
pub struct MatchingEngine {
    book: Book,
    stops: StopQueue,
    last_trade_price: Option<Price>,
    next_arrival_seq: Seq,
    next_trade_seq: Seq,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            book: Book::new(),
            stops: StopQueue::new(),
            last_trade_price: None,
            next_arrival_seq: 1,
            next_trade_seq: 1,
        }
    }

    /// Pre-allocate storage for `orders` total orders.
    pub fn with_capacity(orders: usize) -> Self {
        Self {
            book: Book::with_capacity(orders),
            ..Self::new()
        }
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Submit an order, returning every trade it caused, in execution
    /// order. Trades from stop orders that its executions triggered are
    /// part of the same sequence.
    ///
    /// Rejected submissions leave no trace: the id stays unknown and the
    /// book is untouched.
    pub fn submit(&mut self, spec: OrderSpec) -> Result<Vec<Trade>, RejectReason> {
        if self.book.contains(spec.order_id) {
            debug!(order_id = spec.order_id, "submit rejected: duplicate id");
            return Err(RejectReason::DuplicateOrderId(spec.order_id));
        }
        if let Err(reason) = spec.validate() {
            debug!(order_id = spec.order_id, %reason, "submit rejected: invalid");
            return Err(RejectReason::InvalidOrder(reason));
        }
        // Market orders carry fill-and-kill semantics whatever their tif.
        let fill_and_kill =
            spec.tif == TimeInForce::FillAndKill || matches!(spec.kind, OrderKind::Market);
        if !spec.kind.is_stop()
            && fill_and_kill
            && !self.can_cross(spec.side, spec.kind.limit_price())
        {
            debug!(order_id = spec.order_id, "submit rejected: unfillable fill-and-kill");
            return Err(RejectReason::UnfillableFillAndKill);
        }

        let seq = self.next_arrival();
        let key = self.book.admit(Order::new(spec, seq));

        if spec.kind.is_stop() {
            match self.last_trade_price {
                Some(last) if self.book.order(key).should_trigger(last) => {
                    self.book.node_mut(key).order.mark_triggered();
                    debug!(order_id = spec.order_id, last, "stop triggered at submission");
                    Ok(self.run_session(key))
                }
                _ => {
                    self.stops.push(key);
                    trace!(order_id = spec.order_id, "stop held pending trigger");
                    Ok(Vec::new())
                }
            }
        } else {
            Ok(self.run_session(key))
        }
    }

    /// Cancel an order. Returns true iff the id was known and the order
    /// was resting in the book or held as an untriggered stop. Never
    /// produces trades.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let Some(key) = self.book.key_of(order_id) else {
            trace!(order_id, "cancel: unknown id");
            return false;
        };
        let order = self.book.order(key);
        if order.is_pending_trigger() {
            let held = self.stops.remove(key);
            debug_assert!(held, "pending stop missing from stop queue");
            self.book.node_mut(key).order.cancel();
            debug!(order_id, "cancelled pending stop");
            true
        } else if order.is_active() {
            self.book.unlink(key);
            self.book.node_mut(key).order.cancel();
            debug!(order_id, "cancelled resting order");
            true
        } else {
            trace!(order_id, "cancel: order not open");
            false
        }
    }

    /// Modify an order: cancel-then-resubmit under the same id and kind,
    /// with a fresh arrival sequence, so time priority is lost. `new_stop`
    /// of `None` keeps the stored stop price. The resubmission may cross
    /// immediately; any trades (and cascaded stop trades) are returned.
    ///
    /// The cancel leg runs before the resubmission is validated, so a
    /// failed modify leaves the order cancelled and returns the reason.
    pub fn modify(
        &mut self,
        order_id: OrderId,
        new_qty: Quantity,
        new_limit: Price,
        new_stop: Option<Price>,
    ) -> Result<Vec<Trade>, RejectReason> {
        let Some(key) = self.book.key_of(order_id) else {
            return Err(RejectReason::UnknownOrderId(order_id));
        };
        let order = self.book.order(key);
        if !order.is_active() && !order.is_pending_trigger() {
            return Err(RejectReason::IllegalModify);
        }

        // Cancel leg.
        if order.is_pending_trigger() {
            let held = self.stops.remove(key);
            debug_assert!(held, "pending stop missing from stop queue");
        } else {
            self.book.unlink(key);
        }
        self.book.node_mut(key).order.cancel();

        // Resubmit leg; a validation failure leaves the order cancelled.
        let seq = self.next_arrival();
        self.book
            .node_mut(key)
            .order
            .resubmit(new_qty, new_limit, new_stop, seq)?;
        debug!(order_id, new_qty, "modified, priority reset");

        let order = self.book.order(key);
        if order.is_pending_trigger() {
            match self.last_trade_price {
                Some(last) if order.should_trigger(last) => {
                    self.book.node_mut(key).order.mark_triggered();
                    debug!(order_id, last, "stop triggered by modify");
                    Ok(self.run_session(key))
                }
                _ => {
                    self.stops.push(key);
                    Ok(Vec::new())
                }
            }
        } else {
            Ok(self.run_session(key))
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Highest resting buy price.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.book.best_bid()
    }

    /// Lowest resting sell price.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.book.best_ask()
    }

    /// Aggregate resting quantity at `(side, price)`.
    #[inline]
    pub fn volume_at(&self, side: Side, price: Price) -> Quantity {
        self.book.volume_at(side, price)
    }

    /// Snapshot of an order by id, at any lifecycle stage.
    pub fn get_order(&self, order_id: OrderId) -> Option<OrderView> {
        self.book
            .key_of(order_id)
            .map(|key| self.book.order(key).view())
    }

    /// Count of orders the engine knows, any status. Submissions rejected
    /// before admission are never counted.
    #[inline]
    pub fn size(&self) -> usize {
        self.book.known_orders()
    }

    /// `(price, aggregate quantity)` per level from best outward.
    pub fn depth(&self, side: Side, max_levels: usize) -> Vec<(Price, Quantity)> {
        self.book.depth(side, max_levels)
    }

    /// Price of the most recent trade, if any.
    #[inline]
    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    /// True when nothing rests on either side of the book.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.book.is_empty()
    }

    /// Number of resting orders on `side`.
    #[inline]
    pub fn open_count(&self, side: Side) -> usize {
        self.book.open_count(side)
    }

    /// Number of stop orders still waiting for their trigger.
    #[inline]
    pub fn pending_stop_count(&self) -> usize {
        self.stops.len()
    }

    /// SHA-256 digest of the engine state: both sides best-outward with
    /// FIFO order ids and remainders, held stops, last trade price, and
    /// sequence counters. Two engines fed the same submissions digest
    /// identically.
    pub fn state_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for (tag, side) in [(0u8, Side::Buy), (1u8, Side::Sell)] {
            hasher.update([tag]);
            for level in self.book.levels(side) {
                hasher.update(level.price.to_le_bytes());
                for key in level.keys_fifo(self.book.arena()) {
                    let order = self.book.order(key);
                    hasher.update(order.id().to_le_bytes());
                    hasher.update(order.remaining_qty().to_le_bytes());
                }
            }
        }
        hasher.update([2u8]);
        for key in self.stops.keys() {
            let order = self.book.order(key);
            hasher.update(order.id().to_le_bytes());
            hasher.update(order.remaining_qty().to_le_bytes());
        }
        hasher.update([self.last_trade_price.is_some() as u8]);
        hasher.update(self.last_trade_price.unwrap_or(0).to_le_bytes());
        hasher.update(self.next_arrival_seq.to_le_bytes());
        hasher.update(self.next_trade_seq.to_le_bytes());
        hasher.finalize().into()
    }

    // ------------------------------------------------------------------
    // Matching internals
    // ------------------------------------------------------------------

    fn next_arrival(&mut self) -> Seq {
        let seq = self.next_arrival_seq;
        self.next_arrival_seq += 1;
        seq
    }

    fn next_trade(&mut self) -> Seq {
        let seq = self.next_trade_seq;
        self.next_trade_seq += 1;
        seq
    }

    /// Whether an order on `side` with `limit` (`None` = market) could
    /// trade against the current opposite best.
    fn can_cross(&self, side: Side, limit: Option<Price>) -> bool {
        let Some((best, _)) = self.book.front_of_best(side) else {
            return false;
        };
        match limit {
            None => true,
            Some(limit) => match side {
                Side::Buy => best <= limit,
                Side::Sell => best >= limit,
            },
        }
    }

    /// Match the admitted order at `key`, dispose of its residual, then
    /// sweep the stop queue to a fixed point, re-injecting every fired
    /// stop. Returns all resulting trades in execution order.
    fn run_session(&mut self, key: usize) -> Vec<Trade> {
        let mut trades = self.match_incoming(key);
        self.settle_last_price(&trades);
        loop {
            let Some(last) = self.last_trade_price else {
                break;
            };
            let fired = self.stops.sweep(last, &mut self.book);
            if fired.is_empty() {
                break;
            }
            for stop_key in fired {
                debug!(
                    order_id = self.book.order(stop_key).id(),
                    last, "stop triggered"
                );
                let batch = self.match_incoming(stop_key);
                self.settle_last_price(&batch);
                trades.extend(batch);
            }
        }
        trades
    }

    fn settle_last_price(&mut self, trades: &[Trade]) {
        if let Some(trade) = trades.last() {
            self.last_trade_price = Some(trade.price);
        }
    }

    /// One matching pass for the order at `key` against the opposite
    /// side, best level first, FIFO within a level, then residual
    /// disposition. The incoming order is not linked while it matches.
    fn match_incoming(&mut self, key: usize) -> Vec<Trade> {
        let mut trades = Vec::new();
        let (taker_side, taker_id) = {
            let order = self.book.order(key);
            (order.side(), order.id())
        };

        loop {
            if self.book.order(key).remaining_qty() == 0 {
                break;
            }
            let Some((level_price, resting_key)) = self.book.front_of_best(taker_side) else {
                break;
            };
            if !self.book.order(key).crosses(level_price) {
                break;
            }

            let traded = self
                .book
                .order(key)
                .remaining_qty()
                .min(self.book.order(resting_key).remaining_qty());

            // A failed fill here means the matcher's bookkeeping is
            // corrupt, not a caller error.
            assert!(
                self.book.node_mut(resting_key).order.fill(traded),
                "resting fill exceeds remaining quantity"
            );
            assert!(
                self.book.node_mut(key).order.fill(traded),
                "incoming fill exceeds remaining quantity"
            );
            self.book
                .reduce_level(taker_side.opposite(), level_price, traded);

            let resting_id = self.book.order(resting_key).id();
            let (buy_id, sell_id) = match taker_side {
                Side::Buy => (taker_id, resting_id),
                Side::Sell => (resting_id, taker_id),
            };
            let seq = self.next_trade();
            trace!(buy_id, sell_id, qty = traded, price = level_price, seq, "trade");
            trades.push(Trade::new(buy_id, sell_id, traded, level_price, seq));

            if self.book.order(resting_key).remaining_qty() == 0 {
                self.book.unlink(resting_key);
            }
        }

        // Residual disposition.
        let order = self.book.order(key);
        if order.remaining_qty() == 0 {
            // Filled; nothing rests.
        } else if order.kills_residual() {
            self.book.node_mut(key).order.cancel();
            trace!(order_id = taker_id, "residual discarded");
        } else {
            self.book.link(key);
        }
        trades
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
