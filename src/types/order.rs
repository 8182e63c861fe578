//! Order model: identity, lifecycle state machine, fill accounting.
//!
//! ## Lifecycle
//!
//! ```text
//! New ──(trigger)──► Active ◄──► PartiallyFilled
//!  │                   │               │
//!  │                   ├── Filled ◄────┤
//!  └───────────────────┴── Cancelled ◄─┘
//! ```
//!
//! Market and limit orders are `Active` from admission. Stop and stop-limit
//! orders start `New` and become `Active` only when their trigger fires.
//! `Filled`, `Cancelled`, and `Rejected` are terminal.
//!
//! ## Order kinds
//!
//! The kind is a tagged variant carrying exactly the prices that kind
//! needs: market orders have none, limit orders a limit price, stop orders
//! a stop price, stop-limits both. A triggered stop behaves as its
//! post-trigger kind (market or limit) for the rest of its life.

use crate::types::error::{InvalidOrderReason, RejectReason};
use crate::types::units::{OrderId, Price, Quantity, Seq};

// ============================================================================
// Side
// ============================================================================

/// Order side: Buy (bid) or Sell (ask).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

// ============================================================================
// Time in force
// ============================================================================

/// How long an order may rest on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeInForce {
    /// Rest any residual quantity until matched or cancelled.
    #[default]
    GoodTillCancel,
    /// Trade what crosses now, discard the rest; never rests.
    FillAndKill,
}

// ============================================================================
// Order kind
// ============================================================================

/// Order kind with per-variant pricing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    /// Execute immediately at the best available price. Never rests.
    Market,
    /// Execute at `limit` or better; residual rests.
    Limit { limit: Price },
    /// Held until the last trade price crosses `stop`, then a market order.
    Stop { stop: Price },
    /// Held until the last trade price crosses `stop`, then a limit order
    /// at `limit`.
    StopLimit { limit: Price, stop: Price },
}

impl OrderKind {
    /// Limit price, for the kinds that carry one.
    #[inline]
    pub fn limit_price(&self) -> Option<Price> {
        match *self {
            OrderKind::Limit { limit } | OrderKind::StopLimit { limit, .. } => Some(limit),
            _ => None,
        }
    }

    /// Stop price, for the kinds that carry one.
    #[inline]
    pub fn stop_price(&self) -> Option<Price> {
        match *self {
            OrderKind::Stop { stop } | OrderKind::StopLimit { stop, .. } => Some(stop),
            _ => None,
        }
    }

    /// True for Stop and StopLimit.
    #[inline]
    pub fn is_stop(&self) -> bool {
        matches!(self, OrderKind::Stop { .. } | OrderKind::StopLimit { .. })
    }
}

// ============================================================================
// Order status
// ============================================================================

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Admitted but not yet eligible to trade (untriggered stop).
    New,
    /// Eligible to trade; no fills yet.
    Active,
    /// Some quantity filled, some remaining.
    PartiallyFilled,
    /// Fully filled. Terminal.
    Filled,
    /// Cancelled with remaining quantity. Terminal.
    Cancelled,
    /// Failed validation. Terminal; never entered the book.
    Rejected,
}

// ============================================================================
// OrderSpec (submission input)
// ============================================================================

/// Caller-supplied order submission.
///
/// # Example
///
/// ```
/// use tickmatch::{OrderSpec, Side, TimeInForce};
///
/// let spec = OrderSpec::limit(1, Side::Buy, 10, 95).with_tif(TimeInForce::FillAndKill);
/// assert!(spec.validate().is_ok());
///
/// // Limit orders must carry a non-zero limit price.
/// assert!(OrderSpec::limit(2, Side::Buy, 10, 0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSpec {
    pub order_id: OrderId,
    pub side: Side,
    pub kind: OrderKind,
    pub tif: TimeInForce,
    pub qty: Quantity,
}

impl OrderSpec {
    /// A market order. Market orders always carry fill-and-kill semantics.
    pub fn market(order_id: OrderId, side: Side, qty: Quantity) -> Self {
        Self {
            order_id,
            side,
            kind: OrderKind::Market,
            tif: TimeInForce::FillAndKill,
            qty,
        }
    }

    /// A good-till-cancel limit order at `limit`.
    pub fn limit(order_id: OrderId, side: Side, qty: Quantity, limit: Price) -> Self {
        Self {
            order_id,
            side,
            kind: OrderKind::Limit { limit },
            tif: TimeInForce::GoodTillCancel,
            qty,
        }
    }

    /// A stop order that becomes a market order at `stop`.
    pub fn stop(order_id: OrderId, side: Side, qty: Quantity, stop: Price) -> Self {
        Self {
            order_id,
            side,
            kind: OrderKind::Stop { stop },
            tif: TimeInForce::GoodTillCancel,
            qty,
        }
    }

    /// A stop-limit order that becomes a limit order at `limit` once the
    /// last trade price crosses `stop`.
    pub fn stop_limit(
        order_id: OrderId,
        side: Side,
        qty: Quantity,
        limit: Price,
        stop: Price,
    ) -> Self {
        Self {
            order_id,
            side,
            kind: OrderKind::StopLimit { limit, stop },
            tif: TimeInForce::GoodTillCancel,
            qty,
        }
    }

    /// Override the time in force.
    pub fn with_tif(mut self, tif: TimeInForce) -> Self {
        self.tif = tif;
        self
    }

    /// Admission validation: non-zero quantity, and a non-zero price for
    /// every price the kind requires.
    pub fn validate(&self) -> Result<(), InvalidOrderReason> {
        if self.qty == 0 {
            return Err(InvalidOrderReason::ZeroQuantity);
        }
        if matches!(self.kind.limit_price(), Some(0)) {
            return Err(InvalidOrderReason::MissingLimitPrice);
        }
        if matches!(self.kind.stop_price(), Some(0)) {
            return Err(InvalidOrderReason::MissingStopPrice);
        }
        Ok(())
    }
}

// ============================================================================
// Order
// ============================================================================

/// A single order and its fill accounting.
///
/// Invariant: `filled_qty <= initial_qty` at all times; `Filled` status is
/// equivalent to `filled_qty == initial_qty` with `initial_qty > 0`.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    side: Side,
    kind: OrderKind,
    tif: TimeInForce,
    status: OrderStatus,
    initial_qty: Quantity,
    filled_qty: Quantity,
    triggered: bool,
    arrival_seq: Seq,
}

impl Order {
    /// Build an order from a submission.
    ///
    /// A spec that fails [`OrderSpec::validate`] produces an order in
    /// `Rejected` status; the engine refuses to admit such an order.
    /// Market and limit orders start `Active`; stop kinds start `New`.
    pub fn new(spec: OrderSpec, arrival_seq: Seq) -> Self {
        let status = if spec.validate().is_err() {
            OrderStatus::Rejected
        } else if spec.kind.is_stop() {
            OrderStatus::New
        } else {
            OrderStatus::Active
        };
        Self {
            id: spec.order_id,
            side: spec.side,
            kind: spec.kind,
            tif: spec.tif,
            status,
            initial_qty: spec.qty,
            filled_qty: 0,
            triggered: false,
            arrival_seq,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    #[inline]
    pub fn tif(&self) -> TimeInForce {
        self.tif
    }

    #[inline]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    #[inline]
    pub fn initial_qty(&self) -> Quantity {
        self.initial_qty
    }

    #[inline]
    pub fn filled_qty(&self) -> Quantity {
        self.filled_qty
    }

    #[inline]
    pub fn remaining_qty(&self) -> Quantity {
        self.initial_qty - self.filled_qty
    }

    #[inline]
    pub fn arrival_seq(&self) -> Seq {
        self.arrival_seq
    }

    #[inline]
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Eligible to fill: `Active` or `PartiallyFilled`.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.status, OrderStatus::Active | OrderStatus::PartiallyFilled)
    }

    /// `Filled`, `Cancelled`, or `Rejected`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    /// An untriggered stop or stop-limit, held by the stop manager.
    #[inline]
    pub fn is_pending_trigger(&self) -> bool {
        self.kind.is_stop() && !self.triggered && self.status == OrderStatus::New
    }

    /// Price-unconstrained when matching: market orders and triggered
    /// stops.
    #[inline]
    pub fn is_market_like(&self) -> bool {
        matches!(self.kind, OrderKind::Market | OrderKind::Stop { .. })
    }

    /// The limit constraint this order matches under, if any. `None` means
    /// any price is acceptable.
    #[inline]
    pub fn effective_limit(&self) -> Option<Price> {
        self.kind.limit_price()
    }

    /// Whether residual quantity is discarded after matching rather than
    /// rested. True for fill-and-kill and for every market-like order.
    #[inline]
    pub fn kills_residual(&self) -> bool {
        self.tif == TimeInForce::FillAndKill || self.is_market_like()
    }

    /// Whether this order may trade against a resting order at
    /// `resting_price`.
    #[inline]
    pub fn crosses(&self, resting_price: Price) -> bool {
        match self.effective_limit() {
            None => true,
            Some(limit) => match self.side {
                Side::Buy => resting_price <= limit,
                Side::Sell => resting_price >= limit,
            },
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle operations
    // ------------------------------------------------------------------

    /// Fill `qty` units. Fails (no state change) if the order is not
    /// active or `qty` exceeds the remaining quantity.
    pub fn fill(&mut self, qty: Quantity) -> bool {
        if !self.is_active() {
            return false;
        }
        if qty > self.remaining_qty() {
            return false;
        }
        self.filled_qty += qty;
        self.status = if self.remaining_qty() == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        true
    }

    /// Cancel the order. Idempotent; a no-op on terminal orders. An
    /// untriggered stop goes `New -> Cancelled` directly.
    pub fn cancel(&mut self) {
        if !self.is_terminal() {
            self.status = OrderStatus::Cancelled;
        }
    }

    /// Arm a stop order. Untriggered stops become `Active`.
    pub fn mark_triggered(&mut self) {
        self.triggered = true;
        if self.status == OrderStatus::New {
            self.status = OrderStatus::Active;
        }
    }

    /// Trigger predicate against the last trade price: a buy stop fires at
    /// or above its stop price, a sell stop at or below.
    pub fn should_trigger(&self, last_trade_price: Price) -> bool {
        if self.triggered {
            return false;
        }
        let Some(stop) = self.kind.stop_price() else {
            return false;
        };
        match self.side {
            Side::Buy => last_trade_price >= stop,
            Side::Sell => last_trade_price <= stop,
        }
    }

    /// Apply a modification after the cancel leg of cancel-then-resubmit.
    ///
    /// Validates the new values against this order's kind, then updates
    /// quantity and prices, revives the status, and stamps the fresh
    /// arrival sequence. On failure the order is left as the caller had it
    /// (cancelled). Side and kind never change.
    pub(crate) fn resubmit(
        &mut self,
        new_qty: Quantity,
        new_limit: Price,
        new_stop: Option<Price>,
        arrival_seq: Seq,
    ) -> Result<(), RejectReason> {
        if new_qty == 0 {
            return Err(RejectReason::InvalidOrder(InvalidOrderReason::ZeroQuantity));
        }
        if new_qty < self.filled_qty {
            return Err(RejectReason::IllegalModify);
        }
        match &mut self.kind {
            OrderKind::Market => {}
            OrderKind::Limit { limit } => {
                if new_limit == 0 {
                    return Err(RejectReason::InvalidOrder(
                        InvalidOrderReason::MissingLimitPrice,
                    ));
                }
                *limit = new_limit;
            }
            OrderKind::Stop { stop } => {
                let resolved = new_stop.unwrap_or(*stop);
                if resolved == 0 {
                    return Err(RejectReason::InvalidOrder(
                        InvalidOrderReason::MissingStopPrice,
                    ));
                }
                *stop = resolved;
            }
            OrderKind::StopLimit { limit, stop } => {
                if new_limit == 0 {
                    return Err(RejectReason::InvalidOrder(
                        InvalidOrderReason::MissingLimitPrice,
                    ));
                }
                let resolved = new_stop.unwrap_or(*stop);
                if resolved == 0 {
                    return Err(RejectReason::InvalidOrder(
                        InvalidOrderReason::MissingStopPrice,
                    ));
                }
                *limit = new_limit;
                *stop = resolved;
            }
        }
        self.initial_qty = new_qty;
        self.arrival_seq = arrival_seq;
        self.status = if self.kind.is_stop() && !self.triggered {
            OrderStatus::New
        } else if self.filled_qty > 0 {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Active
        };
        Ok(())
    }

    /// Point-in-time snapshot for callers.
    pub fn view(&self) -> OrderView {
        OrderView {
            order_id: self.id,
            side: self.side,
            kind: self.kind,
            tif: self.tif,
            status: self.status,
            initial_qty: self.initial_qty,
            filled_qty: self.filled_qty,
            remaining_qty: self.remaining_qty(),
            triggered: self.triggered,
            arrival_seq: self.arrival_seq,
        }
    }
}

// ============================================================================
// OrderView (query output)
// ============================================================================

/// Read-only snapshot of an order, returned by engine queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderView {
    pub order_id: OrderId,
    pub side: Side,
    pub kind: OrderKind,
    pub tif: TimeInForce,
    pub status: OrderStatus,
    pub initial_qty: Quantity,
    pub filled_qty: Quantity,
    pub remaining_qty: Quantity,
    pub triggered: bool,
    pub arrival_seq: Seq,
}

// ============================================================================
// Unit Tests
// ============================================================================
