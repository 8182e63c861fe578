//! # tickmatch
//!
//! Single-symbol, in-memory limit order book matching engine.
//!
//! ## Architecture
//!
//! - **Types**: order model, trade records, reject taxonomy
//! - **OrderBook**: slab-arena book index with price-time priority levels
//! - **Engine**: the matcher and the stop-trigger cascade
//!
//! ## Design principles
//!
//! 1. **Integral ticks**: every price is a signed whole number of ticks;
//!    no floating point anywhere.
//! 2. **Determinism**: identical submission sequences produce identical
//!    trades and an identical [`MatchingEngine::state_digest`].
//! 3. **Pre-allocated memory**: slab storage for O(1) order operations.
//! 4. **Synchronous matching**: every submission settles completely,
//!    stop cascade included, before the call returns.
//!
//! ## Example
//!
//! ```
//! use tickmatch::{MatchingEngine, OrderSpec, Side};
//!
//! let mut engine = MatchingEngine::new();
//!
//! engine.submit(OrderSpec::limit(1, Side::Buy, 5, 100)).unwrap();
//! engine.submit(OrderSpec::limit(2, Side::Sell, 3, 103)).unwrap();
//!
//! // A crossing buy takes the ask and rests its residual.
//! let trades = engine.submit(OrderSpec::limit(3, Side::Buy, 4, 104)).unwrap();
//! assert_eq!(trades.len(), 1);
//! assert_eq!((trades[0].price, trades[0].quantity), (103, 3));
//! assert_eq!(engine.best_bid(), Some(104));
//! ```

/// Core data types: orders, trades, reject reasons, scalar units.
pub mod types;

/// Book index: slab arena, price levels, sorted sides.
pub mod orderbook;

/// Matching engine and stop manager.
pub mod engine;

pub use engine::MatchingEngine;
pub use orderbook::{Book, OrderNode, PriceLevel};
pub use types::{
    InvalidOrderReason, Order, OrderId, OrderKind, OrderSpec, OrderStatus, OrderView, Price,
    Quantity, RejectReason, Seq, Side, TimeInForce, Trade,
};
