//! Scalar units used throughout the engine.
//!
//! All prices are integral ticks: a signed number of minimum price
//! increments. There is no fractional or floating-point representation
//! anywhere in the engine; tick-size scaling is the caller's concern.

/// Price in signed integral ticks.
///
/// Zero is reserved as "no price" in submission inputs; validated orders
/// never carry a zero limit or stop price.
pub type Price = i64;

/// Quantity in whole units.
pub type Quantity = u64;

/// Opaque order identifier, chosen by the caller, unique for the lifetime
/// of an engine instance.
pub type OrderId = u64;

/// Monotonic sequence number (arrival order, trade order).
pub type Seq = u64;
