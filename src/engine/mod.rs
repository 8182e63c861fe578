//! Matching engine: crossing algorithm, trade emission, stop cascade.
//!
//! ## Design principles
//!
//! 1. **Determinism**: the same submission sequence always produces the
//!    same trades and the same final state.
//! 2. **Price-time priority**: best price first, FIFO within a level.
//! 3. **Synchronous execution**: a submission completes, stop cascade
//!    included, before the call returns; no async, no I/O.
//! 4. **One consistency domain**: the book, the stop queue, and the last
//!    trade price are mutated only behind `&mut MatchingEngine`.

mod matcher;
mod stops;

pub use matcher::MatchingEngine;
pub use stops::StopQueue;
