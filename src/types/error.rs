//! Reject taxonomy for engine operations.
//!
//! Every rejection is surfaced synchronously to the caller of the
//! operation that caused it; none is fatal to the engine and none mutates
//! book state beyond what the operation's contract states (modify cancels
//! before validating the resubmission).

use thiserror::Error;

use crate::types::units::OrderId;

/// Why a submission, cancel, or modify was refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Submission reused an id the engine already knows.
    #[error("duplicate order id {0}")]
    DuplicateOrderId(OrderId),

    /// The order failed admission validation.
    #[error("invalid order: {0}")]
    InvalidOrder(#[from] InvalidOrderReason),

    /// A fill-and-kill (or market) order found no crossable liquidity at
    /// submission.
    #[error("fill-and-kill order cannot cross")]
    UnfillableFillAndKill,

    /// Cancel or modify referenced an id the engine does not hold.
    #[error("unknown order id {0}")]
    UnknownOrderId(OrderId),

    /// Modify targeted an inactive order or would reduce quantity below
    /// the already-filled amount.
    #[error("illegal modify")]
    IllegalModify,
}

/// Validation failures detected at admission.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidOrderReason {
    #[error("quantity must be non-zero")]
    ZeroQuantity,
    #[error("limit price required for this order kind")]
    MissingLimitPrice,
    #[error("stop price required for this order kind")]
    MissingStopPrice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            RejectReason::DuplicateOrderId(42).to_string(),
            "duplicate order id 42"
        );
        assert_eq!(
            RejectReason::from(InvalidOrderReason::ZeroQuantity).to_string(),
            "invalid order: quantity must be non-zero"
        );
        assert_eq!(
            RejectReason::UnknownOrderId(7).to_string(),
            "unknown order id 7"
        );
    }

    #[test]
    fn invalid_order_converts() {
        let reason: RejectReason = InvalidOrderReason::MissingStopPrice.into();
        assert_eq!(
            reason,
            RejectReason::InvalidOrder(InvalidOrderReason::MissingStopPrice)
        );
    }
}
