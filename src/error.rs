// =============================================================================
// Trade Errors — one taxonomy for a single /auto flow
// =============================================================================
//
// Every failure inside a flow is caught once at the top (see `execution.rs`)
// and mapped to a JSON error body. Nothing is retried.
//
// `PositionOpen` wraps any failure that happens after the buy receipt was
// confirmed. Those are the cases where tokens are held and nobody is watching
// them any more.
// =============================================================================

use alloy::primitives::{Address, U256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradeError {
    /// Malformed request body or per-request credential.
    #[error("{0}")]
    Validation(String),

    /// Network failure or revert on a read call against the RPC endpoint.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// A submitted transaction reverted, was rejected, or never confirmed.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The buy confirmed but the position could not be exited. `amount` is
    /// the entry quote when it was known.
    #[error("position in {token} left open: {source}")]
    PositionOpen {
        token: Address,
        amount: Option<U256>,
        #[source]
        source: Box<TradeError>,
    },

    /// The flow was cancelled before any funds were spent.
    #[error("trade cancelled")]
    Cancelled,
}

impl TradeError {
    /// Machine-readable label sent back as `kind` in error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Rpc(_) => "rpc",
            Self::Transaction(_) => "transaction",
            Self::PositionOpen { .. } => "position_open",
            Self::Cancelled => "cancelled",
        }
    }

    /// Wrap a post-buy failure so the caller can tell funds are at risk.
    /// Already-wrapped errors are returned untouched.
    pub fn position_open(self, token: Address, amount: Option<U256>) -> Self {
        match self {
            Self::PositionOpen { .. } => self,
            other => Self::PositionOpen {
                token,
                amount,
                source: Box::new(other),
            },
        }
    }

    pub fn funds_at_risk(&self) -> bool {
        matches!(self, Self::PositionOpen { .. })
    }

    /// True when the flow stopped because its token was cancelled, whether
    /// or not a position was already open at that point.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::PositionOpen { source, .. } => source.is_cancellation(),
            _ => false,
        }
    }
}
