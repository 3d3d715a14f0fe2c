// =============================================================================
// Position Engine — one open trade and its fixed exit thresholds
// =============================================================================
//
// Life-cycle:
//   Buying  ->  Watching  ->  Exiting  ->  Closed
//   Buying  ->  Failed
//   Watching -> TimedOut      (left unsold unless liquidation is enabled)
//   Watching -> Cancelled     (shutdown / client went away)
//
// A `Position` is created once the buy receipt confirms and the entry quote
// is known. Its thresholds never change afterwards.
//
// All amounts are integers in the token's smallest unit. Thresholds are
// `entry * (100 + pct) / 100` with floor division.
// =============================================================================

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};

use crate::error::TradeError;
use crate::types::ExitReason;

/// Where a single flow currently is. Used for logging transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Buying,
    Watching,
    Exiting,
    Closed,
    Failed,
    TimedOut,
    Cancelled,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buying => write!(f, "Buying"),
            Self::Watching => write!(f, "Watching"),
            Self::Exiting => write!(f, "Exiting"),
            Self::Closed => write!(f, "Closed"),
            Self::Failed => write!(f, "Failed"),
            Self::TimedOut => write!(f, "TimedOut"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// `entry * (100 + pct) / 100`, truncating.
pub fn threshold(entry: U256, pct: i64) -> Result<U256, TradeError> {
    let multiplier = 100i64
        .checked_add(pct)
        .filter(|m| *m >= 0)
        .ok_or_else(|| TradeError::Validation(format!("percent offset {pct} out of range")))?;

    entry
        .checked_mul(U256::from(multiplier as u64))
        .map(|scaled| scaled / U256::from(100u64))
        .ok_or_else(|| TradeError::Validation("threshold overflows 256 bits".to_string()))
}

#[derive(Debug, Clone)]
pub struct Position {
    pub token: Address,
    /// Quoted token output for the fixed buy input, taken right after the buy.
    /// This is also the amount sold on exit.
    pub entry: U256,
    pub take_profit: U256,
    pub stop_loss: U256,
    pub started_at: DateTime<Utc>,
}

impl Position {
    pub fn open(token: Address, entry: U256, tp_pct: i64, sl_pct: i64) -> Result<Self, TradeError> {
        Ok(Self {
            token,
            entry,
            take_profit: threshold(entry, tp_pct)?,
            stop_loss: threshold(entry, sl_pct)?,
            started_at: Utc::now(),
        })
    }

    /// Both bounds are inclusive. Take-profit wins when both hold.
    pub fn check(&self, quote: U256) -> Option<ExitReason> {
        if quote >= self.take_profit {
            Some(ExitReason::TakeProfit)
        } else if quote <= self.stop_loss {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }
}
