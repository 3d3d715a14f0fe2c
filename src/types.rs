// =============================================================================
// Shared types for the auto-trade flow
// =============================================================================

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::TradeError;

pub const DEFAULT_TP_PCT: i64 = 25;
pub const DEFAULT_SL_PCT: i64 = -20;
pub const DEFAULT_BUY_USD: f64 = 1.0;

/// Raw `POST /auto` body, exactly as sent by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoTradeRequest {
    #[serde(default)]
    pub ca: Option<String>,
    /// Informational only; the buy is sized by `buy_amount_eth`.
    #[serde(default)]
    pub buy_usd: Option<f64>,
    #[serde(default)]
    pub tp: Option<f64>,
    #[serde(default)]
    pub sl: Option<f64>,
}

/// A validated request.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeParams {
    pub token: Address,
    pub buy_usd: f64,
    pub tp_pct: i64,
    pub sl_pct: i64,
}

impl AutoTradeRequest {
    pub fn validate(&self) -> Result<TradeParams, TradeError> {
        let ca = self
            .ca
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TradeError::Validation("ca missing".to_string()))?;
        let token: Address = ca
            .parse()
            .map_err(|e| TradeError::Validation(format!("ca invalid: {e}")))?;

        let buy_usd = self.buy_usd.unwrap_or(DEFAULT_BUY_USD);
        if !buy_usd.is_finite() {
            return Err(TradeError::Validation("buyUsd must be a finite number".into()));
        }

        Ok(TradeParams {
            token,
            buy_usd,
            tp_pct: percent("tp", self.tp, DEFAULT_TP_PCT)?,
            sl_pct: percent("sl", self.sl, DEFAULT_SL_PCT)?,
        })
    }
}

/// Percent offsets must be whole numbers and must not push the multiplier
/// `100 + pct` below zero.
fn percent(field: &str, value: Option<f64>, default: i64) -> Result<i64, TradeError> {
    let Some(v) = value else {
        return Ok(default);
    };
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(TradeError::Validation(format!(
            "{field} must be a whole percent, got {v}"
        )));
    }
    if v < -100.0 || v > 1_000_000.0 {
        return Err(TradeError::Validation(format!(
            "{field} out of range: {v}"
        )));
    }
    Ok(v as i64)
}

/// Why the Watching loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    /// Window elapsed, position left unsold.
    TimedOut,
    /// Window elapsed, position sold at market.
    Liquidated,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "take_profit"),
            Self::StopLoss => write!(f, "stop_loss"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::Liquidated => write!(f, "liquidated"),
        }
    }
}

/// Result of a completed flow (every variant is a success response).
#[derive(Debug, Clone, PartialEq)]
pub struct TradeOutcome {
    pub reason: ExitReason,
    pub entry: U256,
    /// Quote that triggered the exit; `None` on timeout.
    pub exit_quote: Option<U256>,
    pub ticks: u32,
}
