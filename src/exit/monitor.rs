// =============================================================================
// Position Monitor — buy, watch the quote, exit on TP / SL
// =============================================================================
//
// One monitor owns exactly one position for the lifetime of one request:
//
//   1. Buying    — swap the fixed native amount for the token, wait for the
//                  receipt, then record the entry quote.
//   2. Watching  — every `poll_interval`, quote the same input again and
//                  compare against the fixed thresholds. TP is checked first.
//   3. Exiting   — notify, then sell the full entry amount once. A failed
//                  sell is not retried.
//
// If neither threshold is crossed within `watch_timeout` the loop stops.
// By default the position is then left unsold and the flow still succeeds.
//
// Ticks are strictly sequential. Cancellation is observed at every sleep and
// every quote; the buy itself is never interrupted once submitted.
// =============================================================================

use std::time::Duration;

use alloy::primitives::{Address, U256};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{BotConfig, ConfigError};
use crate::error::TradeError;
use crate::exchange::Exchange;
use crate::notifier::{self, Notify};
use crate::position_engine::{Position, PositionState};
use crate::types::{ExitReason, TradeOutcome, TradeParams};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Native amount spent on the buy; also the input of every quote.
    pub buy_amount: U256,
    pub poll_interval: Duration,
    pub watch_timeout: Duration,
    pub deadline_secs: u64,
    pub liquidate_on_timeout: bool,
}

impl MonitorSettings {
    pub fn from_config(config: &BotConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            buy_amount: config.buy_amount()?,
            poll_interval: config.poll_interval(),
            watch_timeout: config.watch_timeout(),
            deadline_secs: config.deadline_secs,
            liquidate_on_timeout: config.liquidate_on_timeout,
        })
    }
}

/// How the Watching phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchResult {
    Crossed { reason: ExitReason, quote: U256, ticks: u32 },
    TimedOut { ticks: u32 },
}

pub struct PositionMonitor<'a> {
    exchange: &'a dyn Exchange,
    notifier: &'a dyn Notify,
    settings: &'a MonitorSettings,
    cancel: CancellationToken,
}

impl<'a> PositionMonitor<'a> {
    pub fn new(
        exchange: &'a dyn Exchange,
        notifier: &'a dyn Notify,
        settings: &'a MonitorSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            exchange,
            notifier,
            settings,
            cancel,
        }
    }

    /// Drive one position from buy to exit.
    pub async fn run(&self, params: &TradeParams) -> Result<TradeOutcome, TradeError> {
        let token = params.token;

        // ── Buying ──────────────────────────────────────────────────────
        if self.cancel.is_cancelled() {
            return Err(TradeError::Cancelled);
        }
        transition(PositionState::Buying);
        let receipt = self
            .exchange
            .buy(self.settings.buy_amount, token, self.deadline())
            .await
            .inspect_err(|_| transition(PositionState::Failed))?;
        info!(
            tx_hash = %receipt.tx_hash,
            block = ?receipt.block_number,
            amount_in = %self.settings.buy_amount,
            "buy confirmed"
        );

        let entry = self
            .quote_once(token)
            .await
            .map_err(|e| e.position_open(token, None))?;
        let position = Position::open(token, entry, params.tp_pct, params.sl_pct)
            .map_err(|e| e.position_open(token, Some(entry)))?;

        // ── Watching ────────────────────────────────────────────────────
        transition(PositionState::Watching);
        info!(
            entry = %position.entry,
            take_profit = %position.take_profit,
            stop_loss = %position.stop_loss,
            "position opened"
        );

        let watched = self
            .watch(&position)
            .await
            .map_err(|e| e.position_open(token, Some(entry)))?;

        match watched {
            WatchResult::Crossed { reason, quote, ticks } => {
                transition(PositionState::Exiting);
                let text = match reason {
                    ExitReason::StopLoss => notifier::stop_loss_hit(token, params.sl_pct),
                    _ => notifier::take_profit_hit(token, params.tp_pct),
                };
                info!(%reason, %quote, ticks, "threshold crossed, selling");
                self.notifier.notify(text);

                self.exit(&position).await?;
                Ok(TradeOutcome {
                    reason,
                    entry,
                    exit_quote: Some(quote),
                    ticks,
                })
            }
            WatchResult::TimedOut { ticks } => {
                transition(PositionState::TimedOut);
                let liquidate = self.settings.liquidate_on_timeout;
                self.notifier.notify(notifier::watch_timed_out(token, liquidate));

                if !liquidate {
                    warn!(
                        %entry,
                        ticks,
                        timeout_secs = self.settings.watch_timeout.as_secs(),
                        "no threshold crossed, position left open"
                    );
                    return Ok(TradeOutcome {
                        reason: ExitReason::TimedOut,
                        entry,
                        exit_quote: None,
                        ticks,
                    });
                }

                transition(PositionState::Exiting);
                self.exit(&position).await?;
                Ok(TradeOutcome {
                    reason: ExitReason::Liquidated,
                    entry,
                    exit_quote: None,
                    ticks,
                })
            }
        }
    }

    /// The polling loop. Returns on the first tick that crosses a threshold.
    pub async fn watch(&self, position: &Position) -> Result<WatchResult, TradeError> {
        let started = Instant::now();
        let mut ticks = 0u32;

        while started.elapsed() < self.settings.watch_timeout {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    transition(PositionState::Cancelled);
                    return Err(TradeError::Cancelled);
                }
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            let quote = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    transition(PositionState::Cancelled);
                    return Err(TradeError::Cancelled);
                }
                q = self.quote_once(position.token) => q?,
            };
            ticks += 1;
            debug!(tick = ticks, %quote, "quote");

            if let Some(reason) = position.check(quote) {
                return Ok(WatchResult::Crossed {
                    reason,
                    quote,
                    ticks,
                });
            }
        }

        Ok(WatchResult::TimedOut { ticks })
    }

    async fn quote_once(&self, token: Address) -> Result<U256, TradeError> {
        let path = [self.exchange.base_token(), token];
        self.exchange.quote(self.settings.buy_amount, &path).await
    }

    /// Single sell attempt of the full entry amount.
    async fn exit(&self, position: &Position) -> Result<(), TradeError> {
        match self
            .exchange
            .sell(position.entry, position.token, self.deadline())
            .await
        {
            Ok(receipt) => {
                transition(PositionState::Closed);
                info!(tx_hash = %receipt.tx_hash, amount_in = %position.entry, "sell confirmed");
                Ok(())
            }
            Err(e) => {
                transition(PositionState::Failed);
                Err(e.position_open(position.token, Some(position.entry)))
            }
        }
    }

    fn deadline(&self) -> u64 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        now + self.settings.deadline_secs
    }
}

fn transition(state: PositionState) {
    info!(state = %state, "position state");
}

// =============================================================================
// Tests
// =============================================================================
