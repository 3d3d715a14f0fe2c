// =============================================================================
// Auto Trader — validates a /auto request and runs its position monitor
// =============================================================================
//
// Order of operations per request:
//   1. read + format-check the signing key      (no network yet)
//   2. validate the body                        (no network yet)
//   3. bind an exchange to the wallet
//   4. notify start, run the monitor to completion
//
// Every error is caught here once, announced through the notifier and handed
// back to the HTTP layer. Nothing is retried.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::credential::SigningKey;
use crate::error::TradeError;
use crate::exchange::Connector;
use crate::exit::monitor::{MonitorSettings, PositionMonitor};
use crate::notifier::{self, Notify};
use crate::types::{AutoTradeRequest, TradeOutcome};

pub struct AutoTrader {
    connector: Arc<dyn Connector>,
    notifier: Arc<dyn Notify>,
    settings: MonitorSettings,
    /// Environment variable the signing key is read from on each request.
    credential_env: String,
    active: AtomicU64,
}

/// Keeps `active` accurate even when the request future is dropped.
struct ActiveGuard<'a>(&'a AtomicU64);

impl<'a> ActiveGuard<'a> {
    fn enter(counter: &'a AtomicU64) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AutoTrader {
    pub fn new(
        connector: Arc<dyn Connector>,
        notifier: Arc<dyn Notify>,
        settings: MonitorSettings,
        credential_env: impl Into<String>,
    ) -> Self {
        Self {
            connector,
            notifier,
            settings,
            credential_env: credential_env.into(),
            active: AtomicU64::new(0),
        }
    }

    /// Number of flows currently between buy and exit.
    pub fn active_monitors(&self) -> u64 {
        self.active.load(Ordering::SeqCst)
    }

    pub async fn execute(
        &self,
        request: &AutoTradeRequest,
        cancel: CancellationToken,
    ) -> Result<TradeOutcome, TradeError> {
        let span = info_span!(
            "auto_trade",
            trade_id = %Uuid::new_v4(),
            ca = request.ca.as_deref().unwrap_or("")
        );

        async {
            let result = self.try_execute(request, cancel).await;
            match &result {
                Ok(outcome) => info!(
                    reason = %outcome.reason,
                    entry = %outcome.entry,
                    ticks = outcome.ticks,
                    "auto trade finished"
                ),
                Err(e) if e.funds_at_risk() => error!(error = %e, "auto trade failed with position open"),
                Err(e) => warn!(error = %e, kind = e.kind(), "auto trade failed"),
            }
            if let Err(e) = &result {
                self.notifier.notify(notifier::trade_failed(&e.to_string()));
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn try_execute(
        &self,
        request: &AutoTradeRequest,
        cancel: CancellationToken,
    ) -> Result<TradeOutcome, TradeError> {
        let key = SigningKey::from_env(&self.credential_env)?;
        let params = request.validate()?;
        let exchange = self.connector.connect(key)?;

        info!(
            wallet = %exchange.recipient(),
            buy_usd = params.buy_usd,
            tp = params.tp_pct,
            sl = params.sl_pct,
            "auto trade accepted"
        );
        self.notifier
            .notify(notifier::trade_started(params.token, params.buy_usd));

        let _active = ActiveGuard::enter(&self.active);
        PositionMonitor::new(
            exchange.as_ref(),
            self.notifier.as_ref(),
            &self.settings,
            cancel,
        )
        .run(&params)
        .await
    }
}

impl std::fmt::Debug for AutoTrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoTrader")
            .field("connector", &"<Connector>")
            .field("settings", &self.settings)
            .field("credential_env", &self.credential_env)
            .field("active", &self.active_monitors())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
