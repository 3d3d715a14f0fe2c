// =============================================================================
// Notifier — best-effort Telegram status lines
// =============================================================================
//
// `notify` never blocks and never fails from the caller's point of view:
// delivery runs on its own task and errors are only logged. Without
// credentials every call is a no-op.
// =============================================================================

use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TelegramCredentials;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

pub trait Notify: Send + Sync {
    /// Queue `text` for delivery and return immediately.
    fn notify(&self, text: String);
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    /// `{api_base}/bot{token}/sendMessage` plus chat id; `None` when disabled.
    target: Option<(String, String)>,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, credentials: Option<TelegramCredentials>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .context("failed to build notifier HTTP client")?;

        let target = credentials.map(|c| {
            (
                format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), c.token),
                c.chat_id,
            )
        });

        Ok(Self { client, target })
    }

    pub fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// POST one message and wait for the answer.
    pub async fn deliver(&self, text: &str) -> Result<()> {
        let Some((url, chat_id)) = &self.target else {
            return Ok(());
        };

        let resp = self
            .client
            .post(url)
            .json(&SendMessage { chat_id, text })
            .send()
            .await
            // The URL carries the bot token; keep it out of the error.
            .map_err(|e| anyhow::anyhow!("sendMessage request failed: {}", e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("sendMessage returned {status}: {body}");
        }
        Ok(())
    }
}

impl Notify for TelegramNotifier {
    fn notify(&self, text: String) {
        if !self.is_enabled() {
            debug!("notifications disabled, dropping message");
            return;
        }
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.deliver(&text).await {
                warn!(error = %e, "notification delivery failed");
            }
        });
    }
}

// -----------------------------------------------------------------------------
// Message texts
// -----------------------------------------------------------------------------

pub fn trade_started(token: Address, buy_usd: f64) -> String {
    format!("🚀 AUTO BUY\n{token}\n💵 ~${buy_usd}")
}

pub fn take_profit_hit(token: Address, tp_pct: i64) -> String {
    format!("📈 TP HIT {tp_pct}%\n{token}")
}

pub fn stop_loss_hit(token: Address, sl_pct: i64) -> String {
    format!("📉 SL HIT {sl_pct}%\n{token}")
}

pub fn watch_timed_out(token: Address, liquidating: bool) -> String {
    if liquidating {
        format!("⏱ TIMEOUT, SELLING\n{token}")
    } else {
        format!("⏱ TIMEOUT, POSITION LEFT OPEN\n{token}")
    }
}

pub fn trade_failed(error: &str) -> String {
    format!("❌ ERROR\n{error}")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub struct RecordingNotifier {
    pub messages: parking_lot::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

#[cfg(test)]
impl Notify for RecordingNotifier {
    fn notify(&self, text: String) {
        self.messages.lock().push(text);
    }
}
