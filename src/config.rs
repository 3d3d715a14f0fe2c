// =============================================================================
// Bot Configuration — JSON tunables with serde defaults + environment secrets
// =============================================================================
//
// Two layers:
//   1. `BotConfig`  — optional JSON file (`$BOT_CONFIG`, default
//      `bot_config.json`). Every field has a serde default so a partial or
//      absent file still yields a working configuration.
//   2. `EnvConfig`  — RPC endpoint, Telegram credentials and listen address,
//      read from the process environment (after `dotenv`).
//
// The signing key is NOT part of either layer. It is read per request, see
// `credential.rs`; `BotConfig::credential_env` only names the variable.
// =============================================================================

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Fatal startup configuration problems. The process does not serve traffic
/// when one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} missing")]
    Missing(&'static str),

    #[error("{field} invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_router_address() -> String {
    // BaseSwap (UniswapV2 style) on Base.
    "0x327Df1E6de05895d2ab08513aaDD9313Fe505d86".to_string()
}

fn default_base_token_address() -> String {
    // WETH on Base.
    "0x4200000000000000000000000000000000000006".to_string()
}

fn default_buy_amount_eth() -> String {
    "0.0003".to_string()
}

fn default_gas_limit() -> u64 {
    300_000
}

fn default_deadline_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    8
}

fn default_watch_timeout_secs() -> u64 {
    600
}

fn default_receipt_timeout_secs() -> u64 {
    120
}

fn default_credential_env() -> String {
    "PRIVATE_KEY".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

// =============================================================================
// BotConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Swap router all trades go through.
    #[serde(default = "default_router_address")]
    pub router_address: String,

    /// Wrapped native token used as the first hop of buy paths.
    #[serde(default = "default_base_token_address")]
    pub base_token_address: String,

    /// Native currency spent per buy, in ether. Also the quote input size.
    #[serde(default = "default_buy_amount_eth")]
    pub buy_amount_eth: String,

    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Seconds from submission until a swap is no longer valid on-chain.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Overall Watching window. Neither threshold hit by then => timeout.
    #[serde(default = "default_watch_timeout_secs")]
    pub watch_timeout_secs: u64,

    #[serde(default = "default_receipt_timeout_secs")]
    pub receipt_timeout_secs: u64,

    /// Sell at market when the Watching window runs out. Off by default:
    /// the position is left unsold and the request still succeeds.
    #[serde(default)]
    pub liquidate_on_timeout: bool,

    /// Environment variable holding the signing key, read on every request.
    #[serde(default = "default_credential_env")]
    pub credential_env: String,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            router_address: default_router_address(),
            base_token_address: default_base_token_address(),
            buy_amount_eth: default_buy_amount_eth(),
            gas_limit: default_gas_limit(),
            deadline_secs: default_deadline_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            watch_timeout_secs: default_watch_timeout_secs(),
            receipt_timeout_secs: default_receipt_timeout_secs(),
            liquidate_on_timeout: false,
            credential_env: default_credential_env(),
            telegram_api_base: default_telegram_api_base(),
        }
    }
}

impl BotConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read bot config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse bot config from {}", path.display()))?;

        info!(
            path = %path.display(),
            router = %config.router_address,
            buy_amount_eth = %config.buy_amount_eth,
            "bot config loaded"
        );

        Ok(config)
    }

    /// Check every field that cannot be caught by serde alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.router()?;
        self.base_token()?;
        self.buy_amount()?;
        if self.poll_interval_secs == 0 {
            return Err(invalid("poll_interval_secs", "must be > 0"));
        }
        if self.watch_timeout_secs == 0 {
            return Err(invalid("watch_timeout_secs", "must be > 0"));
        }
        if self.receipt_timeout_secs == 0 {
            return Err(invalid("receipt_timeout_secs", "must be > 0"));
        }
        if self.credential_env.trim().is_empty() {
            return Err(invalid("credential_env", "must name an environment variable"));
        }
        Url::parse(&self.telegram_api_base).map_err(|e| invalid("telegram_api_base", e))?;
        Ok(())
    }

    pub fn router(&self) -> Result<Address, ConfigError> {
        self.router_address
            .trim()
            .parse()
            .map_err(|e| invalid("router_address", e))
    }

    pub fn base_token(&self) -> Result<Address, ConfigError> {
        self.base_token_address
            .trim()
            .parse()
            .map_err(|e| invalid("base_token_address", e))
    }

    /// Buy size in wei.
    pub fn buy_amount(&self) -> Result<U256, ConfigError> {
        let wei = parse_ether(self.buy_amount_eth.trim())
            .map_err(|e| invalid("buy_amount_eth", e))?;
        if wei.is_zero() {
            return Err(invalid("buy_amount_eth", "must be > 0"));
        }
        Ok(wei)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn watch_timeout(&self) -> Duration {
        Duration::from_secs(self.watch_timeout_secs)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_secs(self.receipt_timeout_secs)
    }
}

// =============================================================================
// EnvConfig
// =============================================================================

/// Bot-style messaging credentials. Both halves are required.
#[derive(Clone)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub rpc_url: Url,
    /// `None` silently disables notifications.
    pub telegram: Option<TelegramCredentials>,
    pub bind_addr: SocketAddr,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Values are trimmed; blank counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let rpc = get("RPC").ok_or(ConfigError::Missing("RPC"))?;
        let rpc_url = Url::parse(&rpc).map_err(|e| invalid("RPC", e))?;

        let telegram = match (get("TG_TOKEN"), get("TG_CHAT_ID")) {
            (Some(token), Some(chat_id)) => Some(TelegramCredentials { token, chat_id }),
            _ => None,
        };

        let port: u16 = match get("PORT") {
            Some(p) => p.parse().map_err(|e| invalid("PORT", e))?,
            None => 3000,
        };
        let host = get("BIND_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| invalid("BIND_HOST", e))?;

        Ok(Self {
            rpc_url,
            telegram,
            bind_addr,
        })
    }
}
