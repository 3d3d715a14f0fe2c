// =============================================================================
// Application State — explicitly constructed, shared by every handler
// =============================================================================
//
// There are no process-wide client objects. `main` builds the connector and
// notifier, wraps them in an `AutoTrader`, and hands this struct to the
// router behind an `Arc`.
//
// `shutdown` is the root cancellation token. Each request derives a child
// from it, so cancelling the root stops every in-flight Watching loop.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::{BotConfig, ConfigError};
use crate::exchange::Connector;
use crate::execution::AutoTrader;
use crate::exit::monitor::MonitorSettings;
use crate::notifier::Notify;

pub struct AppState {
    pub trader: AutoTrader,
    pub shutdown: CancellationToken,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: &BotConfig,
        connector: Arc<dyn Connector>,
        notifier: Arc<dyn Notify>,
    ) -> Result<Self, ConfigError> {
        let settings = MonitorSettings::from_config(config)?;
        Ok(Self {
            trader: AutoTrader::new(connector, notifier, settings, config.credential_env.clone()),
            shutdown: CancellationToken::new(),
            started_at: Utc::now(),
        })
    }

    /// Child token for one request; cancelled together with the root.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}
