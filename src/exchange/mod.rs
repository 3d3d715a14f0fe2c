// =============================================================================
// Exchange — quote / buy / sell against one swap router
// =============================================================================
//
// `Exchange` is bound to one signing wallet; `Connector` turns a per-request
// credential into such an exchange. Everything the position monitor needs
// from the chain goes through these two traits.
// =============================================================================

pub mod router;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::credential::SigningKey;
use crate::error::TradeError;

/// A mined, successful swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

#[async_trait]
pub trait Exchange: Send + Sync {
    /// Wrapped native token every path starts (buy) or ends (sell) with.
    fn base_token(&self) -> Address;

    /// Wallet that signs and receives every swap.
    fn recipient(&self) -> Address;

    /// Output of the last token in `path` for `amount_in` of the first.
    /// Read-only.
    async fn quote(&self, amount_in: U256, path: &[Address]) -> Result<U256, TradeError>;

    /// Spend `amount_in` native currency on `token`, zero minimum output.
    /// Resolves once the receipt is mined.
    async fn buy(&self, amount_in: U256, token: Address, deadline: u64) -> Result<SwapReceipt, TradeError>;

    /// Sell `amount_in` of `token` back to native currency, zero minimum
    /// output. Resolves once the receipt is mined.
    async fn sell(&self, amount_in: U256, token: Address, deadline: u64) -> Result<SwapReceipt, TradeError>;
}

pub trait Connector: Send + Sync {
    /// Bind an exchange to the wallet behind `key`. Must not do network IO.
    fn connect(&self, key: SigningKey) -> Result<Arc<dyn Exchange>, TradeError>;
}
