// =============================================================================
// Router Client — UniswapV2-style swaps over JSON-RPC (alloy)
// =============================================================================
//
// SECURITY: the signing key is converted into an alloy signer inside
// `connect` and the raw bytes are dropped right after. Neither is logged.
//
// Every swap is sent with a zero minimum output and a fixed gas ceiling.
// Zero minimum output means price movement can never revert a swap, and also
// means there is no slippage protection at all; `amount_out_min` below is the
// one place to change that.
//
// All per-request providers share one `reqwest::Client`, i.e. one connection
// pool to the RPC endpoint.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use alloy::contract::Error as ContractError;
use alloy::network::{Ethereum, EthereumWallet, ReceiptResponse};
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::Http;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, instrument};

use crate::credential::SigningKey;
use crate::error::TradeError;
use crate::exchange::{Connector, Exchange, SwapReceipt};

/// Timeout applied to every JSON-RPC HTTP request.
const RPC_HTTP_TIMEOUT: Duration = Duration::from_secs(15);

sol! {
    #[sol(rpc)]
    interface ISwapRouter {
        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external payable returns (uint256[] memory amounts);

        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external returns (uint256[] memory amounts);

        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external view returns (uint256[] memory amounts);
    }

    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Fixed on-chain parameters shared by every request.
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub router: Address,
    pub base_token: Address,
    pub gas_limit: u64,
    pub receipt_timeout: Duration,
}

// -----------------------------------------------------------------------------
// Connector
// -----------------------------------------------------------------------------

/// Builds a wallet-bound `RouterClient` per request over a shared HTTP pool.
pub struct RouterConnector {
    http: reqwest::Client,
    rpc_url: Url,
    settings: RouterSettings,
}

impl RouterConnector {
    pub fn new(rpc_url: Url, settings: RouterSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(RPC_HTTP_TIMEOUT)
            .build()
            .context("failed to build RPC HTTP client")?;

        debug!(router = %settings.router, base_token = %settings.base_token, "RouterConnector initialised");

        Ok(Self {
            http,
            rpc_url,
            settings,
        })
    }
}

impl Connector for RouterConnector {
    fn connect(&self, key: SigningKey) -> Result<Arc<dyn Exchange>, TradeError> {
        let signer = PrivateKeySigner::from_slice(key.as_bytes())
            .map_err(|e| TradeError::Validation(format!("PRIVATE_KEY rejected: {e}")))?;
        drop(key);

        let recipient = signer.address();
        let transport = Http::with_client(self.http.clone(), self.rpc_url.clone());
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_client(RpcClient::new(transport, false))
            .erased();

        Ok(Arc::new(RouterClient {
            provider,
            recipient,
            settings: self.settings.clone(),
        }))
    }
}

// -----------------------------------------------------------------------------
// Client
// -----------------------------------------------------------------------------

pub struct RouterClient {
    provider: DynProvider,
    recipient: Address,
    settings: RouterSettings,
}

impl RouterClient {
    fn amount_out_min(&self) -> U256 {
        U256::ZERO
    }

    /// Wait for a submitted transaction to be mined and check its status.
    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
        what: &str,
    ) -> Result<SwapReceipt, TradeError> {
        let tx_hash = *pending.tx_hash();
        debug!(%tx_hash, what, "waiting for receipt");

        let receipt = pending
            .with_timeout(Some(self.settings.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| TradeError::Transaction(format!("{what} {tx_hash} not confirmed: {e}")))?;

        if !receipt.status() {
            return Err(TradeError::Transaction(format!("{what} {tx_hash} reverted")));
        }

        let block_number = receipt.block_number();
        info!(%tx_hash, block = ?block_number, what, "transaction confirmed");
        Ok(SwapReceipt {
            tx_hash,
            block_number,
        })
    }
}

/// Transport failures while submitting are RPC errors; anything else the
/// contract layer reports is a transaction error.
fn classify(err: ContractError, what: &str) -> TradeError {
    match err {
        ContractError::TransportError(e) => TradeError::Rpc(format!("{what}: {e}")),
        other => TradeError::Transaction(format!("{what}: {other}")),
    }
}

#[async_trait]
impl Exchange for RouterClient {
    fn base_token(&self) -> Address {
        self.settings.base_token
    }

    fn recipient(&self) -> Address {
        self.recipient
    }

    #[instrument(skip(self, path), name = "router::quote")]
    async fn quote(&self, amount_in: U256, path: &[Address]) -> Result<U256, TradeError> {
        let router = ISwapRouter::new(self.settings.router, self.provider.clone());
        let amounts = router
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .map_err(|e| TradeError::Rpc(format!("getAmountsOut: {e}")))?;

        amounts
            .last()
            .copied()
            .ok_or_else(|| TradeError::Rpc("getAmountsOut returned no amounts".to_string()))
    }

    #[instrument(skip(self), name = "router::buy")]
    async fn buy(&self, amount_in: U256, token: Address, deadline: u64) -> Result<SwapReceipt, TradeError> {
        let router = ISwapRouter::new(self.settings.router, self.provider.clone());
        let pending = router
            .swapExactETHForTokens(
                self.amount_out_min(),
                vec![self.settings.base_token, token],
                self.recipient,
                U256::from(deadline),
            )
            .value(amount_in)
            .gas(self.settings.gas_limit)
            .send()
            .await
            .map_err(|e| classify(e, "buy"))?;

        self.confirm(pending, "buy").await
    }

    /// Approves the router for `amount_in`, then swaps it for native
    /// currency.
    #[instrument(skip(self), name = "router::sell")]
    async fn sell(&self, amount_in: U256, token: Address, deadline: u64) -> Result<SwapReceipt, TradeError> {
        let erc20 = IERC20::new(token, self.provider.clone());
        let pending = erc20
            .approve(self.settings.router, amount_in)
            .gas(self.settings.gas_limit)
            .send()
            .await
            .map_err(|e| classify(e, "approve"))?;
        self.confirm(pending, "approve").await?;

        let router = ISwapRouter::new(self.settings.router, self.provider.clone());
        let pending = router
            .swapExactTokensForETH(
                amount_in,
                self.amount_out_min(),
                vec![token, self.settings.base_token],
                self.recipient,
                U256::from(deadline),
            )
            .gas(self.settings.gas_limit)
            .send()
            .await
            .map_err(|e| classify(e, "sell"))?;

        self.confirm(pending, "sell").await
    }
}

// =============================================================================
// Tests
// =============================================================================
