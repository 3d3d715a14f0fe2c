// In-memory exchange for tests: scripted quotes, call counters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::credential::SigningKey;
use crate::error::TradeError;
use crate::exchange::{Connector, Exchange, SwapReceipt};

pub fn base_token() -> Address {
    Address::repeat_byte(0x42)
}

pub fn wallet() -> Address {
    Address::repeat_byte(0x77)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteCall {
    pub amount_in: U256,
    pub path: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapCall {
    pub amount_in: U256,
    pub token: Address,
    pub deadline: u64,
}

#[derive(Default)]
pub struct MockExchange {
    script: Mutex<VecDeque<Result<U256, String>>>,
    last: Mutex<Option<U256>>,
    buy_error: Mutex<Option<String>>,
    sell_error: Mutex<Option<String>>,
    pub quotes: Mutex<Vec<QuoteCall>>,
    pub buys: Mutex<Vec<SwapCall>>,
    pub sells: Mutex<Vec<SwapCall>>,
}

impl MockExchange {
    /// Quotes are served in order; the last successful one repeats once the
    /// script runs out.
    pub fn with_quotes<I>(quotes: I) -> Self
    where
        I: IntoIterator<Item = Result<u64, &'static str>>,
    {
        let script = quotes
            .into_iter()
            .map(|q| q.map(U256::from).map_err(str::to_string))
            .collect();
        Self {
            script: Mutex::new(script),
            ..Self::default()
        }
    }

    pub fn failing_buy(self, msg: &str) -> Self {
        *self.buy_error.lock() = Some(msg.to_string());
        self
    }

    pub fn failing_sell(self, msg: &str) -> Self {
        *self.sell_error.lock() = Some(msg.to_string());
        self
    }

    pub fn quote_count(&self) -> usize {
        self.quotes.lock().len()
    }

    pub fn buy_count(&self) -> usize {
        self.buys.lock().len()
    }

    pub fn sell_count(&self) -> usize {
        self.sells.lock().len()
    }

    fn receipt(n: u8) -> SwapReceipt {
        SwapReceipt {
            tx_hash: B256::repeat_byte(n),
            block_number: Some(1),
        }
    }
}

#[async_trait]
impl Exchange for MockExchange {
    fn base_token(&self) -> Address {
        base_token()
    }

    fn recipient(&self) -> Address {
        wallet()
    }

    async fn quote(&self, amount_in: U256, path: &[Address]) -> Result<U256, TradeError> {
        self.quotes.lock().push(QuoteCall {
            amount_in,
            path: path.to_vec(),
        });

        let next = self.script.lock().pop_front();
        match next {
            Some(Ok(q)) => {
                *self.last.lock() = Some(q);
                Ok(q)
            }
            Some(Err(msg)) => Err(TradeError::Rpc(msg)),
            None => {
                let last = *self.last.lock();
                last.ok_or_else(|| TradeError::Rpc("no quote scripted".to_string()))
            }
        }
    }

    async fn buy(&self, amount_in: U256, token: Address, deadline: u64) -> Result<SwapReceipt, TradeError> {
        self.buys.lock().push(SwapCall {
            amount_in,
            token,
            deadline,
        });
        match self.buy_error.lock().clone() {
            Some(msg) => Err(TradeError::Transaction(msg)),
            None => Ok(Self::receipt(0xb1)),
        }
    }

    async fn sell(&self, amount_in: U256, token: Address, deadline: u64) -> Result<SwapReceipt, TradeError> {
        self.sells.lock().push(SwapCall {
            amount_in,
            token,
            deadline,
        });
        match self.sell_error.lock().clone() {
            Some(msg) => Err(TradeError::Transaction(msg)),
            None => Ok(Self::receipt(0x5e)),
        }
    }
}

/// Hands out the same `MockExchange` for every key.
pub struct MockConnector {
    pub exchange: Arc<MockExchange>,
    connects: AtomicU32,
}

impl MockConnector {
    pub fn new(exchange: MockExchange) -> Self {
        Self {
            exchange: Arc::new(exchange),
            connects: AtomicU32::new(0),
        }
    }

    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect(&self, _key: SigningKey) -> Result<Arc<dyn Exchange>, TradeError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.exchange.clone())
    }
}
