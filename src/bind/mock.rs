//! In-memory backend for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, LogData, B256};
use alloy::rpc::types::Log;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::backend::{
    CallOpts, ContractCaller, ContractFilterer, ContractTransactor, LogQuery, LogSubscription,
    PendingTransaction, SubscriptionFeed, TransactOpts,
};

/// Build an RPC log as a node would return it
pub(crate) fn log_at(address: Address, data: LogData, block: u64, index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log { address, data },
        block_hash: Some(B256::with_last_byte(block as u8)),
        block_number: Some(block),
        block_timestamp: None,
        transaction_hash: Some(B256::repeat_byte(0xee)),
        transaction_index: Some(0),
        log_index: Some(index),
        removed: false,
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    responses: Mutex<HashMap<[u8; 4], Bytes>>,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<(CallOpts, Address, Bytes)>>,
    sent: Mutex<Vec<(TransactOpts, Address, Bytes)>>,
    logs: Mutex<Vec<Log>>,
    queries: Mutex<Vec<LogQuery>>,
    feeds: Mutex<Vec<SubscriptionFeed>>,
}

impl MockBackend {
    /// Answer calls whose selector is `selector` with `output`
    pub fn respond(&self, selector: [u8; 4], output: impl Into<Bytes>) {
        self.responses.lock().unwrap().insert(selector, output.into());
    }

    /// Fail every subsequent request with `message`
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn push_log(&self, log: Log) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn calls(&self) -> Vec<(CallOpts, Address, Bytes)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(TransactOpts, Address, Bytes)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<LogQuery> {
        self.queries.lock().unwrap().clone()
    }

    /// Producer side of the oldest live subscription
    pub fn take_feed(&self) -> Option<SubscriptionFeed> {
        let mut feeds = self.feeds.lock().unwrap();
        if feeds.is_empty() {
            None
        } else {
            Some(feeds.remove(0))
        }
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ContractCaller for MockBackend {
    async fn call_contract(&self, opts: &CallOpts, to: Address, input: Bytes) -> Result<Bytes> {
        self.check_failure()?;
        self.calls
            .lock()
            .unwrap()
            .push((opts.clone(), to, input.clone()));

        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| anyhow!("calldata shorter than a selector"))?;

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&selector)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl ContractTransactor for MockBackend {
    async fn send_transaction(
        &self,
        opts: &TransactOpts,
        to: Address,
        input: Bytes,
    ) -> Result<PendingTransaction> {
        self.check_failure()?;
        let mut sent = self.sent.lock().unwrap();
        sent.push((opts.clone(), to, input));
        Ok(PendingTransaction {
            hash: B256::with_last_byte(sent.len() as u8),
        })
    }
}

#[async_trait]
impl ContractFilterer for MockBackend {
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        self.check_failure()?;
        self.queries.lock().unwrap().push(query.clone());

        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| query.matches(log))
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                query.from_block.map_or(true, |from| block >= from)
                    && query.to_block.map_or(true, |to| block <= to)
            })
            .cloned()
            .collect())
    }

    async fn subscribe_logs(&self, query: &LogQuery) -> Result<LogSubscription> {
        self.check_failure()?;
        self.queries.lock().unwrap().push(query.clone());

        let (feed, subscription) = LogSubscription::channel(16);
        self.feeds.lock().unwrap().push(feed);
        Ok(subscription)
    }
}
