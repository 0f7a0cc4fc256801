//! Capabilities a bound contract needs from the outside world.
//!
//! The binding layer never talks to a node itself. A backend implements one
//! or more of the traits below and the bound contract forwards calls,
//! transactions and log queries to it.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::Log;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Options for read-only calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOpts {
    /// Sender of the call, if the contract inspects `msg.sender`
    pub from: Option<Address>,
    /// Block to execute against; latest when unset
    pub block: Option<u64>,
    pub timeout: Option<Duration>,
}

/// Options for state-changing transactions.
///
/// Signing is the transactor backend's concern; `from` only selects among
/// the accounts it can sign for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactOpts {
    pub from: Option<Address>,
    pub nonce: Option<u64>,
    pub value: Option<U256>,
    pub gas_price: Option<u128>,
    pub gas_limit: Option<u64>,
    pub timeout: Option<Duration>,
}

/// Block range for historical log queries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOpts {
    pub start: u64,
    /// Last block to include; latest when unset
    pub end: Option<u64>,
    pub timeout: Option<Duration>,
}

/// Options for live log subscriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchOpts {
    /// First block to deliver logs from; the node's head when unset
    pub start: Option<u64>,
}

/// Handle to a broadcast transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: B256,
}

/// Log filter for a single contract.
///
/// `topics[i]` lists the accepted values at topic position `i`; an empty
/// position matches anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub topics: Vec<Vec<B256>>,
}

impl LogQuery {
    /// Whether a log satisfies the address and topic constraints.
    /// Block bounds are not checked.
    pub fn matches(&self, log: &Log) -> bool {
        if log.address() != self.address {
            return false;
        }

        let topics = log.topics();
        self.topics.iter().enumerate().all(|(position, accepted)| {
            accepted.is_empty()
                || topics
                    .get(position)
                    .map_or(false, |topic| accepted.contains(topic))
        })
    }
}

/// Consumer side of a log subscription.
///
/// Logs arrive on one channel and a terminal error on another. When the
/// error channel closes without a value the subscription ended cleanly.
/// Dropping the subscription or calling [`LogSubscription::unsubscribe`]
/// signals the producer to stop.
#[derive(Debug)]
pub struct LogSubscription {
    pub(crate) logs: mpsc::Receiver<Log>,
    pub(crate) errors: mpsc::Receiver<anyhow::Error>,
    quit: Option<oneshot::Sender<()>>,
}

/// Producer side of a log subscription, held by the backend
#[derive(Debug)]
pub struct SubscriptionFeed {
    pub logs: mpsc::Sender<Log>,
    pub errors: mpsc::Sender<anyhow::Error>,
    /// Resolves once the subscriber unsubscribes or goes away
    pub quit: oneshot::Receiver<()>,
}

impl LogSubscription {
    /// Create a connected feed/subscription pair buffering up to `capacity` logs
    pub fn channel(capacity: usize) -> (SubscriptionFeed, LogSubscription) {
        let (logs_tx, logs_rx) = mpsc::channel(capacity.max(1));
        let (errors_tx, errors_rx) = mpsc::channel(1);
        let (quit_tx, quit_rx) = oneshot::channel();

        (
            SubscriptionFeed {
                logs: logs_tx,
                errors: errors_tx,
                quit: quit_rx,
            },
            LogSubscription {
                logs: logs_rx,
                errors: errors_rx,
                quit: Some(quit_tx),
            },
        )
    }

    /// A finished subscription with every log already buffered
    pub fn from_logs(logs: Vec<Log>) -> Self {
        let (feed, subscription) = Self::channel(logs.len());
        for log in logs {
            if feed.logs.try_send(log).is_err() {
                break;
            }
        }
        subscription
    }

    /// Stop delivery. Logs already buffered stay readable.
    pub fn unsubscribe(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
    }
}

#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Execute a read-only call and return the raw output bytes
    async fn call_contract(&self, opts: &CallOpts, to: Address, input: Bytes) -> Result<Bytes>;
}

#[async_trait]
pub trait ContractTransactor: Send + Sync {
    /// Sign and broadcast a transaction carrying `input` to `to`
    async fn send_transaction(
        &self,
        opts: &TransactOpts,
        to: Address,
        input: Bytes,
    ) -> Result<PendingTransaction>;
}

#[async_trait]
pub trait ContractFilterer: Send + Sync {
    /// Run a historical log query
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>>;

    /// Subscribe to logs matching `query` as they are produced
    async fn subscribe_logs(&self, query: &LogQuery) -> Result<LogSubscription>;
}
