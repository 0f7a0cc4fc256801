//! Generic contract binding machinery.
//!
//! A [`BoundContract`] pairs a contract address with the backends able to
//! call it, transact against it and query its logs. Typed wrappers build on
//! the generic `call`, `transact`, `filter_logs`, `watch_logs` and
//! `unpack_log` primitives; events of every type share one iterator and one
//! watch loop.

pub mod backend;
pub mod base;
pub mod dynamic;
mod error;
pub mod iterator;
pub mod metadata;
pub mod watch;

#[cfg(test)]
pub(crate) mod mock;

use std::ops::Deref;

use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;

pub use backend::{
    CallOpts, ContractCaller, ContractFilterer, ContractTransactor, FilterOpts, LogQuery,
    LogSubscription, PendingTransaction, SubscriptionFeed, TransactOpts, WatchOpts,
};
pub use base::BoundContract;
pub use error::BindError;
pub use iterator::EventIterator;
pub use metadata::ContractMetadata;
pub use watch::WatchSubscription;

/// A decoded event together with the log it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent<E> {
    pub event: E,
    /// Block hash, transaction hash and log index of the source log
    pub raw: Log,
}

impl<E> Deref for DecodedEvent<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.event
    }
}

/// Decode `log` as event `E`, checking the signature topic first
pub fn decode_event<E: SolEvent>(log: Log) -> Result<DecodedEvent<E>, BindError> {
    if !E::ANONYMOUS {
        let topic = log.topics().first().copied();
        if topic != Some(E::SIGNATURE_HASH) {
            return Err(BindError::EventSignature {
                event: E::SIGNATURE,
                topic,
            });
        }
    }

    let event = E::decode_log_data(log.data(), true).map_err(|source| BindError::Decode {
        context: format!("event {}", E::SIGNATURE),
        source,
    })?;

    Ok(DecodedEvent { event, raw: log })
}
