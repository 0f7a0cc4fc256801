use std::time::Duration;

use alloy::primitives::{Address, B256};
use thiserror::Error;

/// Errors surfaced by bound contract handles.
///
/// Backend failures are carried verbatim; this layer never retries or
/// reinterprets them.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("Failed to parse contract ABI: {0}")]
    AbiParse(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("Failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: alloy::sol_types::Error,
    },

    #[error("No data returned by {method} at {address}; the contract may not be deployed or the call reverted")]
    EmptyOutput {
        method: &'static str,
        address: Address,
    },

    #[error("Log is not a {event} event (topic0: {topic:?})")]
    EventSignature {
        event: &'static str,
        topic: Option<B256>,
    },

    #[error("Log subscription failed: {0}")]
    Subscription(anyhow::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Contract is not bound to a {0} backend")]
    MissingBackend(&'static str),

    #[error("Method '{0}' not found in contract ABI")]
    UnknownMethod(String),

    #[error("Invalid arguments: {0}")]
    Arguments(String),

    #[error("ABI coder error: {0}")]
    Coder(#[from] alloy::dyn_abi::Error),
}
