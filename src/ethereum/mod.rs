pub mod provider;
pub mod utils;

use alloy::dyn_abi::EventExt;
use alloy::json_abi::Event;
use alloy::rpc::types::Log;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bind::dynamic::value_to_json;

/// A contract event rendered for output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: String,
    pub address: String,
    pub block_number: Option<u64>,
    pub block_hash: Option<String>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<u64>,
    pub fields: Map<String, Value>,
}

impl EventRecord {
    /// Decode `log` against the ABI definition of `event`
    pub fn from_log(event: &Event, log: &Log) -> Result<Self> {
        let decoded = event
            .decode_log(log.data(), true)
            .map_err(|e| anyhow!("Failed to decode {} log: {}", event.name, e))?;

        let mut indexed = decoded.indexed.iter();
        let mut body = decoded.body.iter();
        let mut fields = Map::new();
        for (position, input) in event.inputs.iter().enumerate() {
            let value = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            let name = if input.name.is_empty() {
                format!("arg{}", position)
            } else {
                input.name.clone()
            };
            fields.insert(name, value.map_or(Value::Null, value_to_json));
        }

        Ok(Self {
            event: event.name.clone(),
            address: log.address().to_checksum(None),
            block_number: log.block_number,
            block_hash: log.block_hash.map(|h| format!("{:?}", h)),
            transaction_hash: log.transaction_hash.map(|h| format!("{:?}", h)),
            log_index: log.log_index,
            fields,
        })
    }
}
