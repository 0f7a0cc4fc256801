use std::sync::OnceLock;

use alloy::json_abi::{Event, Function, JsonAbi};

use super::BindError;

/// Embedded ABI description of a contract, parsed on first use.
#[derive(Debug)]
pub struct ContractMetadata {
    abi: &'static str,
    parsed: OnceLock<Result<JsonAbi, String>>,
}

impl ContractMetadata {
    pub const fn new(abi: &'static str) -> Self {
        Self {
            abi,
            parsed: OnceLock::new(),
        }
    }

    /// Raw ABI JSON as embedded at build time
    pub fn abi_json(&self) -> &'static str {
        self.abi
    }

    /// Parsed ABI. A parse failure is cached and returned on every call.
    pub fn get_abi(&self) -> Result<&JsonAbi, BindError> {
        self.parsed
            .get_or_init(|| serde_json::from_str(self.abi).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| BindError::AbiParse(e.clone()))
    }

    /// First function overload with the given name
    pub fn function(&self, name: &str) -> Result<&Function, BindError> {
        self.get_abi()?
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| BindError::UnknownMethod(name.to_string()))
    }

    /// First event with the given name
    pub fn event(&self, name: &str) -> Result<&Event, BindError> {
        self.get_abi()?
            .event(name)
            .and_then(|events| events.first())
            .ok_or_else(|| BindError::UnknownMethod(name.to_string()))
    }
}
