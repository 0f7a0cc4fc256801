use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};

use super::{bind_registry, IRegistry, RegistryEntry};
use crate::bind::{BindError, BoundContract, CallOpts, ContractCaller};

/// Read-only Registry binding
#[derive(Debug, Clone)]
pub struct RegistryCaller {
    contract: BoundContract,
}

impl RegistryCaller {
    pub fn new(address: Address, caller: Arc<dyn ContractCaller>) -> Result<Self, BindError> {
        Ok(Self::from_bound(bind_registry(address, Some(caller), None, None)?))
    }

    pub(super) fn from_bound(contract: BoundContract) -> Self {
        Self { contract }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Bind `opts` to every subsequent call
    pub fn session(&self, opts: CallOpts) -> RegistryCallerSession {
        RegistryCallerSession {
            caller: self.clone(),
            opts,
        }
    }

    /// `hasInitialized() returns (bool)`
    pub async fn has_initialized(&self, opts: &CallOpts) -> Result<bool, BindError> {
        let ret = self
            .contract
            .call(opts, &IRegistry::hasInitializedCall {})
            .await?;
        Ok(ret._0)
    }

    /// `owner() returns (address)`
    pub async fn owner(&self, opts: &CallOpts) -> Result<Address, BindError> {
        let ret = self.contract.call(opts, &IRegistry::ownerCall {}).await?;
        Ok(ret._0)
    }

    /// `entryCount() returns (uint256)`
    pub async fn entry_count(&self, opts: &CallOpts) -> Result<U256, BindError> {
        let ret = self.contract.call(opts, &IRegistry::entryCountCall {}).await?;
        Ok(ret._0)
    }

    /// `getEntry(bytes32) returns (address target, uint64 version, bool active)`
    pub async fn get_entry(&self, opts: &CallOpts, key: B256) -> Result<RegistryEntry, BindError> {
        let ret = self
            .contract
            .call(opts, &IRegistry::getEntryCall { key })
            .await?;
        Ok(ret.into())
    }
}

/// [`RegistryCaller`] with fixed call options
#[derive(Debug, Clone)]
pub struct RegistryCallerSession {
    caller: RegistryCaller,
    opts: CallOpts,
}

impl RegistryCallerSession {
    pub fn opts(&self) -> &CallOpts {
        &self.opts
    }

    pub async fn has_initialized(&self) -> Result<bool, BindError> {
        self.caller.has_initialized(&self.opts).await
    }

    pub async fn owner(&self) -> Result<Address, BindError> {
        self.caller.owner(&self.opts).await
    }

    pub async fn entry_count(&self) -> Result<U256, BindError> {
        self.caller.entry_count(&self.opts).await
    }

    pub async fn get_entry(&self, key: B256) -> Result<RegistryEntry, BindError> {
        self.caller.get_entry(&self.opts, key).await
    }
}
