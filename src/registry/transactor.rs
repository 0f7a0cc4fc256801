use std::sync::Arc;

use alloy::primitives::{Address, Bytes, B256};

use super::{bind_registry, IRegistry};
use crate::bind::{BindError, BoundContract, ContractTransactor, PendingTransaction, TransactOpts};

/// Write-only Registry binding
#[derive(Debug, Clone)]
pub struct RegistryTransactor {
    contract: BoundContract,
}

impl RegistryTransactor {
    pub fn new(
        address: Address,
        transactor: Arc<dyn ContractTransactor>,
    ) -> Result<Self, BindError> {
        Ok(Self::from_bound(bind_registry(
            address,
            None,
            Some(transactor),
            None,
        )?))
    }

    pub(super) fn from_bound(contract: BoundContract) -> Self {
        Self { contract }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn session(&self, opts: TransactOpts) -> RegistryTransactorSession {
        RegistryTransactorSession {
            transactor: self.clone(),
            opts,
        }
    }

    /// `initialize(address initialOwner)`
    pub async fn initialize(
        &self,
        opts: &TransactOpts,
        initial_owner: Address,
    ) -> Result<PendingTransaction, BindError> {
        self.contract
            .transact(opts, &IRegistry::initializeCall { initialOwner: initial_owner })
            .await
    }

    /// `setEntry(bytes32 key, address target)`
    pub async fn set_entry(
        &self,
        opts: &TransactOpts,
        key: B256,
        target: Address,
    ) -> Result<PendingTransaction, BindError> {
        self.contract
            .transact(opts, &IRegistry::setEntryCall { key, target })
            .await
    }

    /// `removeEntry(bytes32 key)`
    pub async fn remove_entry(
        &self,
        opts: &TransactOpts,
        key: B256,
    ) -> Result<PendingTransaction, BindError> {
        self.contract
            .transact(opts, &IRegistry::removeEntryCall { key })
            .await
    }

    /// `transferOwnership(address newOwner)`
    pub async fn transfer_ownership(
        &self,
        opts: &TransactOpts,
        new_owner: Address,
    ) -> Result<PendingTransaction, BindError> {
        self.contract
            .transact(opts, &IRegistry::transferOwnershipCall { newOwner: new_owner })
            .await
    }

    /// Plain value transfer to the contract
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<PendingTransaction, BindError> {
        self.contract.transfer(opts).await
    }

    /// Transaction with caller-supplied calldata
    pub async fn raw_transact(
        &self,
        opts: &TransactOpts,
        calldata: Bytes,
    ) -> Result<PendingTransaction, BindError> {
        self.contract.raw_transact(opts, calldata).await
    }
}

/// [`RegistryTransactor`] with fixed transaction options
#[derive(Debug, Clone)]
pub struct RegistryTransactorSession {
    transactor: RegistryTransactor,
    opts: TransactOpts,
}

impl RegistryTransactorSession {
    pub fn opts(&self) -> &TransactOpts {
        &self.opts
    }

    pub async fn initialize(&self, initial_owner: Address) -> Result<PendingTransaction, BindError> {
        self.transactor.initialize(&self.opts, initial_owner).await
    }

    pub async fn set_entry(&self, key: B256, target: Address) -> Result<PendingTransaction, BindError> {
        self.transactor.set_entry(&self.opts, key, target).await
    }

    pub async fn remove_entry(&self, key: B256) -> Result<PendingTransaction, BindError> {
        self.transactor.remove_entry(&self.opts, key).await
    }

    pub async fn transfer_ownership(
        &self,
        new_owner: Address,
    ) -> Result<PendingTransaction, BindError> {
        self.transactor
            .transfer_ownership(&self.opts, new_owner)
            .await
    }

    pub async fn transfer(&self) -> Result<PendingTransaction, BindError> {
        self.transactor.transfer(&self.opts).await
    }

    pub async fn raw_transact(&self, calldata: Bytes) -> Result<PendingTransaction, BindError> {
        self.transactor.raw_transact(&self.opts, calldata).await
    }
}
