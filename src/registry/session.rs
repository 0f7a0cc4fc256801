use alloy::primitives::{Address, Bytes, B256, U256};

use super::{Registry, RegistryEntry};
use crate::bind::{BindError, CallOpts, PendingTransaction, TransactOpts};

/// Full Registry binding with call and transact options fixed up front
#[derive(Debug, Clone)]
pub struct RegistrySession {
    registry: Registry,
    call_opts: CallOpts,
    transact_opts: TransactOpts,
}

impl RegistrySession {
    pub(super) fn new(registry: Registry, call_opts: CallOpts, transact_opts: TransactOpts) -> Self {
        Self {
            registry,
            call_opts,
            transact_opts,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn call_opts(&self) -> &CallOpts {
        &self.call_opts
    }

    pub fn transact_opts(&self) -> &TransactOpts {
        &self.transact_opts
    }

    pub async fn has_initialized(&self) -> Result<bool, BindError> {
        self.registry.caller().has_initialized(&self.call_opts).await
    }

    pub async fn owner(&self) -> Result<Address, BindError> {
        self.registry.caller().owner(&self.call_opts).await
    }

    pub async fn entry_count(&self) -> Result<U256, BindError> {
        self.registry.caller().entry_count(&self.call_opts).await
    }

    pub async fn get_entry(&self, key: B256) -> Result<RegistryEntry, BindError> {
        self.registry.caller().get_entry(&self.call_opts, key).await
    }

    pub async fn initialize(&self, initial_owner: Address) -> Result<PendingTransaction, BindError> {
        self.registry
            .transactor()
            .initialize(&self.transact_opts, initial_owner)
            .await
    }

    pub async fn set_entry(&self, key: B256, target: Address) -> Result<PendingTransaction, BindError> {
        self.registry
            .transactor()
            .set_entry(&self.transact_opts, key, target)
            .await
    }

    pub async fn remove_entry(&self, key: B256) -> Result<PendingTransaction, BindError> {
        self.registry
            .transactor()
            .remove_entry(&self.transact_opts, key)
            .await
    }

    pub async fn transfer_ownership(
        &self,
        new_owner: Address,
    ) -> Result<PendingTransaction, BindError> {
        self.registry
            .transactor()
            .transfer_ownership(&self.transact_opts, new_owner)
            .await
    }

    pub async fn transfer(&self) -> Result<PendingTransaction, BindError> {
        self.registry.transactor().transfer(&self.transact_opts).await
    }

    pub async fn raw_transact(&self, calldata: Bytes) -> Result<PendingTransaction, BindError> {
        self.registry
            .transactor()
            .raw_transact(&self.transact_opts, calldata)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::MockBackend;
    use crate::registry::IRegistry;
    use alloy::primitives::address;
    use alloy::sol_types::{SolCall, SolValue};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_session_uses_both_option_sets() {
        let backend = Arc::new(MockBackend::default());
        let owner = address!("0000000000000000000000000000000000000099");
        backend.respond(IRegistry::ownerCall::SELECTOR, owner.abi_encode());

        let registry = Registry::new(
            address!("00000000000000000000000000000000000000a8"),
            backend.clone(),
        )
        .unwrap();
        let call_opts = CallOpts {
            block: Some(77),
            ..Default::default()
        };
        let transact_opts = TransactOpts {
            from: Some(owner),
            nonce: Some(3),
            ..Default::default()
        };
        let session = registry.session(call_opts.clone(), transact_opts.clone());

        assert_eq!(session.owner().await.unwrap(), owner);
        session
            .set_entry(B256::repeat_byte(4), Address::ZERO)
            .await
            .unwrap();

        assert_eq!(backend.calls()[0].0, call_opts);
        assert_eq!(backend.sent()[0].0, transact_opts);
        assert_eq!(session.registry().address(), registry.address());
    }
}
