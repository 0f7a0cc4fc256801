//! Bindings for the `Registry` contract: an initializable, owner-controlled
//! mapping from `bytes32` keys to target addresses.

mod caller;
mod filterer;
mod raw;
mod session;
mod transactor;

use std::sync::Arc;

use alloy::primitives::Address;
use alloy::sol;

use crate::bind::{
    BindError, BoundContract, CallOpts, ContractCaller, ContractFilterer, ContractMetadata,
    ContractTransactor, TransactOpts,
};

pub use caller::{RegistryCaller, RegistryCallerSession};
pub use filterer::{
    RegistryEntryRemovedIterator, RegistryEntrySetIterator, RegistryFilterer,
    RegistryInitializedIterator, RegistryOwnershipTransferredIterator,
};
pub use raw::RegistryRaw;
pub use session::RegistrySession;
pub use transactor::{RegistryTransactor, RegistryTransactorSession};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IRegistry {
        event Initialized(uint64 version);
        event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);
        event EntrySet(bytes32 indexed key, address indexed target, uint64 version);
        event EntryRemoved(bytes32 indexed key);

        function hasInitialized() external view returns (bool);
        function owner() external view returns (address);
        function entryCount() external view returns (uint256);
        function getEntry(bytes32 key) external view returns (address target, uint64 version, bool active);
        function initialize(address initialOwner) external;
        function setEntry(bytes32 key, address target) external;
        function removeEntry(bytes32 key) external;
        function transferOwnership(address newOwner) external;
    }
}

pub use IRegistry::{EntryRemoved, EntrySet, Initialized, OwnershipTransferred};

/// ABI of the Registry contract
pub static REGISTRY_METADATA: ContractMetadata =
    ContractMetadata::new(include_str!("../../abi/Registry.json"));

/// Value stored under a registry key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryEntry {
    pub target: Address,
    pub version: u64,
    pub active: bool,
}

impl From<IRegistry::getEntryReturn> for RegistryEntry {
    fn from(ret: IRegistry::getEntryReturn) -> Self {
        Self {
            target: ret.target,
            version: ret.version,
            active: ret.active,
        }
    }
}

fn bind_registry(
    address: Address,
    caller: Option<Arc<dyn ContractCaller>>,
    transactor: Option<Arc<dyn ContractTransactor>>,
    filterer: Option<Arc<dyn ContractFilterer>>,
) -> Result<BoundContract, BindError> {
    let abi = REGISTRY_METADATA.get_abi()?;
    Ok(BoundContract::new(address, abi, caller, transactor, filterer))
}

/// Full Registry binding with read, write and event access
#[derive(Debug, Clone)]
pub struct Registry {
    contract: BoundContract,
    caller: RegistryCaller,
    transactor: RegistryTransactor,
    filterer: RegistryFilterer,
}

impl Registry {
    /// Bind to a deployed Registry through a backend that can call,
    /// transact and query logs
    pub fn new<B>(address: Address, backend: Arc<B>) -> Result<Self, BindError>
    where
        B: ContractCaller + ContractTransactor + ContractFilterer + 'static,
    {
        let contract = bind_registry(
            address,
            Some(backend.clone()),
            Some(backend.clone()),
            Some(backend),
        )?;

        Ok(Self {
            caller: RegistryCaller::from_bound(contract.clone()),
            transactor: RegistryTransactor::from_bound(contract.clone()),
            filterer: RegistryFilterer::from_bound(contract.clone()),
            contract,
        })
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn caller(&self) -> &RegistryCaller {
        &self.caller
    }

    pub fn transactor(&self) -> &RegistryTransactor {
        &self.transactor
    }

    pub fn filterer(&self) -> &RegistryFilterer {
        &self.filterer
    }

    /// Untyped access to every method in the ABI
    pub fn raw(&self) -> RegistryRaw {
        RegistryRaw::from_bound(self.contract.clone())
    }

    /// Pin call and transact options for a sequence of operations
    pub fn session(&self, call_opts: CallOpts, transact_opts: TransactOpts) -> RegistrySession {
        RegistrySession::new(self.clone(), call_opts, transact_opts)
    }
}
