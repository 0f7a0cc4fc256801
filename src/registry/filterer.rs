use std::sync::Arc;

use alloy::primitives::{Address, B256};
use alloy::rpc::types::Log;
use tokio::sync::mpsc;

use super::{bind_registry, EntryRemoved, EntrySet, Initialized, OwnershipTransferred};
use crate::bind::{
    BindError, BoundContract, ContractFilterer, DecodedEvent, EventIterator, FilterOpts,
    WatchOpts, WatchSubscription,
};

pub type RegistryInitializedIterator = EventIterator<Initialized>;
pub type RegistryOwnershipTransferredIterator = EventIterator<OwnershipTransferred>;
pub type RegistryEntrySetIterator = EventIterator<EntrySet>;
pub type RegistryEntryRemovedIterator = EventIterator<EntryRemoved>;

fn address_topics(addresses: &[Address]) -> Vec<B256> {
    addresses.iter().map(|a| a.into_word()).collect()
}

/// Event access for the Registry contract
#[derive(Debug, Clone)]
pub struct RegistryFilterer {
    contract: BoundContract,
}

impl RegistryFilterer {
    pub fn new(address: Address, filterer: Arc<dyn ContractFilterer>) -> Result<Self, BindError> {
        Ok(Self::from_bound(bind_registry(
            address,
            None,
            None,
            Some(filterer),
        )?))
    }

    pub(super) fn from_bound(contract: BoundContract) -> Self {
        Self { contract }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Historical `Initialized(uint64)` events
    pub async fn filter_initialized(
        &self,
        opts: &FilterOpts,
    ) -> Result<RegistryInitializedIterator, BindError> {
        self.contract.filter_logs(opts, vec![]).await
    }

    pub async fn watch_initialized(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<DecodedEvent<Initialized>>,
    ) -> Result<WatchSubscription, BindError> {
        self.contract.watch_logs(opts, sink, vec![]).await
    }

    pub fn parse_initialized(&self, log: Log) -> Result<DecodedEvent<Initialized>, BindError> {
        self.contract.unpack_log(log)
    }

    /// Historical `OwnershipTransferred` events; empty slices match any address
    pub async fn filter_ownership_transferred(
        &self,
        opts: &FilterOpts,
        previous_owner: &[Address],
        new_owner: &[Address],
    ) -> Result<RegistryOwnershipTransferredIterator, BindError> {
        self.contract
            .filter_logs(
                opts,
                vec![address_topics(previous_owner), address_topics(new_owner)],
            )
            .await
    }

    pub async fn watch_ownership_transferred(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<DecodedEvent<OwnershipTransferred>>,
        previous_owner: &[Address],
        new_owner: &[Address],
    ) -> Result<WatchSubscription, BindError> {
        self.contract
            .watch_logs(
                opts,
                sink,
                vec![address_topics(previous_owner), address_topics(new_owner)],
            )
            .await
    }

    pub fn parse_ownership_transferred(
        &self,
        log: Log,
    ) -> Result<DecodedEvent<OwnershipTransferred>, BindError> {
        self.contract.unpack_log(log)
    }

    /// Historical `EntrySet` events filtered by key and target
    pub async fn filter_entry_set(
        &self,
        opts: &FilterOpts,
        key: &[B256],
        target: &[Address],
    ) -> Result<RegistryEntrySetIterator, BindError> {
        self.contract
            .filter_logs(opts, vec![key.to_vec(), address_topics(target)])
            .await
    }

    pub async fn watch_entry_set(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<DecodedEvent<EntrySet>>,
        key: &[B256],
        target: &[Address],
    ) -> Result<WatchSubscription, BindError> {
        self.contract
            .watch_logs(opts, sink, vec![key.to_vec(), address_topics(target)])
            .await
    }

    pub fn parse_entry_set(&self, log: Log) -> Result<DecodedEvent<EntrySet>, BindError> {
        self.contract.unpack_log(log)
    }

    /// Historical `EntryRemoved` events filtered by key
    pub async fn filter_entry_removed(
        &self,
        opts: &FilterOpts,
        key: &[B256],
    ) -> Result<RegistryEntryRemovedIterator, BindError> {
        self.contract.filter_logs(opts, vec![key.to_vec()]).await
    }

    pub async fn watch_entry_removed(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<DecodedEvent<EntryRemoved>>,
        key: &[B256],
    ) -> Result<WatchSubscription, BindError> {
        self.contract.watch_logs(opts, sink, vec![key.to_vec()]).await
    }

    pub fn parse_entry_removed(&self, log: Log) -> Result<DecodedEvent<EntryRemoved>, BindError> {
        self.contract.unpack_log(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::{log_at, MockBackend};
    use alloy::primitives::address;
    use alloy::sol_types::SolEvent;
    use std::time::Duration;

    const REGISTRY: Address = address!("00000000000000000000000000000000000000a7");
    const ALICE: Address = address!("00000000000000000000000000000000000000a1");
    const BOB: Address = address!("00000000000000000000000000000000000000b0");

    fn emit(backend: &MockBackend, event: &impl SolEvent, block: u64, index: u64) {
        backend.push_log(log_at(REGISTRY, event.encode_log_data(), block, index));
    }

    #[tokio::test]
    async fn test_filter_ownership_by_new_owner() {
        let backend = Arc::new(MockBackend::default());
        emit(
            &backend,
            &OwnershipTransferred {
                previousOwner: Address::ZERO,
                newOwner: ALICE,
            },
            10,
            0,
        );
        emit(
            &backend,
            &OwnershipTransferred {
                previousOwner: ALICE,
                newOwner: BOB,
            },
            11,
            0,
        );

        let filterer = RegistryFilterer::new(REGISTRY, backend.clone()).unwrap();
        let mut it = filterer
            .filter_ownership_transferred(&FilterOpts::default(), &[], &[BOB])
            .await
            .unwrap();

        assert!(it.next().await);
        let event = it.event().unwrap();
        assert_eq!(event.previousOwner, ALICE);
        assert_eq!(event.newOwner, BOB);
        assert_eq!(event.raw.block_number, Some(11));
        assert!(!it.next().await);

        let queries = backend.queries();
        let query = &queries[0];
        assert_eq!(
            query.topics,
            vec![
                vec![OwnershipTransferred::SIGNATURE_HASH],
                vec![],
                vec![BOB.into_word()]
            ]
        );
        assert_eq!(query.from_block, Some(0));
        assert_eq!(query.to_block, None);
    }

    #[tokio::test]
    async fn test_filter_skips_other_events() {
        let backend = Arc::new(MockBackend::default());
        let key = B256::repeat_byte(0x0b);
        emit(&backend, &Initialized { version: 1 }, 5, 0);
        emit(
            &backend,
            &EntrySet {
                key,
                target: ALICE,
                version: 1,
            },
            6,
            0,
        );
        emit(&backend, &EntryRemoved { key }, 7, 0);
        emit(
            &backend,
            &EntrySet {
                key,
                target: BOB,
                version: 2,
            },
            8,
            1,
        );

        let filterer = RegistryFilterer::new(REGISTRY, backend).unwrap();

        let mut sets = filterer
            .filter_entry_set(&FilterOpts::default(), &[key], &[])
            .await
            .unwrap();
        let mut versions = Vec::new();
        while sets.next().await {
            versions.push(sets.event().unwrap().version);
        }
        assert_eq!(versions, vec![1, 2]);

        let mut inits = filterer
            .filter_initialized(&FilterOpts {
                start: 6,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!inits.next().await);
        assert!(inits.error().is_none());

        let mut removed = filterer
            .filter_entry_removed(&FilterOpts::default(), &[])
            .await
            .unwrap();
        assert!(removed.next().await);
        assert_eq!(removed.event().unwrap().key, key);
    }

    #[tokio::test]
    async fn test_watch_forwards_and_quits() {
        let backend = Arc::new(MockBackend::default());
        let filterer = RegistryFilterer::new(REGISTRY, backend.clone()).unwrap();

        let (sink, mut events) = mpsc::channel(4);
        let mut watch = filterer
            .watch_entry_removed(&WatchOpts::default(), sink, &[])
            .await
            .unwrap();

        let feed = backend.take_feed().unwrap();
        let key = B256::repeat_byte(0x77);
        feed.logs
            .send(log_at(REGISTRY, EntryRemoved { key }.encode_log_data(), 3, 0))
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.key, key);

        watch.unsubscribe();
        assert!(watch.wait().await.is_ok());
    }

    #[test]
    fn test_parse_checks_signature() {
        let backend = Arc::new(MockBackend::default());
        let filterer = RegistryFilterer::new(REGISTRY, backend).unwrap();

        let log = log_at(REGISTRY, Initialized { version: 4 }.encode_log_data(), 1, 0);
        assert_eq!(filterer.parse_initialized(log.clone()).unwrap().version, 4);
        assert!(matches!(
            filterer.parse_entry_removed(log),
            Err(BindError::EventSignature { .. })
        ));
    }
}
