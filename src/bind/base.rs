use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, Bytes, B256};
use alloy::rpc::types::Log;
use alloy::sol_types::{SolCall, SolEvent};
use tokio::sync::mpsc;
use tracing::debug;

use super::{
    decode_event, BindError, CallOpts, ContractCaller, ContractFilterer, ContractTransactor,
    DecodedEvent, EventIterator, FilterOpts, LogQuery, LogSubscription, PendingTransaction,
    TransactOpts, WatchOpts, WatchSubscription,
};

/// A contract address bound to the backends that can reach it.
///
/// Any backend may be absent; using a missing capability fails with
/// [`BindError::MissingBackend`]. Cloning is cheap and clones share the
/// same backends.
#[derive(Clone)]
pub struct BoundContract {
    address: Address,
    abi: &'static JsonAbi,
    caller: Option<Arc<dyn ContractCaller>>,
    transactor: Option<Arc<dyn ContractTransactor>>,
    filterer: Option<Arc<dyn ContractFilterer>>,
}

impl fmt::Debug for BoundContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundContract")
            .field("address", &self.address)
            .field("caller", &self.caller.is_some())
            .field("transactor", &self.transactor.is_some())
            .field("filterer", &self.filterer.is_some())
            .finish()
    }
}

impl BoundContract {
    pub fn new(
        address: Address,
        abi: &'static JsonAbi,
        caller: Option<Arc<dyn ContractCaller>>,
        transactor: Option<Arc<dyn ContractTransactor>>,
        filterer: Option<Arc<dyn ContractFilterer>>,
    ) -> Self {
        Self {
            address,
            abi,
            caller,
            transactor,
            filterer,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &'static JsonAbi {
        self.abi
    }

    fn caller(&self) -> Result<&Arc<dyn ContractCaller>, BindError> {
        self.caller
            .as_ref()
            .ok_or(BindError::MissingBackend("caller"))
    }

    fn transactor(&self) -> Result<&Arc<dyn ContractTransactor>, BindError> {
        self.transactor
            .as_ref()
            .ok_or(BindError::MissingBackend("transactor"))
    }

    fn filterer(&self) -> Result<&Arc<dyn ContractFilterer>, BindError> {
        self.filterer
            .as_ref()
            .ok_or(BindError::MissingBackend("filterer"))
    }

    /// Invoke a read-only method and decode its return values
    pub async fn call<C: SolCall>(&self, opts: &CallOpts, call: &C) -> Result<C::Return, BindError> {
        debug!("Calling {} on {:?}", C::SIGNATURE, self.address);
        let output = self.raw_call(opts, call.abi_encode().into()).await?;

        C::abi_decode_returns(&output, true).map_err(|source| {
            if output.is_empty() {
                BindError::EmptyOutput {
                    method: C::SIGNATURE,
                    address: self.address,
                }
            } else {
                BindError::Decode {
                    context: format!("return value of {}", C::SIGNATURE),
                    source,
                }
            }
        })
    }

    /// Invoke a read-only call with pre-encoded input
    pub async fn raw_call(&self, opts: &CallOpts, input: Bytes) -> Result<Bytes, BindError> {
        let caller = self.caller()?;
        with_timeout(opts.timeout, caller.call_contract(opts, self.address, input)).await
    }

    /// Invoke a state-changing method
    pub async fn transact<C: SolCall>(
        &self,
        opts: &TransactOpts,
        call: &C,
    ) -> Result<PendingTransaction, BindError> {
        debug!("Transacting {} on {:?}", C::SIGNATURE, self.address);
        self.raw_transact(opts, call.abi_encode().into()).await
    }

    /// Send a transaction with pre-encoded calldata
    pub async fn raw_transact(
        &self,
        opts: &TransactOpts,
        input: Bytes,
    ) -> Result<PendingTransaction, BindError> {
        let transactor = self.transactor()?;
        let pending = with_timeout(
            opts.timeout,
            transactor.send_transaction(opts, self.address, input),
        )
        .await?;

        debug!("Broadcast transaction {:?}", pending.hash);
        Ok(pending)
    }

    /// Send value to the contract without calldata, hitting its receive or fallback function
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<PendingTransaction, BindError> {
        self.raw_transact(opts, Bytes::new()).await
    }

    /// Log query for event `E` on this contract; `indexed` holds the accepted
    /// values for each indexed argument in declaration order
    pub fn event_query<E: SolEvent>(
        &self,
        from_block: Option<u64>,
        to_block: Option<u64>,
        indexed: Vec<Vec<B256>>,
    ) -> LogQuery {
        let mut topics = Vec::with_capacity(indexed.len() + 1);
        if !E::ANONYMOUS {
            topics.push(vec![E::SIGNATURE_HASH]);
        }
        topics.extend(indexed);

        while topics.last().map_or(false, |accepted| accepted.is_empty()) {
            topics.pop();
        }

        LogQuery {
            address: self.address,
            from_block,
            to_block,
            topics,
        }
    }

    /// Query historical logs of event `E` and iterate over them
    pub async fn filter_logs<E: SolEvent>(
        &self,
        opts: &FilterOpts,
        indexed: Vec<Vec<B256>>,
    ) -> Result<EventIterator<E>, BindError> {
        let filterer = self.filterer()?;
        let query = self.event_query::<E>(Some(opts.start), opts.end, indexed);
        let logs = with_timeout(opts.timeout, filterer.filter_logs(&query)).await?;

        debug!(
            "Fetched {} {} logs from block {} to {:?}",
            logs.len(),
            E::SIGNATURE,
            opts.start,
            opts.end
        );
        Ok(EventIterator::new(LogSubscription::from_logs(logs)))
    }

    /// Subscribe to future logs of event `E`, iterating over them as they arrive
    pub async fn subscribe_logs<E: SolEvent>(
        &self,
        opts: &WatchOpts,
        indexed: Vec<Vec<B256>>,
    ) -> Result<EventIterator<E>, BindError> {
        let filterer = self.filterer()?;
        let query = self.event_query::<E>(opts.start, None, indexed);
        let subscription = filterer.subscribe_logs(&query).await?;
        Ok(EventIterator::new(subscription))
    }

    /// Forward future logs of event `E` into `sink` from a background task
    pub async fn watch_logs<E>(
        &self,
        opts: &WatchOpts,
        sink: mpsc::Sender<DecodedEvent<E>>,
        indexed: Vec<Vec<B256>>,
    ) -> Result<WatchSubscription, BindError>
    where
        E: SolEvent + Send + 'static,
    {
        let filterer = self.filterer()?;
        let query = self.event_query::<E>(opts.start, None, indexed);
        let subscription = filterer.subscribe_logs(&query).await?;

        debug!("Watching {} on {:?}", E::SIGNATURE, self.address);
        Ok(WatchSubscription::spawn(subscription, sink))
    }

    /// Decode one already retrieved log as event `E`
    pub fn unpack_log<E: SolEvent>(&self, log: Log) -> Result<DecodedEvent<E>, BindError> {
        decode_event(log)
    }
}

async fn with_timeout<T>(
    timeout: Option<Duration>,
    request: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, BindError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, request)
            .await
            .map_err(|_| BindError::Timeout(limit))?
            .map_err(BindError::Backend),
        None => request.await.map_err(BindError::Backend),
    }
}
