use crate::bind::{
    CallOpts, ContractCaller, ContractFilterer, ContractTransactor, LogQuery, LogSubscription,
    PendingTransaction, SubscriptionFeed, TransactOpts,
};
use crate::config::{Config, GasConfig, NetworkConfig};
use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{BlockId, Filter, Log, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable holding the hex private key used for writes
pub const PRIVATE_KEY_ENV: &str = "REGISTRY_PRIVATE_KEY";

/// JSON-RPC backend for bound contracts
#[derive(Debug, Clone)]
pub struct RpcBackend {
    provider: RootProvider<Http<Client>>,
    rpc_url: String,
    signer: Option<PrivateKeySigner>,
    gas: GasConfig,
    poll_interval: Duration,
    channel_capacity: usize,
}

impl RpcBackend {
    pub fn new(
        network_config: &NetworkConfig,
        signer: Option<PrivateKeySigner>,
        poll_interval: Duration,
        channel_capacity: usize,
    ) -> Result<Self> {
        let url = network_config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network_config.rpc_url, e))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            rpc_url: network_config.rpc_url.clone(),
            signer,
            gas: network_config.gas.clone(),
            poll_interval,
            channel_capacity,
        })
    }

    /// Address of the configured signer, if any
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    pub async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }
}

#[async_trait]
impl ContractCaller for RpcBackend {
    async fn call_contract(&self, opts: &CallOpts, to: Address, input: Bytes) -> Result<Bytes> {
        let mut request = TransactionRequest::default().to(to).input(input.into());
        if let Some(from) = opts.from {
            request = request.from(from);
        }

        let block = opts.block.map_or_else(BlockId::latest, BlockId::number);
        tracing::debug!("eth_call to {:?} at {:?}", to, block);

        Ok(self.provider.call(&request).block(block).await?)
    }
}

#[async_trait]
impl ContractTransactor for RpcBackend {
    async fn send_transaction(
        &self,
        opts: &TransactOpts,
        to: Address,
        input: Bytes,
    ) -> Result<PendingTransaction> {
        let signer = self
            .signer
            .clone()
            .ok_or_else(|| {
                anyhow!(
                    "No signer configured; set {} to send transactions",
                    PRIVATE_KEY_ENV
                )
            })?;
        let from_address = signer.address();
        if let Some(from) = opts.from {
            if from != from_address {
                return Err(anyhow!(
                    "Requested sender {:?} does not match the configured signer {:?}",
                    from,
                    from_address
                ));
            }
        }

        let url = self
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", self.rpc_url, e))?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(url);

        let mut tx_request = TransactionRequest::default()
            .to(to)
            .input(input.into());

        if let Some(value) = opts.value {
            tx_request = tx_request.value(value);
        }

        if let Some(nonce) = opts.nonce {
            tx_request = tx_request.with_nonce(nonce);
        }

        if let Some(gas) = opts.gas_limit {
            tx_request = tx_request.with_gas_limit(gas);
        } else {
            match self
                .provider
                .estimate_gas(&tx_request.clone().from(from_address))
                .await
            {
                Ok(estimated_gas) => {
                    tx_request = tx_request.with_gas_limit(estimated_gas);
                }
                Err(e) => {
                    tracing::warn!("Gas estimation failed, using default: {}", e);
                    tx_request = tx_request.with_gas_limit(self.gas.default_gas_limit);
                }
            }
        }

        tx_request = apply_gas_pricing(tx_request, opts.gas_price, &self.gas);

        tracing::info!("Sending transaction from {:?} to {:?}", from_address, to);
        let pending_tx = provider.send_transaction(tx_request).await?;
        let hash = *pending_tx.tx_hash();
        tracing::info!("Transaction sent with hash: {:?}", hash);

        Ok(PendingTransaction { hash })
    }
}

/// Price a transaction from an explicit legacy gas price or the network's gas settings.
///
/// With both `max_gas_price` and `priority_fee` configured the request becomes an
/// EIP-1559 transaction capped at `max_gas_price`. A lone `max_gas_price` is used as
/// a legacy gas price. Fields left unset are filled by the provider.
fn apply_gas_pricing(
    tx_request: TransactionRequest,
    gas_price: Option<u128>,
    gas: &GasConfig,
) -> TransactionRequest {
    if let Some(gas_price) = gas_price {
        return tx_request.with_gas_price(gas_price);
    }

    match (gas.max_gas_price, gas.priority_fee) {
        (Some(max_fee), Some(priority_fee)) => tx_request
            .with_max_fee_per_gas(max_fee as u128)
            .with_max_priority_fee_per_gas(priority_fee.min(max_fee) as u128),
        (Some(max_fee), None) => tx_request.with_gas_price(max_fee as u128),
        (None, Some(priority_fee)) => {
            tx_request.with_max_priority_fee_per_gas(priority_fee as u128)
        }
        (None, None) => tx_request,
    }
}

#[async_trait]
impl ContractFilterer for RpcBackend {
    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        let filter = query_to_filter(query);
        let logs = self.provider.get_logs(&filter).await?;
        tracing::debug!("eth_getLogs returned {} logs for {:?}", logs.len(), query.address);
        Ok(logs)
    }

    async fn subscribe_logs(&self, query: &LogQuery) -> Result<LogSubscription> {
        let filter = query_to_filter(query);
        let poller = self
            .provider
            .watch_logs(&filter)
            .await
            .context("Failed to install log filter")?
            .with_poll_interval(self.poll_interval);

        let (feed, subscription) = LogSubscription::channel(self.channel_capacity);
        tokio::spawn(forward_logs(poller.into_stream(), feed));

        tracing::debug!(
            "Polling logs for {:?} every {:?}",
            query.address,
            self.poll_interval
        );
        Ok(subscription)
    }
}

/// Translate a binding log query into an RPC filter
pub fn query_to_filter(query: &LogQuery) -> Filter {
    let mut filter = Filter::new().address(query.address);

    if let Some(from) = query.from_block {
        filter = filter.from_block(from);
    }
    if let Some(to) = query.to_block {
        filter = filter.to_block(to);
    }

    for (position, topics) in query.topics.iter().enumerate() {
        let topics = topics.clone();
        filter = match position {
            0 => filter.event_signature(topics),
            1 => filter.topic1(topics),
            2 => filter.topic2(topics),
            3 => filter.topic3(topics),
            _ => filter,
        };
    }

    filter
}

/// Pump polled log batches into a subscription feed until the subscriber quits
async fn forward_logs<S>(stream: S, feed: SubscriptionFeed)
where
    S: Stream<Item = Vec<Log>> + Send,
{
    let SubscriptionFeed {
        logs,
        errors,
        mut quit,
    } = feed;
    let mut stream = std::pin::pin!(stream);

    loop {
        tokio::select! {
            biased;

            _ = &mut quit => {
                tracing::debug!("Log subscription closed by subscriber");
                return;
            }
            batch = stream.next() => match batch {
                Some(batch) => {
                    for log in batch {
                        if logs.send(log).await.is_err() {
                            return;
                        }
                    }
                }
                None => {
                    tracing::warn!("Log filter poller stopped");
                    let _ = errors.send(anyhow!("log filter poller stopped")).await;
                    return;
                }
            }
        }
    }
}

/// Load the write signer from the environment, if present
pub fn signer_from_env() -> Result<Option<PrivateKeySigner>> {
    let Ok(key) = std::env::var(PRIVATE_KEY_ENV) else {
        return Ok(None);
    };

    let key = key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);
    let signer = PrivateKeySigner::from_str(key)
        .map_err(|e| anyhow!("Invalid private key in {}: {}", PRIVATE_KEY_ENV, e))?;
    tracing::info!("Loaded signer {:?} from {}", signer.address(), PRIVATE_KEY_ENV);

    Ok(Some(signer))
}

#[derive(Debug)]
pub struct ProviderManager {
    backends: HashMap<String, Arc<RpcBackend>>,
    config: Config,
}

impl ProviderManager {
    pub fn new(config: Config, signer: Option<PrivateKeySigner>) -> Result<Self> {
        let poll_interval = Duration::from_millis(config.watch.poll_interval_ms);
        let mut backends = HashMap::new();

        for (network_name, network_config) in &config.networks {
            let backend = RpcBackend::new(
                network_config,
                signer.clone(),
                poll_interval,
                config.watch.channel_capacity,
            )
            .with_context(|| format!("Failed to create backend for network '{}'", network_name))?;
            backends.insert(network_name.clone(), Arc::new(backend));
        }

        Ok(Self { backends, config })
    }

    pub fn get_backend(&self, network: Option<&str>) -> Result<Arc<RpcBackend>> {
        let network_name = network.unwrap_or(&self.config.default_network);
        self.backends
            .get(network_name)
            .cloned()
            .ok_or_else(|| anyhow!("Network '{}' not found", network_name))
    }

    pub fn get_network_config(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        let network_name = network.unwrap_or(&self.config.default_network);
        self.config
            .networks
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", network_name))
    }

    pub fn get_available_networks(&self) -> Vec<String> {
        let mut networks: Vec<String> = self.config.networks.keys().cloned().collect();
        networks.sort();
        networks
    }

    /// Validates network connectivity with detailed error information
    pub async fn validate_network_connection(&self, network: Option<&str>) -> Result<u64> {
        let network_name = network.unwrap_or(&self.config.default_network);
        let backend = self
            .get_backend(network)
            .map_err(|e| anyhow!("Network '{}' is not configured: {}", network_name, e))?;

        backend.block_number().await.map_err(|e| {
            anyhow!(
                "Cannot connect to network '{}': {}. Please check your RPC endpoint configuration and network connectivity.",
                network_name,
                crate::ethereum::utils::interpret_rpc_error(&e.to_string())
            )
        })
    }
}
