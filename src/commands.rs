//! Command handlers behind `registry-cli`. Each returns JSON for stdout.

use std::future::Future;

use alloy::json_abi::Event;
use alloy::primitives::Address;
use alloy::sol_types::SolEvent;
use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bind::{
    DecodedEvent, EventIterator, FilterOpts, PendingTransaction, WatchOpts, WatchSubscription,
};
use crate::ethereum::utils::{
    parse_key, validate_address, validate_block_range, validate_function_name,
};
use crate::ethereum::EventRecord;
use crate::registry::{RegistrySession, REGISTRY_METADATA};

/// Events declared by the Registry ABI
pub const EVENTS: [&str; 4] = [
    "Initialized",
    "OwnershipTransferred",
    "EntrySet",
    "EntryRemoved",
];

pub struct CommandContext {
    session: RegistrySession,
    allow_writes: bool,
    channel_capacity: usize,
}

impl CommandContext {
    pub fn new(session: RegistrySession, allow_writes: bool, channel_capacity: usize) -> Self {
        Self {
            session,
            allow_writes,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Owner, initialization flag and entry count
    pub async fn status(&self) -> Result<Value> {
        let initialized = self
            .session
            .has_initialized()
            .await
            .context("Failed to read hasInitialized")?;
        let owner = self.session.owner().await.context("Failed to read owner")?;
        let entry_count = self
            .session
            .entry_count()
            .await
            .context("Failed to read entryCount")?;

        Ok(json!({
            "address": self.session.registry().address().to_checksum(None),
            "initialized": initialized,
            "owner": owner.to_checksum(None),
            "entry_count": entry_count.to_string(),
        }))
    }

    pub async fn entry(&self, key: &str) -> Result<Value> {
        let key = parse_key(key)?;
        let entry = self
            .session
            .get_entry(key)
            .await
            .with_context(|| format!("Failed to read entry {:?}", key))?;

        Ok(json!({
            "key": format!("{:?}", key),
            "target": entry.target.to_checksum(None),
            "version": entry.version,
            "active": entry.active,
        }))
    }

    /// Call any view method by name with JSON parameters
    pub async fn call(&self, method: &str, parameters: Option<&str>) -> Result<Value> {
        validate_function_name(method)?;
        let parameters: Value = match parameters {
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| anyhow!("Parameters must be valid JSON: {}", e))?,
            None => Value::Null,
        };

        let result = self
            .session
            .registry()
            .raw()
            .call_json(self.session.call_opts(), method, &parameters)
            .await?;

        Ok(json!({ "method": method, "result": result }))
    }

    /// Historical events in block order
    pub async fn events(&self, from: u64, to: Option<u64>, event: Option<&str>) -> Result<Value> {
        validate_block_range(from, to)?;
        let opts = FilterOpts {
            start: from,
            end: to,
            timeout: self.session.call_opts().timeout,
        };
        let filterer = self.session.registry().filterer();

        let mut records = Vec::new();
        for name in selected_events(event)? {
            let abi_event = REGISTRY_METADATA.event(name)?;
            match name {
                "Initialized" => {
                    let it = filterer.filter_initialized(&opts).await?;
                    collect_records(it, abi_event, &mut records).await?;
                }
                "OwnershipTransferred" => {
                    let it = filterer.filter_ownership_transferred(&opts, &[], &[]).await?;
                    collect_records(it, abi_event, &mut records).await?;
                }
                "EntrySet" => {
                    let it = filterer.filter_entry_set(&opts, &[], &[]).await?;
                    collect_records(it, abi_event, &mut records).await?;
                }
                _ => {
                    let it = filterer.filter_entry_removed(&opts, &[]).await?;
                    collect_records(it, abi_event, &mut records).await?;
                }
            }
        }

        records.sort_by_key(|record| (record.block_number, record.log_index));
        Ok(serde_json::to_value(records)?)
    }

    /// Stream live events to `emit` until `shutdown` resolves or every
    /// subscription ends
    pub async fn watch<F>(
        &self,
        event: Option<&str>,
        mut emit: impl FnMut(EventRecord),
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let (out, mut records) = mpsc::channel(self.channel_capacity);
        let opts = WatchOpts::default();
        let filterer = self.session.registry().filterer();

        let mut watches: Vec<WatchSubscription> = Vec::new();
        for name in selected_events(event)? {
            let abi_event = REGISTRY_METADATA.event(name)?;
            let capacity = self.channel_capacity;
            let watch = match name {
                "Initialized" => {
                    filterer
                        .watch_initialized(&opts, record_sink(&out, abi_event, capacity))
                        .await?
                }
                "OwnershipTransferred" => {
                    filterer
                        .watch_ownership_transferred(
                            &opts,
                            record_sink(&out, abi_event, capacity),
                            &[],
                            &[],
                        )
                        .await?
                }
                "EntrySet" => {
                    filterer
                        .watch_entry_set(&opts, record_sink(&out, abi_event, capacity), &[], &[])
                        .await?
                }
                _ => {
                    filterer
                        .watch_entry_removed(&opts, record_sink(&out, abi_event, capacity), &[])
                        .await?
                }
            };
            info!("Watching {} events", name);
            watches.push(watch);
        }
        drop(out);

        tokio::pin!(shutdown);
        let mut result = Ok(());
        loop {
            tokio::select! {
                record = records.recv() => match record {
                    Some(Ok(record)) => emit(record),
                    Some(Err(e)) => {
                        result = Err(e);
                        break;
                    }
                    None => break,
                },
                _ = &mut shutdown => {
                    info!("Stopping watch");
                    break;
                }
            }
        }

        for mut watch in watches {
            watch.unsubscribe();
            if let Err(e) = watch.wait().await {
                warn!("Watch ended with error: {}", e);
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }
        result
    }

    pub async fn initialize(&self, owner: &str) -> Result<Value> {
        self.ensure_writes_allowed()?;
        let owner = validate_address(owner)?;
        let pending = self.session.initialize(owner).await?;
        Ok(transaction_json("initialize", pending))
    }

    pub async fn set_entry(&self, key: &str, target: &str) -> Result<Value> {
        self.ensure_writes_allowed()?;
        let key = parse_key(key)?;
        let target = validate_address(target)?;
        let pending = self.session.set_entry(key, target).await?;
        Ok(transaction_json("setEntry", pending))
    }

    pub async fn remove_entry(&self, key: &str) -> Result<Value> {
        self.ensure_writes_allowed()?;
        let key = parse_key(key)?;
        let pending = self.session.remove_entry(key).await?;
        Ok(transaction_json("removeEntry", pending))
    }

    pub async fn transfer_ownership(&self, new_owner: &str) -> Result<Value> {
        self.ensure_writes_allowed()?;
        let new_owner: Address = validate_address(new_owner)?;
        let pending = self.session.transfer_ownership(new_owner).await?;
        Ok(transaction_json("transferOwnership", pending))
    }

    fn ensure_writes_allowed(&self) -> Result<()> {
        if self.allow_writes {
            Ok(())
        } else {
            Err(anyhow!(
                "Write operations are disabled. Pass --allow-writes or set security.allow_write_operations = true"
            ))
        }
    }
}

fn selected_events(event: Option<&str>) -> Result<Vec<&'static str>> {
    match event {
        None => Ok(EVENTS.to_vec()),
        Some(name) => EVENTS
            .iter()
            .find(|known| **known == name)
            .map(|known| vec![*known])
            .ok_or_else(|| {
                anyhow!(
                    "Unknown event '{}'. Available events: {}",
                    name,
                    EVENTS.join(", ")
                )
            }),
    }
}

fn transaction_json(method: &str, pending: PendingTransaction) -> Value {
    json!({
        "method": method,
        "transaction_hash": format!("{:?}", pending.hash),
    })
}

async fn collect_records<E: SolEvent>(
    mut it: EventIterator<E>,
    abi_event: &Event,
    records: &mut Vec<EventRecord>,
) -> Result<()> {
    while it.next().await {
        if let Some(decoded) = it.take_event() {
            records.push(EventRecord::from_log(abi_event, &decoded.raw)?);
        }
    }

    match it.error() {
        Some(e) => Err(anyhow!("Event query for {} failed: {}", abi_event.name, e)),
        None => Ok(()),
    }
}

/// Typed sink whose events are rendered and forwarded to `out`.
/// A rendering failure is forwarded as the last item and closes the sink.
fn record_sink<E>(
    out: &mpsc::Sender<Result<EventRecord>>,
    abi_event: &'static Event,
    capacity: usize,
) -> mpsc::Sender<DecodedEvent<E>>
where
    E: Send + 'static,
{
    let (sink, mut events) = mpsc::channel::<DecodedEvent<E>>(capacity);
    let out = out.clone();

    tokio::spawn(async move {
        while let Some(decoded) = events.recv().await {
            let record = EventRecord::from_log(abi_event, &decoded.raw);
            let failed = record.is_err();
            if out.send(record).await.is_err() || failed {
                break;
            }
        }
    });

    sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::{log_at, MockBackend};
    use crate::bind::{decode_event, CallOpts, TransactOpts};
    use crate::registry::{EntryRemoved, EntrySet, IRegistry, Initialized, Registry};
    use alloy::primitives::{address, B256, U256};
    use alloy::sol_types::{SolCall, SolValue};
    use std::sync::Arc;
    use std::time::Duration;

    const REGISTRY: Address = address!("00000000000000000000000000000000000000c5");
    const OWNER: Address = address!("00000000000000000000000000000000000000c6");

    fn context(backend: &Arc<MockBackend>, allow_writes: bool) -> CommandContext {
        let registry = Registry::new(REGISTRY, backend.clone()).unwrap();
        let session = registry.session(
            CallOpts::default(),
            TransactOpts {
                from: Some(OWNER),
                ..Default::default()
            },
        );
        CommandContext::new(session, allow_writes, 8)
    }

    #[tokio::test]
    async fn test_status() {
        let backend = Arc::new(MockBackend::default());
        backend.respond(IRegistry::hasInitializedCall::SELECTOR, true.abi_encode());
        backend.respond(IRegistry::ownerCall::SELECTOR, OWNER.abi_encode());
        backend.respond(IRegistry::entryCountCall::SELECTOR, U256::from(3).abi_encode());

        let status = context(&backend, false).status().await.unwrap();
        assert_eq!(status["initialized"], json!(true));
        assert_eq!(status["owner"], json!(OWNER.to_checksum(None)));
        assert_eq!(status["entry_count"], json!("3"));
    }

    #[tokio::test]
    async fn test_entry_by_label() {
        let backend = Arc::new(MockBackend::default());
        backend.respond(
            IRegistry::getEntryCall::SELECTOR,
            (OWNER, 4u64, true).abi_encode_params(),
        );

        let entry = context(&backend, false).entry("token").await.unwrap();
        assert_eq!(entry["version"], json!(4));
        assert_eq!(entry["active"], json!(true));

        let calls = backend.calls();
        let decoded = IRegistry::getEntryCall::abi_decode(&calls[0].2, true).unwrap();
        assert_eq!(&decoded.key[..5], b"token");
    }

    #[tokio::test]
    async fn test_call_by_name() {
        let backend = Arc::new(MockBackend::default());
        backend.respond(IRegistry::ownerCall::SELECTOR, OWNER.abi_encode());
        let ctx = context(&backend, false);

        let result = ctx.call("owner", None).await.unwrap();
        assert_eq!(result["result"], json!(OWNER.to_checksum(None)));

        assert!(ctx.call("owner", Some("not json")).await.is_err());
        assert!(ctx.call("bad-name", None).await.is_err());
    }

    #[tokio::test]
    async fn test_writes_are_gated() {
        let backend = Arc::new(MockBackend::default());

        let err = context(&backend, false)
            .remove_entry("token")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--allow-writes"));
        assert!(backend.sent().is_empty());

        let ctx = context(&backend, true);
        let tx = ctx
            .transfer_ownership("0x00000000000000000000000000000000000000c7")
            .await
            .unwrap();
        assert_eq!(tx["method"], json!("transferOwnership"));

        let sent = backend.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.from, Some(OWNER));
    }

    #[tokio::test]
    async fn test_events_sorted_across_types() {
        let backend = Arc::new(MockBackend::default());
        let key = B256::repeat_byte(0x21);
        backend.push_log(log_at(
            REGISTRY,
            EntrySet {
                key,
                target: OWNER,
                version: 1,
            }
            .encode_log_data(),
            9,
            0,
        ));
        backend.push_log(log_at(
            REGISTRY,
            Initialized { version: 1 }.encode_log_data(),
            2,
            0,
        ));
        backend.push_log(log_at(REGISTRY, EntryRemoved { key }.encode_log_data(), 9, 1));

        let ctx = context(&backend, false);
        let all = ctx.events(0, None, None).await.unwrap();
        let names: Vec<&str> = all
            .as_array()
            .unwrap()
            .iter()
            .map(|record| record["event"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Initialized", "EntrySet", "EntryRemoved"]);

        let only_removed = ctx.events(0, None, Some("EntryRemoved")).await.unwrap();
        assert_eq!(only_removed.as_array().unwrap().len(), 1);

        assert!(ctx.events(5, Some(1), None).await.is_err());
        assert!(ctx.events(0, None, Some("Transfer")).await.is_err());
    }

    #[tokio::test]
    async fn test_record_sink_forwards_render_failure() {
        let (out, mut records) = mpsc::channel(4);
        // Rendering against the wrong ABI event cannot succeed
        let wrong = REGISTRY_METADATA.event("EntrySet").unwrap();
        let sink = record_sink::<EntryRemoved>(&out, wrong, 4);
        drop(out);

        let log = log_at(
            REGISTRY,
            EntryRemoved {
                key: B256::repeat_byte(0x41),
            }
            .encode_log_data(),
            2,
            0,
        );
        sink.send(decode_event::<EntryRemoved>(log).unwrap())
            .await
            .unwrap();

        let err = records.recv().await.unwrap().unwrap_err();
        assert!(err.to_string().contains("EntrySet"));
        assert!(records.recv().await.is_none());
        assert!(sink.is_closed());
    }

    #[tokio::test]
    async fn test_watch_until_shutdown() {
        let backend = Arc::new(MockBackend::default());
        let ctx = context(&backend, false);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let key = B256::repeat_byte(0x31);
        let feeder = {
            let backend = backend.clone();
            async move {
                let feed = loop {
                    if let Some(feed) = backend.take_feed() {
                        break feed;
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                };
                feed.logs
                    .send(log_at(REGISTRY, EntryRemoved { key }.encode_log_data(), 4, 0))
                    .await
                    .unwrap();
                tokio::time::sleep(Duration::from_millis(50)).await;
                let _ = stop_tx.send(());
                feed
            }
        };

        let mut seen = Vec::new();
        let watch = ctx.watch(
            Some("EntryRemoved"),
            |record| seen.push(record),
            async {
                let _ = stop_rx.await;
            },
        );
        let (result, _feed) = tokio::join!(watch, feeder);

        assert!(result.is_ok());
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].event, "EntryRemoved");
        assert_eq!(seen[0].fields["key"], json!(format!("{:?}", key)));
    }
}
