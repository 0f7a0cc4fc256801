use std::marker::PhantomData;

use alloy::sol_types::SolEvent;

use super::{decode_event, BindError, DecodedEvent, LogSubscription};

/// Forward-only cursor over the logs of one event type.
///
/// Created by `filter_*` (historical) or `subscribe_logs` (live) calls.
/// Once the underlying subscription ends the iterator drains whatever is
/// already buffered and then stops for good. A subscription or decode
/// failure stops it immediately; see [`EventIterator::error`].
#[derive(Debug)]
pub struct EventIterator<E> {
    subscription: LogSubscription,
    event: Option<DecodedEvent<E>>,
    done: bool,
    fail: Option<BindError>,
    _event: PhantomData<fn() -> E>,
}

impl<E: SolEvent> EventIterator<E> {
    pub(crate) fn new(subscription: LogSubscription) -> Self {
        Self {
            subscription,
            event: None,
            done: false,
            fail: None,
            _event: PhantomData,
        }
    }

    /// Advance to the next event. Returns false once the stream is
    /// exhausted or has failed; later calls keep returning false.
    pub async fn next(&mut self) -> bool {
        loop {
            if self.fail.is_some() {
                return false;
            }

            if self.done {
                return match self.subscription.logs.try_recv() {
                    Ok(log) => self.decode(log),
                    Err(_) => false,
                };
            }

            tokio::select! {
                biased;

                log = self.subscription.logs.recv() => match log {
                    Some(log) => return self.decode(log),
                    None => {
                        // Producer is gone; pick up a final error if it left one
                        self.done = true;
                        if let Ok(err) = self.subscription.errors.try_recv() {
                            self.fail = Some(BindError::Subscription(err));
                        }
                    }
                },
                err = self.subscription.errors.recv() => {
                    self.done = true;
                    if let Some(err) = err {
                        self.fail = Some(BindError::Subscription(err));
                    }
                }
            }
        }
    }

    fn decode(&mut self, log: alloy::rpc::types::Log) -> bool {
        match decode_event::<E>(log) {
            Ok(event) => {
                self.event = Some(event);
                true
            }
            Err(err) => {
                self.fail = Some(err);
                false
            }
        }
    }

    /// Event produced by the last successful [`EventIterator::next`]
    pub fn event(&self) -> Option<&DecodedEvent<E>> {
        self.event.as_ref()
    }

    pub fn take_event(&mut self) -> Option<DecodedEvent<E>> {
        self.event.take()
    }

    /// Failure that stopped iteration, if any
    pub fn error(&self) -> Option<&BindError> {
        self.fail.as_ref()
    }

    /// Stop the underlying subscription. Buffered events can still be read.
    pub fn close(&mut self) {
        self.subscription.unsubscribe();
        self.done = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::log_at;
    use alloy::primitives::{address, Address, Bytes, LogData, B256};
    use alloy::sol;
    use anyhow::anyhow;
    use std::time::Duration;

    sol! {
        #[derive(Debug, PartialEq, Eq)]
        event Ping(uint64 indexed seq);
    }

    const EMITTER: Address = address!("00000000000000000000000000000000000000dd");

    fn ping(seq: u64) -> alloy::rpc::types::Log {
        log_at(EMITTER, Ping { seq }.encode_log_data(), seq, 0)
    }

    #[tokio::test]
    async fn test_empty_closed_channel_ends() {
        let mut it = EventIterator::<Ping>::new(LogSubscription::from_logs(vec![]));

        let next = tokio::time::timeout(Duration::from_secs(1), it.next())
            .await
            .expect("next() must not block on a closed subscription");
        assert!(!next);
        assert!(it.error().is_none());
        assert!(!it.next().await);
    }

    #[tokio::test]
    async fn test_drains_in_delivery_order() {
        let logs = vec![ping(3), ping(1), ping(2)];
        let mut it = EventIterator::<Ping>::new(LogSubscription::from_logs(logs));

        let mut seen = Vec::new();
        while it.next().await {
            seen.push(it.event().unwrap().seq);
        }
        assert_eq!(seen, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_live_logs_then_clean_end() {
        let (feed, subscription) = LogSubscription::channel(4);
        let mut it = EventIterator::<Ping>::new(subscription);

        feed.logs.send(ping(1)).await.unwrap();
        assert!(it.next().await);
        assert_eq!(it.event().unwrap().seq, 1);

        // Logs buffered before the producer stops are still delivered
        feed.logs.send(ping(2)).await.unwrap();
        drop(feed);
        assert!(it.next().await);
        assert_eq!(it.take_event().unwrap().seq, 2);
        assert!(!it.next().await);
        assert!(it.error().is_none());
    }

    #[tokio::test]
    async fn test_subscription_error_is_terminal() {
        let (feed, subscription) = LogSubscription::channel(4);
        let mut it = EventIterator::<Ping>::new(subscription);

        feed.errors.send(anyhow!("filter not found")).await.unwrap();
        assert!(!it.next().await);
        assert!(matches!(it.error(), Some(BindError::Subscription(_))));

        // Failed iterators never resume
        feed.logs.send(ping(9)).await.unwrap();
        assert!(!it.next().await);
    }

    #[tokio::test]
    async fn test_decode_failure_stops_iteration() {
        let garbage = log_at(
            EMITTER,
            LogData::new_unchecked(vec![B256::repeat_byte(1)], Bytes::new()),
            1,
            0,
        );
        let mut it =
            EventIterator::<Ping>::new(LogSubscription::from_logs(vec![garbage, ping(2)]));

        assert!(!it.next().await);
        assert!(matches!(it.error(), Some(BindError::EventSignature { .. })));
        assert!(!it.next().await);
    }

    #[tokio::test]
    async fn test_close_unsubscribes() {
        let (feed, subscription) = LogSubscription::channel(4);
        let mut it = EventIterator::<Ping>::new(subscription);

        feed.logs.send(ping(5)).await.unwrap();
        it.close();
        assert!(feed.quit.await.is_ok());

        assert!(it.next().await);
        assert_eq!(it.event().unwrap().seq, 5);
        assert!(!it.next().await);
    }
}
