use alloy::sol_types::SolEvent;
use anyhow::anyhow;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{decode_event, BindError, DecodedEvent, LogSubscription};

/// Handle to a background task forwarding decoded events into a sink.
///
/// The task ends cleanly when [`WatchSubscription::unsubscribe`] is called,
/// when the handle is dropped, when the sink is closed or when the backend
/// ends the subscription without error. A subscription or decode failure
/// ends it with that error, observable through [`WatchSubscription::wait`].
#[derive(Debug)]
pub struct WatchSubscription {
    quit: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), BindError>>,
}

impl WatchSubscription {
    pub(crate) fn spawn<E>(subscription: LogSubscription, sink: mpsc::Sender<DecodedEvent<E>>) -> Self
    where
        E: SolEvent + Send + 'static,
    {
        let (quit_tx, quit_rx) = oneshot::channel();
        let handle = tokio::spawn(dispatch(subscription, sink, quit_rx));

        Self {
            quit: Some(quit_tx),
            handle,
        }
    }

    /// Ask the dispatch loop to stop
    pub fn unsubscribe(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the dispatch loop to end and return how it ended
    pub async fn wait(mut self) -> Result<(), BindError> {
        // Keep the loop alive until it ends on its own
        let _quit = self.quit.take();
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(e) => Err(BindError::Subscription(anyhow!("Watch task aborted: {}", e))),
        }
    }
}

async fn dispatch<E>(
    mut subscription: LogSubscription,
    sink: mpsc::Sender<DecodedEvent<E>>,
    mut quit: oneshot::Receiver<()>,
) -> Result<(), BindError>
where
    E: SolEvent + Send + 'static,
{
    let result = loop {
        tokio::select! {
            biased;

            _ = &mut quit => break Ok(()),
            log = subscription.logs.recv() => {
                let Some(log) = log else {
                    // The producer may have reported a failure before closing
                    if let Ok(err) = subscription.errors.try_recv() {
                        warn!("Subscription for {} failed: {}", E::SIGNATURE, err);
                        break Err(BindError::Subscription(err));
                    }
                    break Ok(());
                };
                let event = match decode_event::<E>(log) {
                    Ok(event) => event,
                    Err(err) => break Err(err),
                };
                tokio::select! {
                    sent = sink.send(event) => {
                        if sent.is_err() {
                            debug!("Event sink for {} closed", E::SIGNATURE);
                            break Ok(());
                        }
                    }
                    _ = &mut quit => break Ok(()),
                }
            }
            err = subscription.errors.recv() => match err {
                Some(err) => {
                    warn!("Subscription for {} failed: {}", E::SIGNATURE, err);
                    break Err(BindError::Subscription(err));
                }
                None => break Ok(()),
            },
        }
    };

    subscription.unsubscribe();
    debug!("Stopped watching {}", E::SIGNATURE);
    result
}
