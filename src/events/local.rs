//! Process-local event bus driver.
//!
//! [`LocalEventBus`] keeps its [`SubscriptionRegistry`] behind a
//! reader-writer lock: `subscribe` takes the write side, `publish` takes
//! the read side just long enough to collect the matching callbacks.
//!
//! Delivery goes through a fixed pool of worker tasks fed by an unbounded
//! queue. `publish` never waits for subscribers and never applies
//! back-pressure, while the number of tasks stays constant under load.
//! Workers pull deliveries independently, so there is no ordering across
//! subscribers or across successive events. A panicking callback is
//! caught and logged; the worker moves on to the next delivery.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{Mutex, mpsc};

use super::driver::{EventBusDriver, Payload, RawCallback};
use super::registry::SubscriptionRegistry;
use super::topic::{DEFAULT_SEPARATOR, Topic, validate_separator};
use crate::error::EventError;

/// Settings for [`LocalEventBus`].
#[derive(Debug, Clone)]
pub struct LocalBusConfig {
    /// Separator joining the three subject segments.
    pub separator: String,
    /// Number of dispatch worker tasks (at least one is always started).
    pub workers: usize,
}

impl Default for LocalBusConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            workers: 8,
        }
    }
}

impl LocalBusConfig {
    /// Sets the subject separator (builder pattern).
    #[must_use]
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the worker count (builder pattern).
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}

/// One callback invocation waiting for a worker.
struct Delivery {
    subject: String,
    payload: Payload,
    callback: RawCallback,
}

/// In-memory publish/subscribe driver.
#[derive(Debug)]
pub struct LocalEventBus {
    registry: RwLock<SubscriptionRegistry>,
    separator: String,
    queue: mpsc::UnboundedSender<Delivery>,
    workers: usize,
}

impl LocalEventBus {
    /// Creates the bus and starts its worker tasks on the current runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidSeparator`] unless the separator is one
    /// of [`super::topic::SEPARATORS`], and [`EventError::NoRuntime`] when
    /// called outside a tokio runtime.
    pub fn new(config: LocalBusConfig) -> Result<Self, EventError> {
        validate_separator(&config.separator)?;
        let handle = tokio::runtime::Handle::try_current().map_err(|_| EventError::NoRuntime)?;

        let workers = config.workers.max(1);
        let (queue, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        for worker in 0..workers {
            handle.spawn(run_worker(worker, Arc::clone(&receiver)));
        }

        tracing::debug!(workers, separator = %config.separator, "event bus started");
        Ok(Self {
            registry: RwLock::new(SubscriptionRegistry::new()),
            separator: config.separator,
            queue,
            workers,
        })
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Number of dispatch worker tasks.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers
    }
}

impl EventBusDriver for LocalEventBus {
    fn separator(&self) -> &str {
        &self.separator
    }

    fn publish(&self, subject: &str, payload: Payload) -> Result<(), EventError> {
        let topic = Topic::parse(subject, &self.separator)?;
        if !topic.is_concrete() {
            return Err(EventError::InvalidTopic(subject.to_string()));
        }

        let callbacks = self.registry.read().matches(&topic);
        tracing::debug!(%subject, subscribers = callbacks.len(), "publishing event");

        for callback in callbacks {
            let delivery = Delivery {
                subject: subject.to_string(),
                payload: Arc::clone(&payload),
                callback,
            };
            self.queue.send(delivery).map_err(|_| EventError::Closed)?;
        }
        Ok(())
    }

    fn subscribe(&self, subject: &str, callback: RawCallback) -> Result<(), EventError> {
        let pattern = Topic::parse(subject, &self.separator)?;
        self.registry.write().insert(&pattern, callback);
        tracing::debug!(%subject, "subscription registered");
        Ok(())
    }
}

async fn run_worker(worker: usize, receiver: Arc<Mutex<mpsc::UnboundedReceiver<Delivery>>>) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(Delivery {
            subject,
            payload,
            callback,
        }) = next
        else {
            break;
        };

        let call = AssertUnwindSafe(async { callback(subject.clone(), payload).await });
        if call.catch_unwind().await.is_err() {
            tracing::warn!(worker, %subject, "event subscriber panicked");
        }
    }
    tracing::debug!(worker, "event bus worker stopped");
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::timeout;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct TestPayload {
        id: u32,
        name: String,
    }

    fn dotted_bus() -> LocalEventBus {
        let Ok(bus) = LocalEventBus::new(LocalBusConfig::default().separator(".").workers(4)) else {
            panic!("bus creation failed");
        };
        bus
    }

    /// Callback forwarding `(subject, payload)` into a channel.
    fn forwarding() -> (RawCallback, UnboundedReceiver<(String, Payload)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: RawCallback = Arc::new(move |subject: String, payload: Payload| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((subject, payload));
            }
            .boxed()
        });
        (callback, rx)
    }

    async fn received(rx: &mut UnboundedReceiver<(String, Payload)>) -> Option<(String, Payload)> {
        timeout(Duration::from_millis(500), rx.recv()).await.ok().flatten()
    }

    async fn nothing_received(rx: &mut UnboundedReceiver<(String, Payload)>) -> bool {
        timeout(Duration::from_millis(100), rx.recv()).await.is_err()
    }

    #[test]
    fn new_outside_runtime_fails() {
        let result = LocalEventBus::new(LocalBusConfig::default());
        assert_eq!(result.err(), Some(EventError::NoRuntime));
    }

    #[tokio::test]
    async fn unsafe_separators_are_rejected() {
        for separator in ["", "*", "-"] {
            let result = LocalEventBus::new(LocalBusConfig::default().separator(separator));
            assert_eq!(
                result.err(),
                Some(EventError::InvalidSeparator(separator.to_string()))
            );
        }
    }

    #[tokio::test]
    async fn exact_subscription_receives_payload_once() {
        let bus = dotted_bus();
        let (callback, mut rx) = forwarding();
        assert_ok!(bus.subscribe("test.1.create", callback));

        let payload = TestPayload {
            id: 1,
            name: "Abc".to_string(),
        };
        assert_ok!(bus.publish("test.1.create", Arc::new(payload.clone())));

        let Some((subject, data)) = received(&mut rx).await else {
            panic!("expected delivery");
        };
        assert_eq!(subject, "test.1.create");
        assert_eq!(data.downcast_ref::<TestPayload>(), Some(&payload));
        assert!(nothing_received(&mut rx).await);
    }

    #[tokio::test]
    async fn only_matching_wildcard_fires() {
        let bus = dotted_bus();
        let (any_id, mut any_id_rx) = forwarding();
        let (id_two, mut id_two_rx) = forwarding();
        assert_ok!(bus.subscribe("test.*.create", any_id));
        assert_ok!(bus.subscribe("test.2.*", id_two));

        assert_ok!(bus.publish("test.2.delete", Arc::new("x".to_string())));

        let Some((_, data)) = received(&mut id_two_rx).await else {
            panic!("expected delivery to test.2.*");
        };
        assert_eq!(data.downcast_ref::<String>().map(String::as_str), Some("x"));
        assert!(nothing_received(&mut any_id_rx).await);
    }

    #[tokio::test]
    async fn every_wildcard_form_matches() {
        let bus = dotted_bus();
        let mut receivers = Vec::new();
        for pattern in ["*.b.c", "a.*.c", "a.b.*", "*.*.*"] {
            let (callback, rx) = forwarding();
            assert_ok!(bus.subscribe(pattern, callback));
            receivers.push(rx);
        }
        assert_eq!(bus.subscription_count(), 4);

        assert_ok!(bus.publish("a.b.c", Arc::new(())));
        for rx in &mut receivers {
            assert!(received(rx).await.is_some());
            assert!(nothing_received(rx).await);
        }
    }

    #[tokio::test]
    async fn literal_subscription_ignores_other_topics() {
        let bus = dotted_bus();
        let (callback, mut rx) = forwarding();
        assert_ok!(bus.subscribe("a.b.c", callback));

        assert_ok!(bus.publish("x.b.c", Arc::new(())));
        assert_ok!(bus.publish("d.e.f", Arc::new(())));
        assert!(nothing_received(&mut rx).await);
    }

    #[tokio::test]
    async fn malformed_subjects_are_rejected() {
        let bus = dotted_bus();
        let (callback, mut rx) = forwarding();
        assert_ok!(bus.subscribe("*.*.*", Arc::clone(&callback)));

        assert_eq!(
            bus.publish("invalid", Arc::new(())),
            Err(EventError::InvalidTopic("invalid".to_string()))
        );
        assert_err!(bus.publish("a.*.c", Arc::new(())));
        assert_err!(bus.subscribe("a.b", callback));
        assert_eq!(bus.subscription_count(), 1);
        assert!(nothing_received(&mut rx).await);
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_block_others() {
        let bus = dotted_bus();
        let panicking: RawCallback = Arc::new(|subject: String, _: Payload| {
            async move {
                if subject.starts_with('a') {
                    panic!("subscriber failure");
                }
            }
            .boxed()
        });
        let (callback, mut rx) = forwarding();
        assert_ok!(bus.subscribe("a.b.c", panicking));
        assert_ok!(bus.subscribe("a.*.c", callback));

        for _ in 0..10 {
            assert_ok!(bus.publish("a.b.c", Arc::new(())));
        }
        for _ in 0..10 {
            assert!(received(&mut rx).await.is_some());
        }
    }

    #[tokio::test]
    async fn publish_does_not_wait_for_subscribers() {
        let bus = dotted_bus();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let release_rx = Arc::new(Mutex::new(Some(release_rx)));
        let blocking: RawCallback = Arc::new(move |_: String, _: Payload| {
            let release_rx = Arc::clone(&release_rx);
            async move {
                if let Some(rx) = release_rx.lock().await.take() {
                    let _ = rx.await;
                }
            }
            .boxed()
        });
        assert_ok!(bus.subscribe("a.b.c", blocking));

        let published = timeout(Duration::from_millis(100), async {
            bus.publish("a.b.c", Arc::new(()))
        })
        .await;
        assert!(matches!(published, Ok(Ok(()))));
        let _ = release_tx.send(());
    }
}
