//! Strongly-typed wrapper over an [`EventBusDriver`].
//!
//! [`EventBus<T>`] derives the entity segment of every topic from
//! [`Entity::TYPE_NAME`] and hands subscribers a `T` instead of a
//! type-erased payload.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::FutureExt;

use super::driver::{EventBusDriver, Payload, RawCallback};
use super::topic::{EventKind, Topic, WILDCARD};
use crate::error::EventError;

/// A domain value that can be published on the bus.
///
/// `TYPE_NAME` is part of the wire contract between publishers and
/// subscribers and must stay stable for the lifetime of a process.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Stable entity type name, used as the first topic segment.
    const TYPE_NAME: &'static str;

    /// Identifier of this instance, used as the second topic segment.
    fn entity_id(&self) -> String;
}

/// Typed publish/subscribe handle for one entity type.
pub struct EventBus<T> {
    driver: Arc<dyn EventBusDriver>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EventBus<T> {
    /// Creates a typed handle over a shared driver.
    #[must_use]
    pub fn new(driver: Arc<dyn EventBusDriver>) -> Self {
        Self {
            driver,
            _entity: PhantomData,
        }
    }

    /// Publishes `value` on `(T::TYPE_NAME, id, kind)`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTopic`] if `id` is empty, contains the
    /// separator, or the resulting subject is rejected by the driver.
    pub fn publish(&self, id: &str, kind: EventKind, value: T) -> Result<(), EventError> {
        if id.is_empty() || id.contains(self.driver.separator()) {
            return Err(EventError::InvalidTopic(self.subject(id, kind.as_str())));
        }
        let payload: Payload = Arc::new(value);
        self.driver
            .publish(&self.subject(id, kind.as_str()), payload)
    }

    /// Publishes `value` under its own [`Entity::entity_id`].
    ///
    /// # Errors
    ///
    /// Same as [`EventBus::publish`].
    pub fn publish_entity(&self, kind: EventKind, value: &T) -> Result<(), EventError> {
        self.publish(&value.entity_id(), kind, value.clone())
    }

    /// Subscribes `callback` to `kinds` for one instance, or for every
    /// instance of `T` when `id` is `None`.
    ///
    /// One raw subscription is registered per kind. Payloads that are not a
    /// `T` are dropped before reaching the callback.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTopic`] if `id` is empty or any of the
    /// subjects does not parse. Nothing is registered in that case.
    pub fn subscribe<F, Fut>(
        &self,
        id: Option<&str>,
        kinds: &[EventKind],
        callback: F,
    ) -> Result<(), EventError>
    where
        F: Fn(EventKind, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = id.unwrap_or(WILDCARD);
        if id.is_empty() {
            return Err(EventError::InvalidTopic(self.subject(id, WILDCARD)));
        }

        let separator = self.driver.separator().to_string();
        let subjects = kinds
            .iter()
            .map(|kind| {
                let subject = self.subject(id, kind.as_str());
                Topic::parse(&subject, &separator).map(|_| subject)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let callback = Arc::new(callback);
        for subject in subjects {
            let callback = Arc::clone(&callback);
            let separator = separator.clone();
            let raw: RawCallback = Arc::new(move |subject: String, payload: Payload| {
                let callback = Arc::clone(&callback);
                let decoded = decode::<T>(&subject, &separator, &payload);
                async move {
                    if let Some((kind, value)) = decoded {
                        callback(kind, value).await;
                    }
                }
                .boxed()
            });
            self.driver.subscribe(&subject, raw)?;
        }
        Ok(())
    }

    fn subject(&self, id: &str, kind: &str) -> String {
        [T::TYPE_NAME, id, kind].join(self.driver.separator())
    }
}

/// Recovers the event kind and typed value from a raw delivery.
fn decode<T: Entity>(subject: &str, separator: &str, payload: &Payload) -> Option<(EventKind, T)> {
    let kind = Topic::parse(subject, separator)
        .and_then(|topic| topic.kind().parse::<EventKind>())
        .ok()?;
    let Some(value) = payload.downcast_ref::<T>() else {
        tracing::debug!(%subject, expected = T::TYPE_NAME, "dropping event with mismatched payload");
        return None;
    };
    Some((kind, value.clone()))
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("entity", &T::TYPE_NAME)
            .field("driver", &self.driver)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;
    use tokio_test::assert_ok;

    use super::*;
    use crate::events::{LocalBusConfig, LocalEventBus};

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        id: u64,
        name: String,
    }

    impl Entity for Widget {
        const TYPE_NAME: &'static str = "widgets";

        fn entity_id(&self) -> String {
            self.id.to_string()
        }
    }

    fn driver() -> Arc<LocalEventBus> {
        let Ok(bus) = LocalEventBus::new(LocalBusConfig::default()) else {
            panic!("bus creation failed");
        };
        Arc::new(bus)
    }

    fn widget(id: u64) -> Widget {
        Widget {
            id,
            name: format!("widget-{id}"),
        }
    }

    fn collecting(
        bus: &EventBus<Widget>,
        id: Option<&str>,
        kinds: &[EventKind],
    ) -> mpsc::UnboundedReceiver<(EventKind, Widget)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let result = bus.subscribe(id, kinds, move |kind, value| {
            let tx = tx.clone();
            async move {
                let _ = tx.send((kind, value));
            }
        });
        assert_ok!(result);
        rx
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<(EventKind, Widget)>) -> Option<(EventKind, Widget)> {
        timeout(Duration::from_millis(500), rx.recv()).await.ok().flatten()
    }

    #[tokio::test]
    async fn wildcard_id_receives_every_instance() {
        let driver = driver();
        let bus = EventBus::<Widget>::new(driver);
        let mut rx = collecting(&bus, None, &EventKind::ALL);

        assert_ok!(bus.publish("1", EventKind::Create, widget(1)));
        let Some((kind, value)) = next(&mut rx).await else {
            panic!("expected create event");
        };
        assert_eq!(kind, EventKind::Create);
        assert_eq!(value, widget(1));

        assert_ok!(bus.publish_entity(EventKind::Delete, &widget(2)));
        let Some((kind, value)) = next(&mut rx).await else {
            panic!("expected delete event");
        };
        assert_eq!(kind, EventKind::Delete);
        assert_eq!(value.id, 2);
    }

    #[tokio::test]
    async fn specific_id_and_kind_filter() {
        let driver = driver();
        let bus = EventBus::<Widget>::new(driver);
        let mut rx = collecting(&bus, Some("7"), &[EventKind::Update]);

        assert_ok!(bus.publish("8", EventKind::Update, widget(8)));
        assert_ok!(bus.publish("7", EventKind::Create, widget(7)));
        assert_ok!(bus.publish("7", EventKind::Update, widget(7)));

        let Some((kind, value)) = next(&mut rx).await else {
            panic!("expected update for 7");
        };
        assert_eq!((kind, value.id), (EventKind::Update, 7));
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn empty_id_is_rejected() {
        let driver = driver();
        let bus = EventBus::<Widget>::new(Arc::clone(&driver) as Arc<dyn EventBusDriver>);
        let result = bus.publish("", EventKind::Create, widget(1));
        assert!(matches!(result, Err(EventError::InvalidTopic(_))));

        let result = bus.subscribe(Some(""), &[EventKind::Create], |_, _| async {});
        assert!(matches!(result, Err(EventError::InvalidTopic(_))));
        assert_eq!(driver.subscription_count(), 0);
    }

    #[tokio::test]
    async fn id_containing_separator_registers_nothing() {
        let driver = driver();
        let bus = EventBus::<Widget>::new(Arc::clone(&driver) as Arc<dyn EventBusDriver>);

        let result = bus.subscribe(Some("a:b"), &EventKind::ALL, |_, _| async {});
        assert_eq!(
            result,
            Err(EventError::InvalidTopic("widgets:a:b:create".to_string()))
        );
        assert_eq!(driver.subscription_count(), 0);

        let result = bus.publish("a:b", EventKind::Update, widget(1));
        assert!(matches!(result, Err(EventError::InvalidTopic(_))));
    }

    #[tokio::test]
    async fn mismatched_payload_is_dropped() {
        let driver = driver();
        let bus = EventBus::<Widget>::new(Arc::clone(&driver) as Arc<dyn EventBusDriver>);
        let mut rx = collecting(&bus, None, &[EventKind::Create]);

        let raw: Payload = Arc::new("not a widget".to_string());
        assert_ok!(driver.publish("widgets:1:create", raw));
        assert!(timeout(Duration::from_millis(100), rx.recv()).await.is_err());
    }

    #[tokio::test]
    async fn one_raw_subscription_per_kind() {
        let driver = driver();
        let bus = EventBus::<Widget>::new(Arc::clone(&driver) as Arc<dyn EventBusDriver>);
        let _rx = collecting(&bus, None, &EventKind::ALL);
        assert_eq!(driver.subscription_count(), 3);
    }
}
