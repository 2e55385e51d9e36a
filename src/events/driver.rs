//! Raw, payload-erased transport contract.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::EventError;

/// Type-erased event payload shared by every matched subscriber.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Callback invoked with the published subject and payload.
pub type RawCallback = Arc<dyn Fn(String, Payload) -> BoxFuture<'static, ()> + Send + Sync>;

/// Publish/subscribe transport addressed by three-segment subjects.
///
/// A process-local implementation is [`super::LocalEventBus`]; a broker
/// backed one can be swapped in without touching [`super::EventBus`].
pub trait EventBusDriver: Send + Sync + fmt::Debug {
    /// Separator joining the three subject segments.
    fn separator(&self) -> &str;

    /// Delivers `payload` to every subscriber whose pattern matches
    /// `subject`. Returns before the callbacks have necessarily run.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTopic`] for a malformed or non-concrete
    /// subject; nothing is dispatched in that case.
    fn publish(&self, subject: &str, payload: Payload) -> Result<(), EventError>;

    /// Registers `callback` for the (possibly wildcarded) `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidTopic`] for a malformed subject; nothing
    /// is registered in that case.
    fn subscribe(&self, subject: &str, callback: RawCallback) -> Result<(), EventError>;
}
