//! Host lifecycle and events pushed to the renderer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, watch};

use crate::operation::OperationName;

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Terminal state of the host process.
///
/// Once terminated the host never comes back: [`terminate`](Self::terminate)
/// is one-way and every clone observes it.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    tx: Arc<watch::Sender<bool>>,
}

impl Lifecycle {
    /// A running lifecycle.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Mark the host terminated. Returns `true` only for the call that
    /// actually performed the transition.
    pub fn terminate(&self) -> bool {
        self.tx.send_if_modified(|terminated| {
            if *terminated {
                false
            } else {
                *terminated = true;
                true
            }
        })
    }

    /// Whether the host has been terminated.
    #[inline]
    pub fn is_terminated(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the host is terminated.
    pub async fn terminated(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns once set.
        let _ = rx.wait_for(|terminated| *terminated).await;
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// A named notification from host to renderer, e.g. `ui:onFinishLogin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    /// `namespace:event` name.
    pub name: OperationName,
    /// Event payload (`null` when the event carries nothing).
    pub payload: Value,
}

/// Fan-out of host events to every subscriber.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<HostEvent>,
}

impl EventSink {
    /// Create a sink that buffers up to `capacity` events per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns how many subscribers received it; having
    /// none is not an error.
    pub fn emit(&self, name: OperationName, payload: Value) -> usize {
        tracing::debug!("Emitting event {}", name);
        self.tx.send(HostEvent { name, payload }).unwrap_or(0)
    }

    /// Subscribe to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_terminate_is_one_way() {
        let lifecycle = Lifecycle::new();
        let clone = lifecycle.clone();

        assert!(!lifecycle.is_terminated());
        assert!(clone.terminate());
        assert!(!lifecycle.terminate());
        assert!(lifecycle.is_terminated());
    }

    #[tokio::test]
    async fn test_terminated_wakes_waiters() {
        let lifecycle = Lifecycle::new();
        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.terminated().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        lifecycle.terminate();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_terminated_returns_immediately_when_already_set() {
        let lifecycle = Lifecycle::new();
        lifecycle.terminate();
        tokio::time::timeout(Duration::from_secs(1), lifecycle.terminated())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_event_fan_out() {
        let sink = EventSink::default();
        let mut a = sink.subscribe();
        let mut b = sink.subscribe();

        let name: OperationName = "ui:onFinishLogin".parse().unwrap();
        assert_eq!(sink.emit(name.clone(), Value::Null), 2);

        assert_eq!(a.recv().await.unwrap().name, name);
        assert_eq!(b.recv().await.unwrap().payload, Value::Null);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let sink = EventSink::new(4);
        assert_eq!(sink.emit("ui:onFinishLogin".parse().unwrap(), Value::Null), 0);
    }
}
