//! In-memory transport
//!
//! Behaves like the real backend (auto-increment ids, update by name, a
//! snapshot pushed to every subscriber after each change) without any I/O.
//! Every call is recorded so tests can assert what reached the "wire".

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, watch};

use super::{Greeting, Reply, Transport};
use crate::error::{TransportError, TransportResult};
use crate::models::{NameRecord, RecordId, Snapshot};
use crate::sync::{LiveStatus, SnapshotSubscription, SubscriptionEvent};

const SUBSCRIBER_BUFFER: usize = 64;

/// A call received by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchGreeting,
    SubmitName(String),
    ListAll,
    DeleteAll,
    UpdateName { old_name: String, new_name: String },
    Subscribe,
}

/// Operation selector for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Greeting,
    Submit,
    List,
    Delete,
    Update,
    Subscribe,
}

#[derive(Debug)]
struct Subscriber {
    events: mpsc::Sender<SubscriptionEvent>,
    status: watch::Sender<LiveStatus>,
}

#[derive(Debug)]
struct Backend {
    records: Vec<NameRecord>,
    next_id: i64,
    greeting: String,
    calls: Vec<Call>,
    failing: HashSet<Operation>,
    push_enabled: bool,
    subscribers: Vec<Subscriber>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
            greeting: "Hello from the server!".to_string(),
            calls: Vec::new(),
            failing: HashSet::new(),
            push_enabled: true,
            subscribers: Vec::new(),
        }
    }
}

impl Backend {
    fn check(&self, operation: Operation) -> TransportResult<()> {
        if self.failing.contains(&operation) {
            return Err(TransportError::Unavailable(format!(
                "{:?} is failing",
                operation
            )));
        }
        Ok(())
    }

    fn broadcast(&mut self) {
        if !self.push_enabled {
            return;
        }
        let snapshot = self.records.clone();
        self.subscribers.retain(|sub| {
            sub.events
                .try_send(SubscriptionEvent::Snapshot(snapshot.clone()))
                .is_ok()
        });
    }
}

/// Backend double living in process memory
///
/// Cloning shares the same backend, so a test can keep one handle while the
/// session under test owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Backend>>,
}

impl MemoryTransport {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend preloaded with records
    pub fn with_records(records: Vec<NameRecord>) -> Self {
        let transport = Self::new();
        {
            let mut backend = transport.lock();
            backend.next_id = records
                .iter()
                .filter_map(|r| match r.id {
                    RecordId::Number(n) => Some(n),
                    RecordId::Text(_) => None,
                })
                .max()
                .unwrap_or(0)
                + 1;
            backend.records = records;
        }
        transport
    }

    fn lock(&self) -> MutexGuard<'_, Backend> {
        // A panicking test thread must not wedge every other handle
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Current stored records
    pub fn records(&self) -> Snapshot {
        self.lock().records.clone()
    }

    /// Make an operation fail until `recover` is called
    pub fn fail(&self, operation: Operation) {
        self.lock().failing.insert(operation);
    }

    /// Undo `fail`
    pub fn recover(&self, operation: Operation) {
        self.lock().failing.remove(&operation);
    }

    /// Turn automatic snapshot pushes on or off (simulates lost pushes)
    pub fn set_push_enabled(&self, enabled: bool) {
        self.lock().push_enabled = enabled;
    }

    /// Replace the stored records as another client would, then push
    pub fn replace_records(&self, records: Vec<NameRecord>) {
        let mut backend = self.lock();
        backend.records = records;
        backend.broadcast();
    }

    /// Push an arbitrary snapshot without changing stored records
    pub fn push_snapshot(&self, snapshot: Snapshot) {
        let backend = self.lock();
        for sub in &backend.subscribers {
            let _ = sub
                .events
                .try_send(SubscriptionEvent::Snapshot(snapshot.clone()));
        }
    }

    /// Close every open subscription
    pub fn close_subscriptions(&self) {
        let mut backend = self.lock();
        for sub in backend.subscribers.drain(..) {
            let _ = sub.status.send(LiveStatus::Closed);
            let _ = sub
                .events
                .try_send(SubscriptionEvent::Status(LiveStatus::Closed));
            let _ = sub.events.try_send(SubscriptionEvent::Closed {
                reason: Some("server closed".to_string()),
            });
        }
    }

    /// Number of subscriptions still being served
    pub fn subscriber_count(&self) -> usize {
        let mut backend = self.lock();
        backend.subscribers.retain(|sub| !sub.events.is_closed());
        backend.subscribers.len()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn fetch_greeting(&self) -> TransportResult<Greeting> {
        let mut backend = self.lock();
        backend.calls.push(Call::FetchGreeting);
        backend.check(Operation::Greeting)?;
        Ok(Greeting {
            text: backend.greeting.clone(),
        })
    }

    async fn submit_name(&self, name: &str) -> TransportResult<Reply> {
        let mut backend = self.lock();
        backend.calls.push(Call::SubmitName(name.to_string()));
        backend.check(Operation::Submit)?;

        let id = backend.next_id;
        backend.next_id += 1;
        backend.records.push(NameRecord::new(id, name, Utc::now()));
        backend.broadcast();

        Ok(Reply {
            message: "Name saved successfully".to_string(),
        })
    }

    async fn list_all(&self) -> TransportResult<Snapshot> {
        let mut backend = self.lock();
        backend.calls.push(Call::ListAll);
        backend.check(Operation::List)?;
        Ok(backend.records.clone())
    }

    async fn delete_all(&self) -> TransportResult<Reply> {
        let mut backend = self.lock();
        backend.calls.push(Call::DeleteAll);
        backend.check(Operation::Delete)?;

        backend.records.clear();
        backend.broadcast();

        Ok(Reply {
            message: "All names deleted".to_string(),
        })
    }

    async fn update_name(&self, old_name: &str, new_name: &str) -> TransportResult<Reply> {
        let mut backend = self.lock();
        backend.calls.push(Call::UpdateName {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        });
        backend.check(Operation::Update)?;

        let mut matched = 0;
        for record in backend.records.iter_mut().filter(|r| r.name == old_name) {
            record.name = new_name.to_string();
            matched += 1;
        }
        if matched == 0 {
            return Err(TransportError::NotFound {
                endpoint: "/update".to_string(),
            });
        }
        backend.broadcast();

        Ok(Reply {
            message: "Name updated successfully".to_string(),
        })
    }

    async fn subscribe_snapshots(&self) -> TransportResult<SnapshotSubscription> {
        let mut backend = self.lock();
        backend.calls.push(Call::Subscribe);
        backend.check(Operation::Subscribe)?;

        let (event_tx, event_rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let (status_tx, status_rx) = watch::channel(LiveStatus::Connected);
        let _ = event_tx.try_send(SubscriptionEvent::Status(LiveStatus::Connected));
        backend.subscribers.push(Subscriber {
            events: event_tx,
            status: status_tx,
        });

        Ok(SnapshotSubscription::from_channel(event_rx, status_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_submit_assigns_ids_and_pushes() {
        let transport = MemoryTransport::new();
        let mut sub = transport.subscribe_snapshots().await.unwrap();

        let before = Utc::now();
        transport.submit_name("Al").await.unwrap();

        let snapshot = sub.next_snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, RecordId::Number(1));
        assert_eq!(snapshot[0].name, "Al");
        assert!(snapshot[0].created_at >= before);
    }

    #[tokio::test]
    async fn test_update_by_name() {
        let transport = MemoryTransport::new();
        transport.submit_name("Anna").await.unwrap();

        transport.update_name("Anna", "An").await.unwrap();
        assert_eq!(transport.records()[0].name, "An");

        let err = transport.update_name("Anna", "Ann").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_failure_injection_records_call() {
        let transport = MemoryTransport::new();
        transport.fail(Operation::Delete);

        assert!(transport.delete_all().await.is_err());
        assert_eq!(transport.calls(), vec![Call::DeleteAll]);

        transport.recover(Operation::Delete);
        assert!(transport.delete_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_with_records_continues_ids() {
        let transport = MemoryTransport::with_records(vec![NameRecord::new(
            41,
            "Existing",
            Utc::now(),
        )]);
        transport.submit_name("Next").await.unwrap();

        let records = transport.records();
        assert_eq!(records[1].id, RecordId::Number(42));
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_pruned() {
        let transport = MemoryTransport::new();
        let sub = transport.subscribe_snapshots().await.unwrap();
        assert_eq!(transport.subscriber_count(), 1);

        drop(sub);
        assert_eq!(transport.subscriber_count(), 0);
    }
}
