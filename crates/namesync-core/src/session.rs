//! Session driver
//!
//! Couples a `ClientState` with a `Transport`. Requests produced by state
//! transitions run as spawned tasks; their outcomes, pushed snapshots and
//! timers all come back through a single event queue that the owner drains
//! with `next_event` and applies with `handle`. The state is therefore only
//! ever mutated from the owner's loop, one event at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{RecordId, SortMode};
use crate::state::{ClientState, Outcome, Request};
use crate::sync::{LiveStatus, SnapshotSubscription, SubscriptionEvent};
use crate::transport::Transport;

/// Something that happened outside the owner's loop
#[derive(Debug)]
pub enum SessionEvent {
    /// A request finished
    Completed(Outcome),
    /// The live channel produced an event
    Live(SubscriptionEvent),
    /// Fallback timer fired; `seen_seq` is the snapshot count when armed
    FallbackDue { seen_seq: u64 },
}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Wait before listing directly when no push follows a submission
    pub snapshot_fallback: Option<Duration>,
    /// Initial sort mode
    pub sort_mode: SortMode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            snapshot_fallback: Some(Duration::from_millis(1500)),
            sort_mode: SortMode::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            snapshot_fallback: config.snapshot_fallback(),
            sort_mode: config.default_sort,
        }
    }
}

/// A running client session
pub struct Session {
    state: ClientState,
    transport: Arc<dyn Transport>,
    options: SessionOptions,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    subscription: Option<SnapshotSubscription>,
    live_status: LiveStatus,
    in_flight: usize,
}

impl Session {
    /// Create a session; call `start` to open the live channel
    pub fn new(transport: Arc<dyn Transport>, options: SessionOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: ClientState::with_sort_mode(options.sort_mode),
            transport,
            options,
            events_tx,
            events_rx,
            subscription: None,
            live_status: LiveStatus::Closed,
            in_flight: 0,
        }
    }

    /// Open the push channel and request the initial list
    ///
    /// A push channel that cannot be opened is logged and leaves the session
    /// in request/response mode.
    pub async fn start(&mut self) {
        match self.transport.subscribe_snapshots().await {
            Ok(subscription) => {
                self.live_status = subscription.status();
                self.subscription = Some(subscription);
            }
            Err(e) => {
                warn!("Live updates unavailable: {}", e);
                self.live_status = LiveStatus::Closed;
            }
        }
        self.dispatch(Request::ListAll);
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn live_status(&self) -> LiveStatus {
        self.live_status
    }

    /// Requests dispatched but not yet applied
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn set_pending_submission(&mut self, text: impl Into<String>) {
        self.state.set_pending_submission(text);
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.state.set_draft(text);
    }

    pub fn start_edit(&mut self, id: &RecordId) -> bool {
        self.state.start_edit(id)
    }

    pub fn cancel_edit(&mut self) {
        self.state.cancel_edit();
    }

    pub fn cycle_sort_mode(&mut self) -> SortMode {
        self.state.cycle_sort_mode()
    }

    /// Submit the add field; returns whether a request was sent
    pub fn submit(&mut self) -> bool {
        let Some(request) = self.state.submit() else {
            return false;
        };
        self.dispatch(request);
        true
    }

    /// Save the current edit; returns whether a request was sent
    pub fn save_edit(&mut self) -> bool {
        self.state.save_edit().map(|r| self.dispatch(r)).is_some()
    }

    pub fn delete_all(&mut self) {
        let request = self.state.delete_all();
        self.dispatch(request);
    }

    pub fn refresh(&mut self) {
        let request = self.state.refresh();
        self.dispatch(request);
    }

    pub fn fetch_greeting(&mut self) {
        let request = self.state.fetch_greeting();
        self.dispatch(request);
    }

    /// Run a request in the background; its outcome arrives as an event
    fn dispatch(&mut self, request: Request) {
        debug!("Dispatching {:?}", request);
        self.in_flight += 1;
        let transport = Arc::clone(&self.transport);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let outcome = execute(transport.as_ref(), request).await;
            let _ = events_tx.send(SessionEvent::Completed(outcome));
        });
    }

    /// Wait for the next event from requests, timers or the live channel
    pub async fn next_event(&mut self) -> SessionEvent {
        let Self {
            events_rx,
            subscription,
            ..
        } = self;

        let live = async {
            match subscription.as_mut() {
                Some(sub) => sub.recv().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            // The sender half lives in `self`, so this never yields `None`
            Some(event) = events_rx.recv() => event,
            live_event = live => SessionEvent::Live(
                live_event.unwrap_or(SubscriptionEvent::Closed { reason: None })
            ),
        }
    }

    /// Apply one event to the state
    pub fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Completed(outcome) => {
                self.in_flight = self.in_flight.saturating_sub(1);
                let submitted = match &outcome {
                    Outcome::Submitted {
                        seen_seq,
                        result: Ok(_),
                    } => Some(*seen_seq),
                    _ => None,
                };
                self.state.apply(outcome);
                if let Some(seen_seq) = submitted {
                    self.arm_fallback(seen_seq);
                }
            }
            SessionEvent::Live(SubscriptionEvent::Snapshot(snapshot)) => {
                debug!("Applying pushed snapshot ({} records)", snapshot.len());
                self.state.apply_snapshot(snapshot);
            }
            SessionEvent::Live(SubscriptionEvent::Status(status)) => {
                self.live_status = status;
            }
            SessionEvent::Live(SubscriptionEvent::Closed { reason }) => {
                match reason {
                    Some(reason) => info!("Live updates stopped: {}", reason),
                    None => info!("Live updates stopped"),
                }
                self.live_status = LiveStatus::Closed;
                self.subscription = None;
            }
            SessionEvent::FallbackDue { seen_seq } => {
                if self.state.snapshot_seq() == seen_seq {
                    debug!("No snapshot after submission, listing directly");
                    self.dispatch(Request::ListAll);
                }
            }
        }
    }

    /// Wait for one event and apply it
    pub async fn step(&mut self) {
        let event = self.next_event().await;
        self.handle(event);
    }

    /// Apply events until no request is in flight
    ///
    /// Pushed snapshots that arrive meanwhile are applied too.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            self.step().await;
        }
    }

    /// Close the live channel
    pub async fn shutdown(mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.close().await;
        }
    }

    /// Schedule a direct list unless a snapshot arrives after `seen_seq`
    fn arm_fallback(&self, seen_seq: u64) {
        let Some(delay) = self.options.snapshot_fallback else {
            return;
        };
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events_tx.send(SessionEvent::FallbackDue { seen_seq });
        });
    }
}

/// Run one request against a transport
pub async fn execute(transport: &dyn Transport, request: Request) -> Outcome {
    match request {
        Request::FetchGreeting => Outcome::Greeting(transport.fetch_greeting().await),
        Request::SubmitName { name, seen_seq } => Outcome::Submitted {
            seen_seq,
            result: transport.submit_name(&name).await,
        },
        Request::ListAll => Outcome::Listed(transport.list_all().await),
        Request::DeleteAll => Outcome::DeletedAll(transport.delete_all().await),
        Request::UpdateName {
            id,
            old_name,
            new_name,
        } => Outcome::Updated {
            id,
            result: transport.update_name(&old_name, &new_name).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameRecord;
    use crate::state::{EDIT_TOO_SHORT, SUBMIT_TOO_SHORT};
    use crate::transport::{Call, MemoryTransport, Operation};
    use chrono::Utc;

    fn session_with(transport: &MemoryTransport, fallback: Option<Duration>) -> Session {
        Session::new(
            Arc::new(transport.clone()),
            SessionOptions {
                snapshot_fallback: fallback,
                sort_mode: SortMode::DateDesc,
            },
        )
    }

    /// Apply events until the cache holds `len` records
    async fn wait_for_len(session: &mut Session, len: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.state().cache().len() != len {
                session.step().await;
            }
        })
        .await
        .expect("cache never reached expected length");
    }

    #[tokio::test]
    async fn test_start_subscribes_and_lists() {
        let transport = MemoryTransport::with_records(vec![NameRecord::new(
            1,
            "Anna",
            Utc::now(),
        )]);
        let mut session = session_with(&transport, None);

        session.start().await;
        session.settle().await;

        assert_eq!(session.state().cache().len(), 1);
        assert_eq!(session.live_status(), LiveStatus::Connected);
        assert_eq!(transport.calls(), vec![Call::Subscribe, Call::ListAll]);
    }

    #[tokio::test]
    async fn test_short_name_never_reaches_transport() {
        let transport = MemoryTransport::new();
        let mut session = session_with(&transport, None);

        session.set_pending_submission(" A ");
        assert!(!session.submit());
        assert_eq!(session.in_flight(), 0);
        assert_eq!(session.state().submit_error(), Some(SUBMIT_TOO_SHORT));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_submitted_name_arrives_by_push() {
        let transport = MemoryTransport::new();
        let mut session = session_with(&transport, None);
        session.start().await;
        session.settle().await;

        let before = Utc::now();
        session.set_pending_submission("Al");
        assert!(session.submit());
        wait_for_len(&mut session, 1).await;
        session.settle().await;

        let record = &session.state().cache()[0];
        assert_eq!(record.name, "Al");
        assert!(record.created_at >= before);
        assert_eq!(session.state().success_count(), 1);
        assert!(session.state().submit_error().is_none());
    }

    #[tokio::test]
    async fn test_fallback_lists_when_push_is_lost() {
        let transport = MemoryTransport::new();
        transport.set_push_enabled(false);
        let mut session = session_with(&transport, Some(Duration::from_millis(20)));
        session.start().await;
        session.settle().await;

        session.set_pending_submission("Boris");
        session.submit();
        wait_for_len(&mut session, 1).await;

        assert_eq!(
            transport.calls(),
            vec![
                Call::Subscribe,
                Call::ListAll,
                Call::SubmitName("Boris".to_string()),
                Call::ListAll,
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_skipped_after_push() {
        let transport = MemoryTransport::new();
        let mut session = session_with(&transport, Some(Duration::from_millis(20)));
        session.start().await;
        session.settle().await;

        session.set_pending_submission("Boris");
        session.submit();
        session.settle().await;
        wait_for_len(&mut session, 1).await;

        // Let the fallback timer fire and be ignored
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = session.next_event().await;
                let due = matches!(event, SessionEvent::FallbackDue { .. });
                session.handle(event);
                if due {
                    break;
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(session.in_flight(), 0);
        assert_eq!(
            transport
                .calls()
                .iter()
                .filter(|c| **c == Call::ListAll)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_edit_scenario() {
        let transport = MemoryTransport::with_records(vec![NameRecord::new(
            1,
            "Anna",
            Utc::now(),
        )]);
        let mut session = session_with(&transport, None);
        session.start().await;
        session.settle().await;

        let id = RecordId::Number(1);
        assert!(session.start_edit(&id));

        session.set_draft("A");
        assert!(!session.save_edit());
        assert_eq!(session.state().edit_error(), Some(EDIT_TOO_SHORT));
        assert!(session.state().is_editing(&id));

        session.set_draft("An");
        assert!(session.save_edit());
        session.settle().await;

        assert!(session.state().editing_id().is_none());
        assert!(session.state().edit_error().is_none());
        assert!(transport.calls().contains(&Call::UpdateName {
            old_name: "Anna".to_string(),
            new_name: "An".to_string(),
        }));
    }

    #[tokio::test]
    async fn test_delete_all_keeps_edit_state() {
        let transport = MemoryTransport::with_records(vec![
            NameRecord::new(1, "Anna", Utc::now()),
            NameRecord::new(2, "Boris", Utc::now()),
        ]);
        let mut session = session_with(&transport, None);
        session.start().await;
        session.settle().await;

        session.start_edit(&RecordId::Number(2));
        session.set_draft("Bob");
        session.delete_all();
        session.settle().await;

        assert!(session.state().cache().is_empty());
        assert!(session.state().is_editing(&RecordId::Number(2)));
        assert_eq!(session.state().draft(), "Bob");

        // The stale edit saves as a no-op
        assert!(!session.save_edit());
    }

    #[tokio::test]
    async fn test_write_failure_preserves_input() {
        let transport = MemoryTransport::new();
        transport.fail(Operation::Submit);
        let mut session = session_with(&transport, None);

        session.set_pending_submission("Clara");
        session.submit();
        session.settle().await;

        assert_eq!(session.state().pending_submission(), "Clara");
        assert_eq!(session.state().success_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribe_failure_still_lists() {
        let transport = MemoryTransport::new();
        transport.fail(Operation::Subscribe);
        let mut session = session_with(&transport, None);

        session.start().await;
        session.settle().await;

        assert_eq!(session.live_status(), LiveStatus::Closed);
        assert_eq!(transport.calls(), vec![Call::Subscribe, Call::ListAll]);
    }

    #[tokio::test]
    async fn test_server_close_ends_live_updates() {
        let transport = MemoryTransport::new();
        let mut session = session_with(&transport, None);
        session.start().await;
        session.settle().await;

        transport.close_subscriptions();
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.live_status() != LiveStatus::Closed {
                session.step().await;
            }
        })
        .await
        .unwrap();

        // Requests keep working without the live channel
        session.refresh();
        session.settle().await;
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscription() {
        let transport = MemoryTransport::new();
        let mut session = session_with(&transport, None);
        session.start().await;
        assert_eq!(transport.subscriber_count(), 1);

        session.shutdown().await;
        assert_eq!(transport.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_each_submission_keeps_its_own_fallback() {
        let transport = MemoryTransport::new();
        transport.set_push_enabled(false);
        let mut session = session_with(&transport, Some(Duration::from_millis(200)));
        session.start().await;
        session.settle().await;

        session.set_pending_submission("Anna");
        assert!(session.submit());
        session.settle().await;

        // Another client's push lands after the first submission only
        let seq = session.state().snapshot_seq();
        transport.push_snapshot(transport.records());
        while session.state().snapshot_seq() == seq {
            session.step().await;
        }

        session.set_pending_submission("Boris");
        assert!(session.submit());

        let mut due = 0;
        tokio::time::timeout(Duration::from_secs(5), async {
            while due < 2 {
                let event = session.next_event().await;
                if matches!(event, SessionEvent::FallbackDue { .. }) {
                    due += 1;
                }
                session.handle(event);
            }
        })
        .await
        .unwrap();
        session.settle().await;

        // Initial list plus the second submission's fallback
        let lists = transport
            .calls()
            .iter()
            .filter(|c| **c == Call::ListAll)
            .count();
        assert_eq!(lists, 2);
        assert_eq!(session.state().cache().len(), 2);
    }

    #[tokio::test]
    async fn test_push_from_another_client_keeps_edit() {
        let transport = MemoryTransport::with_records(vec![NameRecord::new(
            1,
            "Anna",
            Utc::now(),
        )]);
        let mut session = session_with(&transport, None);
        session.start().await;
        session.settle().await;

        let id = RecordId::Number(1);
        session.start_edit(&id);
        session.set_draft("Annie");

        transport.replace_records(vec![
            NameRecord::new(1, "Anya", Utc::now()),
            NameRecord::new(2, "Boris", Utc::now()),
        ]);
        wait_for_len(&mut session, 2).await;

        assert!(session.state().is_editing(&id));
        assert_eq!(session.state().draft(), "Annie");

        // The rename is addressed by the name the server now reports
        assert!(session.save_edit());
        session.settle().await;
        assert!(transport.calls().contains(&Call::UpdateName {
            old_name: "Anya".to_string(),
            new_name: "Annie".to_string(),
        }));
    }
}
