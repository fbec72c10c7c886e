//! HTTP transport integration tests.
//!
//! Starts an axum backend that speaks the same wire format as the real one
//! and exercises it through `HttpTransport` and `Session`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use namesync_core::session::{Session, SessionOptions};
use namesync_core::sync::{LiveStatus, SnapshotSubscription, SubscriptionEvent};
use namesync_core::transport::{HttpTransport, Transport};
use namesync_core::{RecordId, SortMode, TransportError};

const WAIT: Duration = Duration::from_secs(5);

struct Stored {
    records: Vec<Value>,
    next_id: i64,
}

#[derive(Clone)]
struct Backend {
    stored: Arc<Mutex<Stored>>,
    pushes: broadcast::Sender<String>,
}

impl Backend {
    fn new() -> Self {
        let (pushes, _) = broadcast::channel(16);
        Self {
            stored: Arc::new(Mutex::new(Stored {
                records: Vec::new(),
                next_id: 1,
            })),
            pushes,
        }
    }

    /// The list as the backend serializes it: `null` when empty
    fn listing(&self) -> Value {
        let stored = self.stored.lock().unwrap();
        if stored.records.is_empty() {
            Value::Null
        } else {
            Value::Array(stored.records.clone())
        }
    }

    fn broadcast(&self) {
        let _ = self.pushes.send(self.listing().to_string());
    }
}

async fn message() -> Json<Value> {
    Json(json!({ "text": "Hello from the server!" }))
}

async fn hello(State(backend): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    {
        let mut stored = backend.stored.lock().unwrap();
        let id = stored.next_id;
        stored.next_id += 1;
        stored.records.push(json!({
            "id": id,
            "name": body["name"],
            "created_at": Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }));
    }
    backend.broadcast();
    Json(json!({ "message": "Name saved successfully" }))
}

async fn all(State(backend): State<Backend>) -> Json<Value> {
    Json(backend.listing())
}

async fn delete_all(State(backend): State<Backend>) -> Json<Value> {
    backend.stored.lock().unwrap().records.clear();
    backend.broadcast();
    Json(json!({ "message": "All names deleted" }))
}

async fn update(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let mut stored = backend.stored.lock().unwrap();
    let mut matched = 0;
    for record in stored.records.iter_mut() {
        if record["name"] == body["oldName"] {
            record["name"] = body["newName"].clone();
            matched += 1;
        }
    }
    if matched == 0 {
        return (StatusCode::NOT_FOUND, "Name not found").into_response();
    }
    Json(json!({ "message": "Name updated successfully" })).into_response()
}

async fn live(ws: WebSocketUpgrade, State(backend): State<Backend>) -> Response {
    // Subscribe before the upgrade so no push is missed once the client sees the socket open
    let mut pushes = backend.pushes.subscribe();
    ws.on_upgrade(move |mut socket| async move {
        while let Ok(text) = pushes.recv().await {
            if socket.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    })
}

/// Sends a malformed frame, a snapshot with a repeated id, then closes
async fn noisy(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|mut socket| async move {
        let _ = socket.send(Message::Text("{not json".to_string())).await;
        let snapshot = json!([
            { "id": 7, "name": "Vera", "created_at": "2024-05-01 10:00:00" },
            { "id": 7, "name": "Vera again", "created_at": "2024-05-01 10:00:01" },
        ]);
        let _ = socket.send(Message::Text(snapshot.to_string())).await;
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: close_code::NORMAL,
                reason: "bye".into(),
            })))
            .await;
    })
}

fn backend_router(backend: Backend) -> Router {
    Router::new()
        .route("/api/message", get(message))
        .route("/api/hello", post(hello))
        .route("/api/all", get(all))
        .route("/api/delete", delete(delete_all))
        .route("/api/update", put(update))
        .route("/ws", get(live))
        .route("/ws-noisy", get(noisy))
        .with_state(backend)
}

/// Bind to port 0 and return the actual address.
async fn start_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr.to_string()
}

async fn start_backend() -> (HttpTransport, String) {
    let addr = start_server(backend_router(Backend::new())).await;
    let transport = HttpTransport::new(
        &format!("http://{addr}/api"),
        Some(&format!("ws://{addr}/ws")),
        WAIT,
    )
    .unwrap();
    (transport, addr)
}

async fn wait_connected(sub: &SnapshotSubscription) {
    let mut status = sub.subscribe_status();
    tokio::time::timeout(WAIT, status.wait_for(|s| *s == LiveStatus::Connected))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn greeting() {
    let (transport, _) = start_backend().await;
    let greeting = transport.fetch_greeting().await.unwrap();
    assert_eq!(greeting.text, "Hello from the server!");
}

#[tokio::test]
async fn empty_list_is_null_on_the_wire() {
    let (transport, _) = start_backend().await;
    assert!(transport.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn submit_is_pushed_and_listed() {
    let (transport, _) = start_backend().await;
    let mut sub = transport.subscribe_snapshots().await.unwrap();
    wait_connected(&sub).await;

    // The backend stores whole seconds
    let before = Utc::now().timestamp();
    let reply = transport.submit_name("Al").await.unwrap();
    assert_eq!(reply.message, "Name saved successfully");

    let pushed = tokio::time::timeout(WAIT, sub.next_snapshot())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].name, "Al");
    assert_eq!(pushed[0].id, RecordId::Number(1));
    assert!(pushed[0].created_at.timestamp() >= before);

    let listed = transport.list_all().await.unwrap();
    assert_eq!(listed, pushed);
}

#[tokio::test]
async fn delete_all_pushes_empty_snapshot() {
    let (transport, _) = start_backend().await;
    transport.submit_name("Anna").await.unwrap();

    let mut sub = transport.subscribe_snapshots().await.unwrap();
    wait_connected(&sub).await;

    let reply = transport.delete_all().await.unwrap();
    assert_eq!(reply.message, "All names deleted");

    let pushed = tokio::time::timeout(WAIT, sub.next_snapshot())
        .await
        .unwrap()
        .unwrap();
    assert!(pushed.is_empty());
}

#[tokio::test]
async fn update_missing_name_is_not_found() {
    let (transport, _) = start_backend().await;
    transport.submit_name("Anna").await.unwrap();

    let reply = transport.update_name("Anna", "An").await.unwrap();
    assert_eq!(reply.message, "Name updated successfully");
    assert_eq!(transport.list_all().await.unwrap()[0].name, "An");

    let err = transport.update_name("Anna", "Ann").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let app = Router::new().route(
        "/api/all",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database is locked") }),
    );
    let addr = start_server(app).await;
    let transport = HttpTransport::new(&format!("http://{addr}/api"), None, WAIT).unwrap();

    let err = transport.list_all().await.unwrap_err();
    match &err {
        TransportError::Status { status, body, .. } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "database is locked");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_frame_is_dropped() {
    let (_, addr) = start_backend().await;
    let mut sub = SnapshotSubscription::connect(format!("ws://{addr}/ws-noisy"));

    let snapshot = tokio::time::timeout(WAIT, sub.next_snapshot())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].name, "Vera");

    let reason = tokio::time::timeout(WAIT, async {
        loop {
            match sub.recv().await {
                Some(SubscriptionEvent::Closed { reason }) => return reason,
                Some(_) => {}
                None => return None,
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(reason.as_deref(), Some("bye"));
    assert_eq!(sub.status(), LiveStatus::Closed);
}

#[tokio::test]
async fn session_sees_its_own_submission() {
    let (transport, _) = start_backend().await;
    let mut session = Session::new(
        Arc::new(transport),
        SessionOptions {
            snapshot_fallback: Some(Duration::from_millis(500)),
            sort_mode: SortMode::NameAsc,
        },
    );
    session.start().await;

    session.set_pending_submission("  Boris ");
    assert!(session.submit());

    tokio::time::timeout(WAIT, async {
        session.settle().await;
        while session.state().cache().is_empty() {
            session.step().await;
        }
    })
    .await
    .unwrap();

    assert_eq!(session.state().cache()[0].name, "Boris");
    assert_eq!(session.state().success_count(), 1);
    assert_eq!(session.state().pending_submission(), "");

    session.set_pending_submission("Anna");
    assert!(session.submit());
    tokio::time::timeout(WAIT, async {
        while session.state().cache().len() < 2 {
            session.step().await;
        }
    })
    .await
    .unwrap();

    let names: Vec<&str> = session
        .state()
        .sorted()
        .into_iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["Anna", "Boris"]);

    session.shutdown().await;
}
