//! Transport adapter
//!
//! The backend exposes five request/response endpoints and one push channel.
//! `Transport` is the seam between the synchronization core and whatever
//! carries those calls:
//!
//! - `HttpTransport`: reqwest + tokio-tungstenite against a real backend
//! - `MemoryTransport`: in-process backend for tests and demos
//!
//! Adapters do no validation and hold no state beyond what the wire needs.

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportResult;
use crate::models::Snapshot;
use crate::sync::SnapshotSubscription;

pub use http::HttpTransport;
pub use memory::{Call, MemoryTransport, Operation};

/// Body of `GET /message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    pub text: String,
}

/// Body returned by the write endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub message: String,
}

/// Body of `POST /hello`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBody {
    pub name: String,
}

/// Body of `PUT /update`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    pub old_name: String,
    pub new_name: String,
}

/// Operations the backend offers
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the server greeting
    async fn fetch_greeting(&self) -> TransportResult<Greeting>;

    /// Store a new name (caller validates)
    async fn submit_name(&self, name: &str) -> TransportResult<Reply>;

    /// Fetch the full current collection
    async fn list_all(&self) -> TransportResult<Snapshot>;

    /// Remove every stored name
    async fn delete_all(&self) -> TransportResult<Reply>;

    /// Rename every record currently called `old_name`
    ///
    /// Fails with `TransportError::NotFound` when nothing matched.
    async fn update_name(&self, old_name: &str, new_name: &str) -> TransportResult<Reply>;

    /// Open the push channel of full snapshots
    async fn subscribe_snapshots(&self) -> TransportResult<SnapshotSubscription>;
}
