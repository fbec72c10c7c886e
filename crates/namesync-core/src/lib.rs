//! namesync Core Library
//!
//! This crate provides the core functionality for namesync, a client for a
//! shared list of names kept on a remote backend. Names are submitted,
//! renamed and cleared through request/response calls, while the backend
//! pushes a full snapshot of the list to every connected client after each
//! change.
//!
//! # Architecture
//!
//! - **Snapshots**: The backend is the source of truth; every pushed or
//!   listed snapshot replaces the local cache wholesale
//! - **State machine**: `ClientState` holds the cache, input buffers and
//!   edit mode, and never performs I/O
//! - **Session**: `Session` runs requests on tokio tasks and feeds results
//!   and pushes back into the state one event at a time
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let transport = Arc::new(HttpTransport::from_config(&config)?);
//! let mut session = Session::new(transport, SessionOptions::from_config(&config));
//! session.start().await;
//!
//! session.set_pending_submission("Anna");
//! session.submit();
//! loop {
//!     session.step().await;
//! }
//! ```
//!
//! # Modules
//!
//! - `session`: Event-driven driver (main entry point)
//! - `state`: Client state and reconciliation rules
//! - `models`: Records, validation and ordering
//! - `transport`: Backend adapters (HTTP and in-memory)
//! - `sync`: Live snapshot subscription
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod state;
pub mod sync;
pub mod transport;

pub use config::Config;
pub use error::{TransportError, TransportResult, ValidationError};
pub use models::{NameRecord, RecordId, Snapshot, SortMode};
pub use session::{Session, SessionEvent, SessionOptions};
pub use state::{ClientState, Outcome, Request};
pub use sync::{LiveStatus, SnapshotSubscription, SubscriptionEvent};
pub use transport::{HttpTransport, MemoryTransport, Transport};
