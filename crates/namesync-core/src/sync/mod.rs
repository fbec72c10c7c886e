//! Live snapshot channel
//!
//! The backend pushes the full name collection over a WebSocket whenever it
//! changes. Each message is a complete replacement, never a diff.
//!
//! ## Usage
//!
//! ```ignore
//! let mut sub = SnapshotSubscription::connect("ws://localhost:3300/ws");
//! while let Some(snapshot) = sub.next_snapshot().await {
//!     state.apply_snapshot(snapshot);
//! }
//! ```

mod message;
mod subscription;

pub use message::{decode_snapshot, dedup_ids};
pub use subscription::{LiveStatus, SnapshotSubscription, SubscriptionEvent};
