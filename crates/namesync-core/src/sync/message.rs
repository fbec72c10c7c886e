//! Push message decoding
//!
//! The backend pushes the whole collection as a JSON array of
//! `{ id, name, created_at }` objects. An empty table is encoded as `null`
//! by some backends, which decodes to an empty snapshot.

use std::collections::HashSet;

use tracing::warn;

use crate::models::{NameRecord, Snapshot};

/// Decode a snapshot frame (text or binary payload)
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot, serde_json::Error> {
    let records: Option<Vec<NameRecord>> = serde_json::from_slice(bytes)?;
    Ok(dedup_ids(records.unwrap_or_default()))
}

/// Drop records whose id was already seen, keeping the first occurrence
pub fn dedup_ids(records: Vec<NameRecord>) -> Snapshot {
    let mut seen = HashSet::with_capacity(records.len());
    let total = records.len();
    let unique: Snapshot = records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect();

    if unique.len() != total {
        warn!(
            "Snapshot contained {} duplicated id(s); keeping first occurrences",
            total - unique.len()
        );
    }
    unique
}
