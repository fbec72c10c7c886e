//! Client state and reconciliation rules
//!
//! `ClientState` is a plain state machine. User actions either change local
//! buffers or return a `Request` for the caller to run; request results come
//! back as an `Outcome` and are applied with `apply`. Pushed snapshots go
//! through `apply_snapshot`.
//!
//! Nothing here performs I/O, so every rule can be exercised without a
//! backend. Between a request leaving and its outcome arriving, any number of
//! other events may be applied, so no outcome assumes the state it was issued
//! from is still current.

use tracing::{debug, warn};

use crate::error::TransportResult;
use crate::models::{sort_records, validate_name, NameRecord, RecordId, Snapshot, SortMode};
use crate::transport::{Greeting, Reply};

/// Shown under the add field when the name is too short
pub const SUBMIT_TOO_SHORT: &str = "Name must contain at least 2 characters";
/// Shown under the edit field when the new name is too short
pub const EDIT_TOO_SHORT: &str = "New name must contain at least 2 characters";
/// Replaces the greeting when it cannot be fetched
pub const GREETING_FAILED: &str = "Failed to get a message from the server";
pub const LIST_FAILED: &str = "Failed to load names";
pub const SUBMIT_FAILED: &str = "Failed to send the name";
pub const CLEAR_FAILED: &str = "Failed to clear the list";
pub const UPDATE_FAILED: &str = "Failed to update the name";
pub const UPDATE_NOT_FOUND: &str = "Name was changed or removed on the server";

/// A backend call requested by a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    FetchGreeting,
    /// `seen_seq` is the snapshot count when the name was sent
    SubmitName {
        name: String,
        seen_seq: u64,
    },
    ListAll,
    DeleteAll,
    /// Rename addressed by the last known name of record `id`
    UpdateName {
        id: RecordId,
        old_name: String,
        new_name: String,
    },
}

/// Result of a `Request`, fed back through `ClientState::apply`
#[derive(Debug)]
pub enum Outcome {
    Greeting(TransportResult<Greeting>),
    Submitted {
        seen_seq: u64,
        result: TransportResult<Reply>,
    },
    Listed(TransportResult<Snapshot>),
    DeletedAll(TransportResult<Reply>),
    Updated {
        id: RecordId,
        result: TransportResult<Reply>,
    },
}

/// Everything the client knows during a session
#[derive(Debug, Default)]
pub struct ClientState {
    cache: Snapshot,
    editing_id: Option<RecordId>,
    draft: String,
    pending_submission: String,
    submit_error: Option<String>,
    edit_error: Option<String>,
    success_count: u64,
    greeting: Option<String>,
    reply: Option<String>,
    sort_mode: SortMode,
    snapshot_seq: u64,
}

impl ClientState {
    /// Fresh session state: empty cache, nothing being edited
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state with a given initial sort mode
    pub fn with_sort_mode(sort_mode: SortMode) -> Self {
        Self {
            sort_mode,
            ..Self::default()
        }
    }

    /// Last applied snapshot, in backend order
    pub fn cache(&self) -> &[NameRecord] {
        &self.cache
    }

    /// Id of the record in edit mode
    ///
    /// May point at a record that a later snapshot removed.
    pub fn editing_id(&self) -> Option<&RecordId> {
        self.editing_id.as_ref()
    }

    /// Whether `id` is the record in edit mode
    pub fn is_editing(&self, id: &RecordId) -> bool {
        self.editing_id.as_ref() == Some(id)
    }

    /// Cached record being edited, if it still exists
    pub fn editing_record(&self) -> Option<&NameRecord> {
        let id = self.editing_id.as_ref()?;
        self.find(id)
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn pending_submission(&self) -> &str {
        &self.pending_submission
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn edit_error(&self) -> Option<&str> {
        self.edit_error.as_deref()
    }

    /// Successful submissions made from this session
    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Last user-visible result message
    pub fn reply(&self) -> Option<&str> {
        self.reply.as_deref()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    /// Number of snapshots applied so far
    pub fn snapshot_seq(&self) -> u64 {
        self.snapshot_seq
    }

    /// Cache in display order
    pub fn sorted(&self) -> Vec<&NameRecord> {
        sort_records(&self.cache, self.sort_mode)
    }

    /// Switch to the next sort mode and return it
    pub fn cycle_sort_mode(&mut self) -> SortMode {
        self.sort_mode = self.sort_mode.next();
        self.sort_mode
    }

    /// Replace the add-field buffer (a keystroke); clears its error
    pub fn set_pending_submission(&mut self, text: impl Into<String>) {
        self.pending_submission = text.into();
        self.submit_error = None;
    }

    /// Replace the edit buffer (a keystroke); clears its error
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.edit_error = None;
    }

    /// Validate the add field and produce the submit request
    ///
    /// Returns `None` (and sets the field error) when the name is too short.
    pub fn submit(&mut self) -> Option<Request> {
        match validate_name(&self.pending_submission) {
            Ok(name) => Some(Request::SubmitName {
                name: name.to_string(),
                seen_seq: self.snapshot_seq,
            }),
            Err(_) => {
                self.submit_error = Some(SUBMIT_TOO_SHORT.to_string());
                None
            }
        }
    }

    /// Put a cached record into edit mode
    ///
    /// Any other edit in progress is dropped. Returns `false` when `id` is
    /// not in the cache.
    pub fn start_edit(&mut self, id: &RecordId) -> bool {
        let Some(record) = self.find(id) else {
            return false;
        };
        self.draft = record.name.clone();
        self.editing_id = Some(id.clone());
        self.edit_error = None;
        true
    }

    /// Leave edit mode without saving
    pub fn cancel_edit(&mut self) {
        self.editing_id = None;
        self.draft.clear();
        self.edit_error = None;
    }

    /// Validate the draft and produce the update request
    ///
    /// The request is addressed by the record's currently cached name. When
    /// the record has vanished from the cache the save is a no-op.
    pub fn save_edit(&mut self) -> Option<Request> {
        let id = self.editing_id.clone()?;

        let new_name = match validate_name(&self.draft) {
            Ok(name) => name.to_string(),
            Err(_) => {
                self.edit_error = Some(EDIT_TOO_SHORT.to_string());
                return None;
            }
        };

        let Some(record) = self.find(&id) else {
            debug!("Record {} no longer exists, ignoring save", id);
            return None;
        };

        Some(Request::UpdateName {
            old_name: record.name.clone(),
            id,
            new_name,
        })
    }

    /// Request removal of every record
    pub fn delete_all(&self) -> Request {
        Request::DeleteAll
    }

    /// Request a fresh snapshot
    pub fn refresh(&self) -> Request {
        Request::ListAll
    }

    /// Request the greeting
    pub fn fetch_greeting(&self) -> Request {
        Request::FetchGreeting
    }

    /// Replace the cache with an authoritative snapshot
    ///
    /// Edit mode and both input buffers are left untouched.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.cache = snapshot;
        self.snapshot_seq += 1;
    }

    /// Apply the result of a request
    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Greeting(Ok(greeting)) => {
                self.greeting = Some(greeting.text);
            }
            Outcome::Greeting(Err(e)) => {
                warn!("Greeting failed: {}", e);
                self.greeting = Some(GREETING_FAILED.to_string());
            }

            Outcome::Submitted { result: Ok(reply), .. } => {
                self.reply = Some(reply.message);
                self.pending_submission.clear();
                self.submit_error = None;
                self.success_count += 1;
            }
            Outcome::Submitted { result: Err(e), .. } => {
                warn!("Submit failed: {}", e);
                self.reply = Some(SUBMIT_FAILED.to_string());
            }

            Outcome::Listed(Ok(snapshot)) => {
                self.apply_snapshot(snapshot);
            }
            Outcome::Listed(Err(e)) => {
                warn!("Listing names failed: {}", e);
                self.cache.clear();
                self.reply = Some(LIST_FAILED.to_string());
            }

            Outcome::DeletedAll(Ok(reply)) => {
                self.reply = Some(reply.message);
                self.apply_snapshot(Vec::new());
            }
            Outcome::DeletedAll(Err(e)) => {
                warn!("Delete all failed: {}", e);
                self.reply = Some(CLEAR_FAILED.to_string());
            }

            Outcome::Updated { id, result: Ok(reply) } => {
                self.reply = Some(reply.message);
                // A newer edit on another record must survive this completion
                if self.is_editing(&id) {
                    self.cancel_edit();
                }
            }
            Outcome::Updated { id, result: Err(e) } => {
                warn!("Update of {} failed: {}", id, e);
                self.reply = Some(if e.is_not_found() {
                    UPDATE_NOT_FOUND.to_string()
                } else {
                    UPDATE_FAILED.to_string()
                });
            }
        }
    }

    fn find(&self, id: &RecordId) -> Option<&NameRecord> {
        self.cache.iter().find(|record| &record.id == id)
    }
}
