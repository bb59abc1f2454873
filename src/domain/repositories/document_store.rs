use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::task::AbortHandle;

use crate::domain::repositories::{Document, Fields, Query};

/// Error type for repository operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Conflicting concurrent write: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

/// Document together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub document: Document,
    pub version: u64,
}

/// Write produced by a transaction body
#[derive(Debug, Clone, PartialEq)]
pub enum TxWrite {
    /// Read-only outcome, nothing to commit
    None,
    /// Merge the fields into the document
    Update(Fields),
    /// Remove the document
    Delete,
}

/// How a document changed between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DocumentChange {
    pub kind: ChangeKind,
    pub id: String,
}

/// Result set pushed to a subscription listener
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    /// Full, ordered result set
    pub documents: Vec<Document>,
    /// Changes since the previous snapshot delivered to this listener
    pub changes: Vec<DocumentChange>,
    /// True when this snapshot replaces all previous state (first delivery,
    /// or after notifications were lost)
    pub resync: bool,
}

/// Callback invoked for every snapshot of a subscribed query.
///
/// Runs while the subscription's gate is held open, so it must not
/// unsubscribe its own subscription.
pub type SnapshotListener = Arc<dyn Fn(QuerySnapshot) + Send + Sync>;

/// Open/closed switch shared by a subscription handle and its delivery task.
///
/// Deliveries run under the read side and closing takes the write side:
/// `close` waits for a callback already running, and none starts after it.
#[derive(Debug, Clone)]
pub struct SubscriptionGate {
    open: Arc<RwLock<bool>>,
}

impl SubscriptionGate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(RwLock::new(true)),
        }
    }

    /// Run `deliver` if the gate is still open; false once closed
    pub fn deliver(&self, deliver: impl FnOnce()) -> bool {
        let open = self.open.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *open {
            deliver();
        }
        *open
    }

    /// Close the gate; true only for the call that closed it
    pub fn close(&self) -> bool {
        let mut open = self.open.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *open, false)
    }

    pub fn is_open(&self) -> bool {
        *self.open.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SubscriptionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a live query subscription.
///
/// Unsubscribing is idempotent; once it returns no further callbacks start.
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    gate: SubscriptionGate,
    task: AbortHandle,
}

impl Subscription {
    pub fn new(gate: SubscriptionGate, task: AbortHandle) -> Self {
        Self { gate, task }
    }

    pub fn unsubscribe(&self) {
        if self.gate.close() {
            self.task.abort();
            tracing::debug!("Subscription cancelled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.gate.is_open()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Document store collaborator.
///
/// Timestamps written by the application come from [`DocumentStore::now`],
/// the store's own clock, so callers cannot shift cooldown or arm windows.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store time in milliseconds
    fn now(&self) -> i64;

    /// Read a document
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, RepositoryError>;

    /// Create a document under a generated id
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, RepositoryError>;

    /// Create or fully replace a document
    async fn put(&self, collection: &str, id: &str, fields: Fields) -> Result<(), RepositoryError>;

    /// Merge fields into an existing document
    async fn update(&self, collection: &str, id: &str, patch: Fields)
        -> Result<(), RepositoryError>;

    /// Delete a document (no-op when absent)
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepositoryError>;

    /// Run a query against a collection
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepositoryError>;

    /// Subscribe to a query; the listener first receives the current result
    /// set, then a new snapshot after every change to the collection
    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
        listener: SnapshotListener,
    ) -> Result<Subscription, RepositoryError>;

    /// Read a document with its version for a later conditional commit
    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, RepositoryError>;

    /// Apply `write` only if the document is still at `expected_version`,
    /// otherwise fail with [`RepositoryError::Conflict`]
    async fn commit_if_unchanged(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        write: TxWrite,
    ) -> Result<(), RepositoryError>;
}
