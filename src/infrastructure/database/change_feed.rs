use std::collections::HashMap;

use async_broadcast::{broadcast, InactiveReceiver, Receiver, RecvError, Sender, TrySendError};

use crate::domain::repositories::{
    ChangeKind, Document, DocumentChange, DocumentStore, Query, QuerySnapshot, SnapshotListener,
    Subscription, SubscriptionGate,
};

/// A committed write, published after the store released its locks
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub collection: String,
    pub id: String,
}

/// Fan-out of committed writes to live query subscriptions.
///
/// The channel overflows instead of blocking writers; a subscriber that
/// falls behind sees `Overflowed` and resynchronises with a full snapshot.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: Sender<ChangeNotice>,
    _keepalive: InactiveReceiver<ChangeNotice>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (mut sender, receiver) = broadcast(capacity);
        sender.set_overflow(true);
        sender.set_await_active(false);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    pub fn notify(&self, collection: &str, id: &str) {
        let notice = ChangeNotice {
            collection: collection.to_string(),
            id: id.to_string(),
        };
        match self.sender.try_broadcast(notice) {
            Ok(None) => {}
            Ok(Some(dropped)) => {
                tracing::debug!(
                    "Change feed full, dropped oldest notice for {}/{}",
                    dropped.collection,
                    dropped.id
                );
            }
            Err(TrySendError::Inactive(_)) => {}
            Err(e) => {
                tracing::warn!("Failed to publish change notice: {:?}", e);
            }
        }
    }

    pub fn receiver(&self) -> Receiver<ChangeNotice> {
        self.sender.new_receiver()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Compute per-document changes between two ordered result sets
pub fn diff_snapshots(previous: Option<&[Document]>, current: &[Document]) -> Vec<DocumentChange> {
    let before: HashMap<&str, &Document> = previous
        .unwrap_or_default()
        .iter()
        .map(|d| (d.id.as_str(), d))
        .collect();

    let mut changes = Vec::new();
    for document in current {
        match before.get(document.id.as_str()) {
            None => changes.push(DocumentChange {
                kind: ChangeKind::Added,
                id: document.id.clone(),
            }),
            Some(old) if old.fields != document.fields => changes.push(DocumentChange {
                kind: ChangeKind::Modified,
                id: document.id.clone(),
            }),
            Some(_) => {}
        }
    }

    let after: HashMap<&str, ()> = current.iter().map(|d| (d.id.as_str(), ())).collect();
    for document in previous.unwrap_or_default() {
        if !after.contains_key(document.id.as_str()) {
            changes.push(DocumentChange {
                kind: ChangeKind::Removed,
                id: document.id.clone(),
            });
        }
    }

    changes
}

/// Drive a query subscription from change notices.
///
/// `notices` must be taken before the call so no write between the initial
/// query and the first `recv` is missed.
pub fn spawn_query_listener<S>(
    store: S,
    collection: String,
    query: Query,
    listener: SnapshotListener,
    mut notices: Receiver<ChangeNotice>,
) -> Subscription
where
    S: DocumentStore + 'static,
{
    let gate = SubscriptionGate::new();
    let task_gate = gate.clone();

    let task = tokio::spawn(async move {
        let mut previous: Option<Vec<Document>> = None;
        let mut resync = true;

        loop {
            match store.query(&collection, &query).await {
                Ok(documents) => {
                    let changes = diff_snapshots(previous.as_deref(), &documents);
                    if resync || !changes.is_empty() {
                        let delivered = task_gate.deliver(|| {
                            listener(QuerySnapshot {
                                documents: documents.clone(),
                                changes,
                                resync,
                            })
                        });
                        if !delivered {
                            return;
                        }
                    }
                    previous = Some(documents);
                    resync = false;
                }
                Err(e) => {
                    tracing::warn!("Subscription query on {} failed: {}", collection, e);
                    resync = true;
                }
            }

            loop {
                match notices.recv().await {
                    Ok(notice) if notice.collection == collection => break,
                    Ok(_) => continue,
                    Err(RecvError::Overflowed(skipped)) => {
                        tracing::warn!(
                            "Subscription on {} missed {} notices, resyncing",
                            collection,
                            skipped
                        );
                        resync = true;
                        break;
                    }
                    Err(RecvError::Closed) => return,
                }
            }
        }
    });

    Subscription::new(gate, task.abort_handle())
}
