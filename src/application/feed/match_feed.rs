use std::sync::{Arc, RwLock};

use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender, TrySendError};

use crate::application::matchup::group_matchups_query;
use crate::domain::entities::{sort_newest_first, Matchup, MATCHUPS};
use crate::domain::repositories::{
    Document, DocumentChange, DocumentStore, QuerySnapshot, RepositoryError, Subscription,
};

/// Buffered updates per feed before slow consumers start losing the oldest
const FEED_CAPACITY: usize = 64;

/// One delivery of a group's matchups
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub group_id: String,
    /// Complete list, newest first
    pub matchups: Vec<Matchup>,
    pub changes: Vec<DocumentChange>,
    /// Replaces everything seen before (first delivery or after lost notices)
    pub resync: bool,
}

/// Live, ordered view of one group's matchups.
///
/// Holds the latest snapshot for synchronous reads (badge refresh) and fans
/// every update out to any number of receivers.
pub struct MatchFeed {
    group_id: String,
    snapshot: Arc<RwLock<Vec<Matchup>>>,
    sender: Sender<FeedUpdate>,
    _keepalive: InactiveReceiver<FeedUpdate>,
    subscription: Subscription,
}

impl MatchFeed {
    /// Subscribe to `group_id`'s matchups
    pub async fn open<S: DocumentStore + ?Sized>(
        store: &S,
        group_id: &str,
    ) -> Result<Self, RepositoryError> {
        let query = group_matchups_query(group_id);

        // Seed before subscribing so `snapshot()` is usable right away; the
        // subscription's first delivery supersedes it
        let initial = decode_all(&store.query(MATCHUPS, &query).await?);
        let snapshot = Arc::new(RwLock::new(initial));

        let (mut sender, receiver) = broadcast(FEED_CAPACITY);
        sender.set_overflow(true);
        sender.set_await_active(false);

        let listener_snapshot = snapshot.clone();
        let listener_sender = sender.clone();
        let listener_group = group_id.to_string();
        let subscription = store
            .subscribe(
                MATCHUPS,
                query,
                Arc::new(move |update: QuerySnapshot| {
                    let matchups = decode_all(&update.documents);
                    {
                        let mut current = listener_snapshot
                            .write()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        *current = matchups.clone();
                    }

                    let feed_update = FeedUpdate {
                        group_id: listener_group.clone(),
                        matchups,
                        changes: update.changes,
                        resync: update.resync,
                    };
                    match listener_sender.try_broadcast(feed_update) {
                        Ok(None) => {}
                        Ok(Some(_)) => {
                            tracing::debug!("Feed {} full, dropped oldest update", listener_group)
                        }
                        Err(TrySendError::Inactive(_)) | Err(TrySendError::Closed(_)) => {}
                        Err(e) => tracing::warn!("Feed {} broadcast failed: {:?}", listener_group, e),
                    }
                }),
            )
            .await?;

        tracing::debug!("Match feed opened for group {}", group_id);

        Ok(Self {
            group_id: group_id.to_string(),
            snapshot,
            sender,
            _keepalive: receiver.deactivate(),
            subscription,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Latest ordered matchups
    pub fn snapshot(&self) -> Vec<Matchup> {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// New receiver for subsequent updates. A receiver that lags gets
    /// `Overflowed` and should re-read [`MatchFeed::snapshot`].
    pub fn updates(&self) -> Receiver<FeedUpdate> {
        self.sender.new_receiver()
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_active()
    }

    /// Stop the subscription and end every receiver's stream. Idempotent.
    pub fn close(&self) {
        self.subscription.unsubscribe();
        if self.sender.close() {
            tracing::debug!("Match feed closed for group {}", self.group_id);
        }
    }
}

impl Drop for MatchFeed {
    fn drop(&mut self) {
        self.close();
    }
}

fn decode_all(documents: &[Document]) -> Vec<Matchup> {
    let mut matchups: Vec<Matchup> = documents
        .iter()
        .filter_map(|document| match Matchup::from_document(document) {
            Ok(matchup) => Some(matchup),
            Err(e) => {
                tracing::warn!("Skipping unreadable matchup {}: {}", document.id, e);
                None
            }
        })
        .collect();
    sort_newest_first(&mut matchups);
    matchups
}
