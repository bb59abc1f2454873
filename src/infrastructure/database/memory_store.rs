use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::repositories::{
    merge_fields, Document, DocumentStore, Fields, Query, RepositoryError, SnapshotListener,
    Subscription, TxWrite, Versioned,
};
use crate::domain::services::timing::{Clock, SystemClock};
use crate::infrastructure::database::change_feed::{spawn_query_listener, ChangeNotifier};

struct StoredDocument {
    fields: Fields,
    version: u64,
}

#[derive(Default)]
struct Collections {
    documents: HashMap<String, BTreeMap<String, StoredDocument>>,
    /// Store-wide sequence so a re-created id never reuses an old version
    last_version: u64,
}

impl Collections {
    fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }
}

struct Inner {
    collections: RwLock<Collections>,
    clock: Arc<dyn Clock>,
    notifier: ChangeNotifier,
}

/// Process-local document store
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Inner>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(Collections::default()),
                clock,
                notifier: ChangeNotifier::default(),
            }),
        }
    }

    fn not_found(collection: &str, id: &str) -> RepositoryError {
        RepositoryError::NotFound(format!("{}/{}", collection, id))
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn now(&self) -> i64 {
        self.inner.clock.now_millis()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, RepositoryError> {
        Ok(self
            .get_versioned(collection, id)
            .await?
            .map(|versioned| versioned.document))
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, RepositoryError> {
        let id = Uuid::new_v4().to_string();
        {
            let mut collections = self.inner.collections.write().await;
            let version = collections.next_version();
            collections
                .documents
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), StoredDocument { fields, version });
        }
        self.inner.notifier.notify(collection, &id);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, fields: Fields) -> Result<(), RepositoryError> {
        {
            let mut collections = self.inner.collections.write().await;
            let version = collections.next_version();
            collections
                .documents
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), StoredDocument { fields, version });
        }
        self.inner.notifier.notify(collection, id);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> Result<(), RepositoryError> {
        {
            let mut collections = self.inner.collections.write().await;
            let version = collections.next_version();
            let stored = collections
                .documents
                .get_mut(collection)
                .and_then(|c| c.get_mut(id))
                .ok_or_else(|| Self::not_found(collection, id))?;
            merge_fields(&mut stored.fields, patch);
            stored.version = version;
        }
        self.inner.notifier.notify(collection, id);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RepositoryError> {
        let removed = {
            let mut collections = self.inner.collections.write().await;
            collections
                .documents
                .get_mut(collection)
                .and_then(|c| c.remove(id))
                .is_some()
        };
        if removed {
            self.inner.notifier.notify(collection, id);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, RepositoryError> {
        let collections = self.inner.collections.read().await;
        let documents = collections
            .documents
            .get(collection)
            .map(|c| {
                c.iter()
                    .map(|(id, stored)| Document::new(id.clone(), stored.fields.clone()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Ok(query.apply(documents))
    }

    async fn subscribe(
        &self,
        collection: &str,
        query: Query,
        listener: SnapshotListener,
    ) -> Result<Subscription, RepositoryError> {
        let notices = self.inner.notifier.receiver();
        Ok(spawn_query_listener(
            self.clone(),
            collection.to_string(),
            query,
            listener,
            notices,
        ))
    }

    async fn get_versioned(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Versioned>, RepositoryError> {
        let collections = self.inner.collections.read().await;
        Ok(collections
            .documents
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|stored| Versioned {
                document: Document::new(id, stored.fields.clone()),
                version: stored.version,
            }))
    }

    async fn commit_if_unchanged(
        &self,
        collection: &str,
        id: &str,
        expected_version: u64,
        write: TxWrite,
    ) -> Result<(), RepositoryError> {
        {
            let mut collections = self.inner.collections.write().await;
            let current = collections
                .documents
                .get(collection)
                .and_then(|c| c.get(id))
                .map(|stored| stored.version);

            if current != Some(expected_version) {
                return Err(RepositoryError::Conflict(format!(
                    "{}/{} expected version {}, found {:?}",
                    collection, id, expected_version, current
                )));
            }

            match write {
                TxWrite::None => return Ok(()),
                TxWrite::Update(patch) => {
                    let version = collections.next_version();
                    if let Some(stored) = collections
                        .documents
                        .get_mut(collection)
                        .and_then(|c| c.get_mut(id))
                    {
                        merge_fields(&mut stored.fields, patch);
                        stored.version = version;
                    }
                }
                TxWrite::Delete => {
                    if let Some(c) = collections.documents.get_mut(collection) {
                        c.remove(id);
                    }
                }
            }
        }
        self.inner.notifier.notify(collection, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::{run_transaction, ChangeKind, Direction, QuerySnapshot};
    use crate::domain::services::timing::ManualClock;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_crud_and_query() {
        let store = InMemoryDocumentStore::new();
        let a = store
            .add("matchups", fields(json!({ "groupId": "g1", "createdAt": 1 })))
            .await
            .unwrap();
        store
            .put("matchups", "b", fields(json!({ "groupId": "g1", "createdAt": 2 })))
            .await
            .unwrap();
        store
            .put("matchups", "c", fields(json!({ "groupId": "g2", "createdAt": 3 })))
            .await
            .unwrap();

        store
            .update("matchups", &a, fields(json!({ "scoreA": 4 })))
            .await
            .unwrap();
        let doc = store.get("matchups", &a).await.unwrap().unwrap();
        assert_eq!(doc.fields["scoreA"], 4);
        assert_eq!(doc.fields["groupId"], "g1");

        let query = Query::new()
            .where_eq("groupId", "g1")
            .order_by("createdAt", Direction::Descending);
        let ids: Vec<_> = store
            .query("matchups", &query)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b".to_string(), a.clone()]);

        store.delete("matchups", &a).await.unwrap();
        store.delete("matchups", &a).await.unwrap();
        assert!(store.get("matchups", &a).await.unwrap().is_none());

        let err = store
            .update("matchups", &a, fields(json!({ "scoreA": 5 })))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_commit_rejects_stale_version() {
        let store = InMemoryDocumentStore::new();
        store
            .put("m", "x", fields(json!({ "n": 0 })))
            .await
            .unwrap();

        let first = store.get_versioned("m", "x").await.unwrap().unwrap();
        store
            .commit_if_unchanged("m", "x", first.version, TxWrite::Update(fields(json!({ "n": 1 }))))
            .await
            .unwrap();

        let err = store
            .commit_if_unchanged("m", "x", first.version, TxWrite::Update(fields(json!({ "n": 2 }))))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(store.get("m", "x").await.unwrap().unwrap().fields["n"], 1);
    }

    #[tokio::test]
    async fn test_recreated_document_does_not_reuse_version() {
        let store = InMemoryDocumentStore::new();
        store.put("m", "x", fields(json!({ "n": 0 }))).await.unwrap();
        let read = store.get_versioned("m", "x").await.unwrap().unwrap();

        store.delete("m", "x").await.unwrap();
        store.put("m", "x", fields(json!({ "n": 9 }))).await.unwrap();

        let err = store
            .commit_if_unchanged("m", "x", read.version, TxWrite::Delete)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_transaction_uses_store_clock() {
        let clock = Arc::new(ManualClock::new(42));
        let store = InMemoryDocumentStore::with_clock(clock.clone());
        store.put("m", "x", fields(json!({ "at": 0 }))).await.unwrap();

        clock.advance(8);
        let seen: Result<i64, RepositoryError> = run_transaction(&store, "m", "x", |_, now| {
            Ok((TxWrite::Update(fields(json!({ "at": now }))), now))
        })
        .await;

        assert_eq!(seen.unwrap(), 50);
        assert_eq!(store.get("m", "x").await.unwrap().unwrap().fields["at"], 50);
    }

    #[tokio::test]
    async fn test_subscription_delivers_snapshots_until_unsubscribed() {
        let store = InMemoryDocumentStore::new();
        store
            .put("matchups", "m1", fields(json!({ "groupId": "g1", "createdAt": 1 })))
            .await
            .unwrap();

        let received: Arc<Mutex<Vec<QuerySnapshot>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let subscription = store
            .subscribe(
                "matchups",
                Query::new().where_eq("groupId", "g1"),
                Arc::new(move |snapshot| sink.lock().unwrap().push(snapshot)),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        store
            .put("matchups", "m2", fields(json!({ "groupId": "g1", "createdAt": 2 })))
            .await
            .unwrap();
        store
            .put("matchups", "other", fields(json!({ "groupId": "g2", "createdAt": 3 })))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        {
            let snapshots = received.lock().unwrap();
            assert_eq!(snapshots.len(), 2);
            assert!(snapshots[0].resync);
            assert_eq!(snapshots[0].documents.len(), 1);
            assert!(!snapshots[1].resync);
            assert_eq!(snapshots[1].documents.len(), 2);
            assert_eq!(snapshots[1].changes.len(), 1);
            assert_eq!(snapshots[1].changes[0].kind, ChangeKind::Added);
        }

        subscription.unsubscribe();
        subscription.unsubscribe();
        assert!(!subscription.is_active());

        store.delete("matchups", "m1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(received.lock().unwrap().len(), 2);
    }
}
