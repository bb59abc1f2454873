use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::application::feed::MatchFeed;
use crate::domain::repositories::{DocumentStore, RepositoryError};

/// User session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Lobby,
    Group,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::Group => "group",
        }
    }
}

/// Signed-in user session
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub user_id: String,
    pub display_name: String,
    pub status: SessionStatus,
    pub group_id: Option<String>,
    pub connected_at: i64,
}

/// Session plus the feed of the group the user is looking at
struct SessionContext {
    session: UserSession,
    feed: Option<Arc<MatchFeed>>,
}

impl SessionContext {
    fn close_feed(&mut self) {
        if let Some(feed) = self.feed.take() {
            feed.close();
        }
    }
}

/// Session manager for tracking signed-in users and their open feeds
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionContext>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionContext>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionContext>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Sign a user in, replacing (and tearing down) any previous session
    pub fn connect(&self, user_id: &str, display_name: &str) -> UserSession {
        let session = UserSession {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            status: SessionStatus::Lobby,
            group_id: None,
            connected_at: chrono::Utc::now().timestamp_millis(),
        };

        let previous = self.write().insert(
            user_id.to_string(),
            SessionContext {
                session: session.clone(),
                feed: None,
            },
        );
        if let Some(mut previous) = previous {
            previous.close_feed();
        }

        tracing::info!("Session started for {} ({})", display_name, user_id);
        session
    }

    /// Sign a user out, closing their feed
    pub fn disconnect(&self, user_id: &str) {
        let removed = self.write().remove(user_id);
        if let Some(mut context) = removed {
            context.close_feed();
            tracing::info!("Session ended for {}", user_id);
        }
    }

    /// Point the user's session at `group_id` and return its feed.
    ///
    /// The open feed is reused when the group is unchanged; otherwise the
    /// old feed is closed and a new one opened. Membership is the caller's
    /// concern.
    pub async fn switch_group<S: DocumentStore + ?Sized>(
        &self,
        store: &S,
        user_id: &str,
        display_name: &str,
        group_id: &str,
    ) -> Result<Arc<MatchFeed>, RepositoryError> {
        if let Some(feed) = self.current_feed(user_id) {
            if feed.group_id() == group_id && feed.is_open() {
                return Ok(feed);
            }
        }

        let feed = Arc::new(MatchFeed::open(store, group_id).await?);

        let replaced = {
            let mut sessions = self.write();
            let context = sessions
                .entry(user_id.to_string())
                .or_insert_with(|| SessionContext {
                    session: UserSession {
                        user_id: user_id.to_string(),
                        display_name: display_name.to_string(),
                        status: SessionStatus::Lobby,
                        group_id: None,
                        connected_at: chrono::Utc::now().timestamp_millis(),
                    },
                    feed: None,
                });
            context.session.status = SessionStatus::Group;
            context.session.group_id = Some(group_id.to_string());
            context.feed.replace(feed.clone())
        };
        if let Some(old) = replaced {
            old.close();
        }

        tracing::debug!("{} switched to group {}", user_id, group_id);
        Ok(feed)
    }

    /// Feed currently open for the user, if any
    pub fn current_feed(&self, user_id: &str) -> Option<Arc<MatchFeed>> {
        self.read().get(user_id).and_then(|c| c.feed.clone())
    }

    /// Check if user is signed in
    pub fn is_connected(&self, user_id: &str) -> bool {
        self.read().contains_key(user_id)
    }

    /// Get user session
    pub fn get_session(&self, user_id: &str) -> Option<UserSession> {
        self.read().get(user_id).map(|c| c.session.clone())
    }

    /// Count signed-in users
    pub fn count(&self) -> usize {
        self.read().len()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::InMemoryDocumentStore;

    #[tokio::test]
    async fn test_switch_group_reuses_and_replaces_feed() {
        let store = InMemoryDocumentStore::new();
        let manager = SessionManager::new();
        manager.connect("u1", "Olive");

        let first = manager.switch_group(&store, "u1", "Olive", "g1").await.unwrap();
        let again = manager.switch_group(&store, "u1", "Olive", "g1").await.unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        let second = manager.switch_group(&store, "u1", "Olive", "g2").await.unwrap();
        assert!(!first.is_open());
        assert!(second.is_open());

        let session = manager.get_session("u1").unwrap();
        assert_eq!(session.status, SessionStatus::Group);
        assert_eq!(session.group_id.as_deref(), Some("g2"));
    }

    #[tokio::test]
    async fn test_disconnect_tears_down_feed() {
        let store = InMemoryDocumentStore::new();
        let manager = SessionManager::new();
        manager.connect("u1", "Olive");
        let feed = manager.switch_group(&store, "u1", "Olive", "g1").await.unwrap();

        manager.disconnect("u1");
        manager.disconnect("u1");

        assert!(!feed.is_open());
        assert!(!manager.is_connected("u1"));
        assert_eq!(manager.count(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_closes_previous_feed() {
        let store = InMemoryDocumentStore::new();
        let manager = SessionManager::new();
        manager.connect("u1", "Olive");
        let feed = manager.switch_group(&store, "u1", "Olive", "g1").await.unwrap();

        manager.connect("u1", "Olive");
        assert!(!feed.is_open());
        assert!(manager.current_feed("u1").is_none());
    }
}
