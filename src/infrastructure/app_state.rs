use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::repositories::DocumentStore;
use crate::domain::services::timing::SystemClock;
use crate::infrastructure::auth::JwtService;
use crate::infrastructure::config::{AppConfig, StoreBackend};
use crate::infrastructure::database::{InMemoryDocumentStore, SqliteDocumentStore};
use crate::infrastructure::services::SessionManager;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,

    /// Document store holding users, groups and matchups
    pub store: Arc<dyn DocumentStore>,

    /// JWT service for token management
    pub jwt_service: Arc<JwtService>,

    /// Signed-in users and their open match feeds
    pub session_manager: Arc<SessionManager>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        Self::from_config(AppConfig::from_env()).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.store {
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(InMemoryDocumentStore::new())
            }
            StoreBackend::Sqlite(url) => {
                tracing::info!("Connecting to database: {}", url);
                if let Some(dir) = database_dir(url) {
                    tokio::fs::create_dir_all(&dir).await?;
                }
                Arc::new(SqliteDocumentStore::connect(url, Arc::new(SystemClock)).await?)
            }
        };

        Ok(Self::with_store(config, store))
    }

    /// Build state around an existing store
    pub fn with_store(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let jwt_service = Arc::new(JwtService::new(&config.jwt_secret));

        Self {
            config: Arc::new(config),
            store,
            jwt_service,
            session_manager: Arc::new(SessionManager::new()),
        }
    }
}

/// Parent directory of a file-backed SQLite URL
fn database_dir(url: &str) -> Option<PathBuf> {
    if url.contains(":memory:") {
        return None;
    }
    let path = url.trim_start_matches("sqlite:").trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    Path::new(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
}
