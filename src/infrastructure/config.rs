/// Where documents are kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Process-local, lost on restart
    Memory,
    /// SQLite database URL
    Sqlite(String),
}

/// Runtime configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub jwt_secret: String,
}

pub const DEFAULT_PORT: u16 = 9999;
pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/clashscore.db";
const DEFAULT_JWT_SECRET: &str = "clashscore-secret-key-change-in-production";

impl AppConfig {
    /// Read `PORT`, `DATABASE_URL` (or `DB_PATH`) and `JWT_SECRET`.
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Invalid PORT '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let db_path = lookup("DATABASE_URL")
            .or_else(|| lookup("DB_PATH"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let store = parse_backend(&db_path);

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set, using the development default");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            port,
            store,
            jwt_secret,
        }
    }

    /// In-memory configuration for tests
    pub fn in_memory(jwt_secret: &str) -> Self {
        Self {
            port: DEFAULT_PORT,
            store: StoreBackend::Memory,
            jwt_secret: jwt_secret.to_string(),
        }
    }
}

fn parse_backend(db_path: &str) -> StoreBackend {
    let db_path = db_path.trim();
    if db_path.eq_ignore_ascii_case("memory") {
        return StoreBackend::Memory;
    }

    // Ensure path has sqlite: prefix
    if db_path.starts_with("sqlite:") {
        StoreBackend::Sqlite(db_path.to_string())
    } else {
        StoreBackend::Sqlite(format!("sqlite:{}", db_path))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.store, StoreBackend::Sqlite(DEFAULT_DATABASE_URL.into()));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[("PORT", "8080"), ("DB_PATH", "/tmp/x.db"), ("JWT_SECRET", "s")]);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.store, StoreBackend::Sqlite("sqlite:/tmp/x.db".into()));
        assert_eq!(cfg.jwt_secret, "s");

        assert_eq!(config_store("memory"), StoreBackend::Memory);
        assert_eq!(config(&[("PORT", "nope")]).port, DEFAULT_PORT);
    }

    fn config_store(url: &str) -> StoreBackend {
        config(&[("DATABASE_URL", url)]).store
    }
}
