use std::sync::Arc;

use crate::application::auth::register_user::find_by_email;
use crate::domain::entities::{normalize_email, User, USERS};
use crate::domain::repositories::{DocumentStore, Fields};
use crate::infrastructure::auth::{JwtService, PasswordService};

/// Login user input
pub struct LoginUserInput {
    pub email: String,
    pub password: String,
}

/// Login user output
pub struct LoginUserOutput {
    pub user: User,
    pub token: String,
}

/// Login user use case
pub struct LoginUser {
    store: Arc<dyn DocumentStore>,
    jwt_service: Arc<JwtService>,
}

impl LoginUser {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_service: Arc<JwtService>) -> Self {
        Self { store, jwt_service }
    }

    pub async fn execute(&self, input: LoginUserInput) -> Result<LoginUserOutput, LoginError> {
        let email = normalize_email(&input.email);

        // Validate input
        if email.is_empty() {
            return Err(LoginError::Validation("Email is required".into()));
        }
        if input.password.is_empty() {
            return Err(LoginError::Validation("Password is required".into()));
        }

        let user = find_by_email(&*self.store, &email)
            .await?
            .ok_or(LoginError::InvalidCredentials)?;

        let password_hash = user
            .password_hash
            .as_ref()
            .ok_or(LoginError::InvalidCredentials)?;

        let valid = PasswordService::verify(&input.password, password_hash)
            .map_err(|e| LoginError::Internal(e.to_string()))?;

        if !valid {
            return Err(LoginError::InvalidCredentials);
        }

        let user = self.ensure_profile(user).await?;

        let token = self
            .jwt_service
            .sign(&user.id, &user.label())
            .map_err(|e| LoginError::Internal(e.to_string()))?;

        tracing::info!("User signed in: {} ({})", user.label(), user.id);

        Ok(LoginUserOutput { user, token })
    }

    /// Backfill a blank display name so matchup cards have something to show
    async fn ensure_profile(&self, mut user: User) -> Result<User, LoginError> {
        if !user.display_name.trim().is_empty() {
            return Ok(user);
        }

        let fallback = user
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string();
        if fallback.is_empty() {
            return Ok(user);
        }

        let mut patch = Fields::new();
        patch.insert("displayName".to_string(), fallback.clone().into());
        self.store.update(USERS, &user.id, patch).await?;
        tracing::debug!("Backfilled display name for {}", user.id);
        user.display_name = fallback;
        Ok(user)
    }
}

/// Login error types
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Repository error: {0}")]
    Repository(#[from] crate::domain::repositories::RepositoryError),
}
