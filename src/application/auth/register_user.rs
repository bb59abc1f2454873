use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entities::{normalize_email, User, USERS};
use crate::domain::repositories::{DocumentStore, Query};
use crate::infrastructure::auth::{JwtService, PasswordService};

/// Register user input
pub struct RegisterUserInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

/// Register user output
pub struct RegisterUserOutput {
    pub user: User,
    pub token: String,
}

/// Register user use case
pub struct RegisterUser {
    store: Arc<dyn DocumentStore>,
    jwt_service: Arc<JwtService>,
}

impl RegisterUser {
    pub fn new(store: Arc<dyn DocumentStore>, jwt_service: Arc<JwtService>) -> Self {
        Self { store, jwt_service }
    }

    pub async fn execute(&self, input: RegisterUserInput) -> Result<RegisterUserOutput, RegisterError> {
        let email = normalize_email(&input.email);
        let display_name = input.display_name.trim().to_string();

        // Validate input
        if email.is_empty() || !email.contains('@') {
            return Err(RegisterError::Validation("A valid email is required".into()));
        }
        if input.password.len() < 6 {
            return Err(RegisterError::Validation(
                "Password must be at least 6 characters".into(),
            ));
        }
        if display_name.chars().count() > 50 {
            return Err(RegisterError::Validation(
                "Display name must be at most 50 characters".into(),
            ));
        }

        // Check if email exists
        if find_by_email(&*self.store, &email).await?.is_some() {
            return Err(RegisterError::EmailExists);
        }

        let password_hash = PasswordService::hash(&input.password)
            .map_err(|e| RegisterError::Internal(e.to_string()))?;

        let user_id = Uuid::new_v4().to_string();
        let user = User::new(
            user_id,
            display_name,
            email,
            password_hash,
            self.store.now(),
        );
        self.store.put(USERS, &user.id, user.to_fields()?).await?;

        let token = self
            .jwt_service
            .sign(&user.id, &user.label())
            .map_err(|e| RegisterError::Internal(e.to_string()))?;

        tracing::info!("User registered: {} ({})", user.label(), user.id);

        Ok(RegisterUserOutput { user, token })
    }
}

/// Look up a profile by normalized email
pub(crate) async fn find_by_email<S: DocumentStore + ?Sized>(
    store: &S,
    email: &str,
) -> Result<Option<User>, crate::domain::repositories::RepositoryError> {
    let documents = store
        .query(USERS, &Query::new().where_eq("email", email))
        .await?;
    documents.first().map(User::from_document).transpose()
}

/// Register error types
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Email already registered")]
    EmailExists,
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Repository error: {0}")]
    Repository(#[from] crate::domain::repositories::RepositoryError),
}
