use std::sync::Arc;

use axum::{
    extract::State, http::StatusCode, middleware, routing::post, Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{auth_middleware, Claims};
use crate::api::routes::{api_error, ApiError};
use crate::application::auth::{
    LoginError, LoginUser, LoginUserInput, RegisterError, RegisterUser, RegisterUserInput,
};
use crate::domain::entities::User;
use crate::infrastructure::app_state::AppState;

/// Create auth router
pub fn create_auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route(
            "/logout",
            post(logout_handler).layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state)
}

// ========== DTOs ==========

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    success: bool,
    user: UserInfo,
    token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    id: String,
    email: String,
    display_name: String,
    created_at: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            display_name: user.label(),
            created_at: chrono::DateTime::from_timestamp_millis(user.created_at)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string()),
        }
    }
}

#[derive(Serialize)]
pub struct LogoutResponse {
    success: bool,
}

// ========== Handlers ==========

fn missing_credentials() -> ApiError {
    api_error(
        StatusCode::BAD_REQUEST,
        "MISSING_CREDENTIALS",
        "Email and password are required",
    )
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let email = req.email.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;
    let password = req.password.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;

    let use_case = RegisterUser::new(state.store.clone(), state.jwt_service.clone());
    let input = RegisterUserInput {
        email,
        password,
        display_name: req.display_name.unwrap_or_default(),
    };

    match use_case.execute(input).await {
        Ok(output) => {
            state
                .session_manager
                .connect(&output.user.id, &output.user.label());
            Ok((
                StatusCode::CREATED,
                Json(AuthResponse {
                    success: true,
                    user: UserInfo::from(&output.user),
                    token: output.token,
                }),
            ))
        }
        Err(RegisterError::EmailExists) => Err(api_error(
            StatusCode::CONFLICT,
            "EMAIL_EXISTS",
            "Email already registered",
        )),
        Err(RegisterError::Validation(msg)) => {
            Err(api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg))
        }
        Err(e) => {
            tracing::error!("Registration error: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "REGISTRATION_ERROR",
                "Registration failed",
            ))
        }
    }
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = req.email.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;
    let password = req.password.filter(|s| !s.is_empty()).ok_or_else(missing_credentials)?;

    let use_case = LoginUser::new(state.store.clone(), state.jwt_service.clone());

    match use_case.execute(LoginUserInput { email, password }).await {
        Ok(output) => {
            state
                .session_manager
                .connect(&output.user.id, &output.user.label());
            Ok(Json(AuthResponse {
                success: true,
                user: UserInfo::from(&output.user),
                token: output.token,
            }))
        }
        Err(LoginError::InvalidCredentials) => Err(api_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_CREDENTIALS",
            "Invalid email or password",
        )),
        Err(LoginError::Validation(msg)) => {
            Err(api_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg))
        }
        Err(e) => {
            tracing::error!("Login error: {}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "LOGIN_ERROR",
                "Login failed",
            ))
        }
    }
}

async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Json<LogoutResponse> {
    state.session_manager.disconnect(&claims.user_id);
    Json(LogoutResponse { success: true })
}
