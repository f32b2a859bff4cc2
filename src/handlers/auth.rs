use crate::handlers::common::{created_response, map_service_error, success_response, validate_input};
use crate::{auth::TokenPair, errors::ApiError, services::users::RegisterInput, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for authentication endpoints (public)
pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Register a new user and issue a token
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = RegisterInput {
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        password: payload.password,
        gender: payload.gender,
        age: payload.age,
        profession: payload.profession,
    };

    let user = state
        .services
        .user
        .register(input)
        .await
        .map_err(map_service_error)?;

    let token = state
        .auth_service
        .generate_token(&user)
        .map_err(|_| ApiError::InternalServerError)?;

    Ok(created_response(AuthResponse {
        user_id: user.id,
        token,
    }))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let user = state
        .services
        .user
        .authenticate(&payload.email, &payload.password)
        .await
        .map_err(map_service_error)?;

    let token = state
        .auth_service
        .generate_token(&user)
        .map_err(|_| ApiError::InternalServerError)?;

    Ok(success_response(AuthResponse {
        user_id: user.id,
        token,
    }))
}

// Request/response DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 20))]
    pub gender: String,
    #[validate(range(min = 13, max = 120))]
    pub age: i32,
    #[validate(length(min = 1, max = 100))]
    pub profession: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub token: TokenPair,
}
