use crate::handlers::common::{created_response, map_service_error, validate_input};
use crate::{errors::ApiError, services::contact::ContactInput, AppState};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Creates the router for the public contact form
pub fn contact_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(submit_contact))
}

/// Submit a contact message
#[utoipa::path(
    post,
    path = "/api/v1/contact",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Message stored"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "contact"
)]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ContactRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = ContactInput {
        name: payload.name,
        email: payload.email,
        message: payload.message,
    };

    let message = state
        .services
        .contact
        .submit(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(message))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 5000))]
    pub message: String,
}
