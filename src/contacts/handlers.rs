use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{info, instrument, warn};

use super::types::{AddContactRequest, AddContactResponse, CsrfTokenResponse, CSRF_HEADER};
use crate::shared::{AppError, AppState};

fn refused(status: StatusCode, message: &str) -> (StatusCode, Json<AddContactResponse>) {
    (
        status,
        Json(AddContactResponse {
            success: false,
            message: Some(message.to_string()),
        }),
    )
}

/// HTTP handler for a user's saved contacts
///
/// GET /contacts/get_contacts/{username}
#[instrument(name = "get_contacts", skip(state))]
pub async fn get_contacts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let contacts = state.contact_repository.get_contacts(&username).await?;
    info!(username = %username, count = contacts.len(), "Contacts listed");
    Ok(Json(contacts))
}

/// HTTP handler for saving a contact
///
/// POST /contacts/add_contact with the anti-forgery token in `X-CSRFToken`
#[instrument(name = "add_contact", skip(state, headers, request))]
pub async fn add_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AddContactRequest>,
) -> Result<(StatusCode, Json<AddContactResponse>), AppError> {
    let token = headers.get(CSRF_HEADER).and_then(|h| h.to_str().ok());
    if token != Some(state.csrf_token.as_str()) {
        warn!(username = %request.username, "Rejected add_contact with bad CSRF token");
        return Ok(refused(StatusCode::FORBIDDEN, "Invalid CSRF token"));
    }

    let username = request.username.trim();
    let contact_name = request.contact_name.trim();
    if username.is_empty() {
        return Ok(refused(StatusCode::BAD_REQUEST, "Username is required"));
    }
    if contact_name.is_empty() {
        return Ok(refused(StatusCode::BAD_REQUEST, "Contact name is required"));
    }
    if contact_name == username {
        return Ok(refused(StatusCode::BAD_REQUEST, "You cannot add yourself"));
    }

    let added = state
        .contact_repository
        .add_contact(username, contact_name)
        .await?;

    info!(username = %username, contact = %contact_name, added, "Contact saved");
    Ok((
        StatusCode::OK,
        Json(AddContactResponse {
            success: true,
            message: (!added).then(|| "Contact already saved".to_string()),
        }),
    ))
}

/// HTTP handler exposing the anti-forgery token
///
/// GET /api/csrf-token
pub async fn csrf_token(State(state): State<AppState>) -> Json<CsrfTokenResponse> {
    Json(CsrfTokenResponse {
        token: state.csrf_token.clone(),
    })
}
