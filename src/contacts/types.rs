use serde::{Deserialize, Serialize};

/// Header carrying the per-request anti-forgery token
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Request payload for saving a contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddContactRequest {
    pub username: String,
    pub contact_name: String,
}

/// Anti-forgery token handed to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfTokenResponse {
    pub token: String,
}

/// Outcome of an add-contact request; `message` explains refusals and
/// duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddContactResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
