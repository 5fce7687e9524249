use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::errors::SessionError;
use super::history::HistoryApi;

const ADD_CONTACT_FAILED: &str = "Failed to add contact";

/// The user's saved contacts, mirrored locally
pub struct ContactBook {
    user: String,
    history: Arc<dyn HistoryApi>,
    contacts: Vec<String>,
}

impl ContactBook {
    pub fn new(user: impl Into<String>, history: Arc<dyn HistoryApi>) -> Self {
        Self {
            user: user.into(),
            history,
            contacts: Vec::new(),
        }
    }

    pub fn contacts(&self) -> &[String] {
        &self.contacts
    }

    pub fn contains(&self, name: &str) -> bool {
        self.contacts.iter().any(|c| c == name)
    }

    /// Replaces the local list with the server's. On failure the list is
    /// left as it was.
    #[instrument(skip(self), fields(user = %self.user))]
    pub async fn load(&mut self) -> Result<&[String], SessionError> {
        match self.history.fetch_contacts(&self.user).await {
            Ok(contacts) => {
                info!(count = contacts.len(), "Contacts loaded");
                self.contacts = contacts;
                Ok(&self.contacts)
            }
            Err(e) => {
                warn!(error = %e, "Error loading contacts");
                Err(e.into())
            }
        }
    }

    /// Adds a contact. Duplicates, blank names and missing tokens are
    /// rejected locally without a request.
    #[instrument(skip(self, csrf_token), fields(user = %self.user))]
    pub async fn add(&mut self, name: &str, csrf_token: Option<&str>) -> Result<(), SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyContactName);
        }
        if self.contains(name) {
            return Err(SessionError::DuplicateContact);
        }
        let token = csrf_token
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;

        let response = self.history.add_contact(&self.user, name, token).await?;
        if !response.success {
            let message = response
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| ADD_CONTACT_FAILED.to_string());
            warn!(contact = %name, reason = %message, "Contact rejected");
            return Err(SessionError::Rejected(message));
        }

        info!(contact = %name, "Contact added");
        self.contacts.push(name.to_string());
        Ok(())
    }
}
