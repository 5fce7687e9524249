use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

use crate::shared::AppError;

/// Trait for saved-contact storage
#[async_trait]
pub trait ContactRepository {
    /// Contacts of a user in the order they were added
    async fn get_contacts(&self, username: &str) -> Result<Vec<String>, AppError>;

    /// Adds a contact; returns false when it was already saved
    async fn add_contact(&self, username: &str, contact_name: &str) -> Result<bool, AppError>;
}

/// In-memory implementation of ContactRepository
pub struct InMemoryContactRepository {
    contacts: Mutex<HashMap<String, Vec<String>>>,
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self {
            contacts: Mutex::new(HashMap::new()),
        }
    }

    fn contacts(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<String>>>, AppError> {
        self.contacts.lock().map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    #[instrument(skip(self))]
    async fn get_contacts(&self, username: &str) -> Result<Vec<String>, AppError> {
        let contacts = self.contacts()?;
        Ok(contacts.get(username).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn add_contact(&self, username: &str, contact_name: &str) -> Result<bool, AppError> {
        let mut contacts = self.contacts()?;
        let saved = contacts.entry(username.to_string()).or_default();

        if saved.iter().any(|c| c == contact_name) {
            debug!("Contact already saved");
            return Ok(false);
        }

        saved.push(contact_name.to_string());
        debug!(count = saved.len(), "Contact saved");
        Ok(true)
    }
}
