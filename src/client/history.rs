use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::errors::HistoryError;
use super::models::Message;
use crate::contacts::types::{AddContactResponse, CSRF_HEADER};

/// Request/response access to past messages and contacts
#[async_trait]
pub trait HistoryApi: Send + Sync {
    /// Messages of a room, in server order
    async fn fetch_messages(&self, room: &str) -> Result<Vec<Message>, HistoryError>;

    /// Saved contacts of a user
    async fn fetch_contacts(&self, user: &str) -> Result<Vec<String>, HistoryError>;

    /// Adds a contact for a user. A `success: false` response is not an error.
    async fn add_contact(
        &self,
        user: &str,
        contact_name: &str,
        csrf_token: &str,
    ) -> Result<AddContactResponse, HistoryError>;
}

#[derive(Debug, Serialize)]
struct AddContactRequest<'a> {
    username: &'a str,
    contact_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CsrfTokenResponse {
    token: String,
}

/// [`HistoryApi`] over HTTP
#[derive(Debug, Clone)]
pub struct HttpHistoryClient {
    client: Client,
    base_url: Url,
}

impl HttpHistoryClient {
    pub fn new(base_url: &str) -> Result<Self, HistoryError> {
        let base_url = Url::parse(base_url).map_err(|e| HistoryError::Transport {
            url: base_url.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Builds an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url, HistoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| HistoryError::Transport {
                url: self.base_url.to_string(),
                detail: "base URL cannot carry a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(url: &Url, err: reqwest::Error) -> HistoryError {
        HistoryError::Transport {
            url: url.to_string(),
            detail: err.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<T, HistoryError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        if !response.status().is_success() {
            return Err(HistoryError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| HistoryError::Decode(e.to_string()))
    }

    /// Fetches the anti-forgery token the server expects on mutating calls
    #[instrument(skip(self))]
    pub async fn fetch_csrf_token(&self) -> Result<String, HistoryError> {
        let url = self.endpoint(&["api", "csrf-token"])?;
        let body: CsrfTokenResponse = self.get_json(url).await?;
        Ok(body.token)
    }
}

#[async_trait]
impl HistoryApi for HttpHistoryClient {
    #[instrument(skip(self))]
    async fn fetch_messages(&self, room: &str) -> Result<Vec<Message>, HistoryError> {
        let mut url = self.endpoint(&["api", "rooms", "messages"])?;
        url.query_pairs_mut().append_pair("room", room);

        let records: Vec<Value> = self.get_json(url).await?;
        let received_at = Utc::now();
        let messages: Vec<Message> = records
            .iter()
            .map(|record| Message::normalize(record, received_at).0)
            .collect();

        debug!(room = %room, count = messages.len(), "Fetched room history");
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn fetch_contacts(&self, user: &str) -> Result<Vec<String>, HistoryError> {
        let url = self.endpoint(&["contacts", "get_contacts", user])?;
        let contacts: Vec<String> = self.get_json(url).await?;
        debug!(user = %user, count = contacts.len(), "Fetched contacts");
        Ok(contacts)
    }

    #[instrument(skip(self, csrf_token))]
    async fn add_contact(
        &self,
        user: &str,
        contact_name: &str,
        csrf_token: &str,
    ) -> Result<AddContactResponse, HistoryError> {
        let url = self.endpoint(&["contacts", "add_contact"])?;
        let response = self
            .client
            .post(url.clone())
            .header(CSRF_HEADER, csrf_token)
            .json(&AddContactRequest {
                username: user,
                contact_name,
            })
            .send()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::transport_error(&url, e))?;

        match serde_json::from_slice::<AddContactResponse>(&body) {
            Ok(mut parsed) => {
                if !status.is_success() {
                    warn!(status = %status, "Add contact refused by server");
                    parsed.success = false;
                }
                Ok(parsed)
            }
            Err(_) if !status.is_success() => {
                Err(HistoryError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                })
            }
            Err(e) => Err(HistoryError::Decode(e.to_string())),
        }
    }
}
