use crate::analytics::LeadAnalytics;
use crate::models::{Lead, LeadUpdate};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Errors returned by [`LeadApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        fields: BTreeMap<String, String>,
    },
    #[error("Lead API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to build client: {0}")]
    Build(String),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            ClientError::Build(_) => None,
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

/// Client for the Lead Record API, used by the lead form and tooling.
#[derive(Clone)]
pub struct LeadApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl LeadApiClient {
    /// Creates a new client for the API rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turns a non-success response into [`ClientError::Api`] carrying the
    /// server's message.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let (message, fields) = match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => (
                body.error
                    .unwrap_or_else(|| format!("Request failed with status {}", status)),
                body.fields,
            ),
            Err(_) if !text.trim().is_empty() => (text, BTreeMap::new()),
            Err(_) => (
                format!("Request failed with status {}", status),
                BTreeMap::new(),
            ),
        };
        tracing::debug!("Lead API returned {}: {}", status, message);

        Err(ClientError::Api {
            status,
            message,
            fields,
        })
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        Ok(Self::check(response).await?.json::<T>().await?)
    }

    pub async fn list_leads(&self) -> Result<Vec<Lead>, ClientError> {
        let response = self.client.get(self.url("/leads")).send().await?;
        Self::json(response).await
    }

    pub async fn get_lead(&self, id: Uuid) -> Result<Lead, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/leads/{}", id)))
            .send()
            .await?;
        Self::json(response).await
    }

    /// Submits a lead; the response carries the assigned score.
    pub async fn create_lead<T: Serialize + ?Sized>(&self, lead: &T) -> Result<Lead, ClientError> {
        let response = self
            .client
            .post(self.url("/leads"))
            .json(lead)
            .send()
            .await?;
        Self::json(response).await
    }

    pub async fn update_lead(&self, id: Uuid, update: &LeadUpdate) -> Result<Lead, ClientError> {
        let response = self
            .client
            .put(self.url(&format!("/leads/{}", id)))
            .json(update)
            .send()
            .await?;
        Self::json(response).await
    }

    pub async fn delete_lead(&self, id: Uuid) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/leads/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    pub async fn analytics(&self) -> Result<LeadAnalytics, ClientError> {
        let response = self.client.get(self.url("/analytics")).send().await?;
        Self::json(response).await
    }
}
