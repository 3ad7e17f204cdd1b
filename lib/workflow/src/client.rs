//! Definition API client.
//!
//! The designer treats definition persistence as atomic remote calls against
//! a REST backend whose every response is the `{code, message, data}`
//! envelope. The trait keeps the designer testable without a server; the
//! reqwest implementation talks to the real one.

use crate::definition::{DefinitionStatus, DefinitionSummary, ProcessDefinition};
use async_trait::async_trait;
use opsdesk_core::{ApiError, ApiResponse, CredentialSource, DefinitionId};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Errors from definition API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The request never produced a response.
    Transport { message: String },
    /// The response body was not the expected envelope.
    Decode { message: String },
    /// The backend answered with a non-success envelope.
    Api(ApiError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "request failed: {message}"),
            Self::Decode { message } => write!(f, "could not decode response: {message}"),
            Self::Api(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<ApiError> for ClientError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// Remote persistence for process definitions.
#[async_trait]
pub trait DefinitionApi: Send + Sync {
    /// Creates or updates a definition and returns its ID.
    async fn save(&self, definition: &ProcessDefinition) -> Result<DefinitionId, ClientError>;

    /// Loads a definition.
    async fn load(&self, id: DefinitionId) -> Result<ProcessDefinition, ClientError>;

    /// Publishes a definition.
    async fn publish(&self, id: DefinitionId) -> Result<(), ClientError>;

    /// Disables a definition.
    async fn disable(&self, id: DefinitionId) -> Result<(), ClientError>;

    /// Copies a definition and returns the new copy's ID.
    async fn copy(&self, id: DefinitionId) -> Result<DefinitionId, ClientError>;

    /// Deletes a definition.
    async fn delete(&self, id: DefinitionId) -> Result<(), ClientError>;

    /// Lists definitions, optionally filtered by status.
    async fn list(
        &self,
        status: Option<DefinitionStatus>,
    ) -> Result<Vec<DefinitionSummary>, ClientError>;
}

#[async_trait]
impl<A: DefinitionApi + ?Sized> DefinitionApi for Arc<A> {
    async fn save(&self, definition: &ProcessDefinition) -> Result<DefinitionId, ClientError> {
        (**self).save(definition).await
    }

    async fn load(&self, id: DefinitionId) -> Result<ProcessDefinition, ClientError> {
        (**self).load(id).await
    }

    async fn publish(&self, id: DefinitionId) -> Result<(), ClientError> {
        (**self).publish(id).await
    }

    async fn disable(&self, id: DefinitionId) -> Result<(), ClientError> {
        (**self).disable(id).await
    }

    async fn copy(&self, id: DefinitionId) -> Result<DefinitionId, ClientError> {
        (**self).copy(id).await
    }

    async fn delete(&self, id: DefinitionId) -> Result<(), ClientError> {
        (**self).delete(id).await
    }

    async fn list(
        &self,
        status: Option<DefinitionStatus>,
    ) -> Result<Vec<DefinitionSummary>, ClientError> {
        (**self).list(status).await
    }
}

/// HTTP implementation of the definition API.
pub struct HttpDefinitionApi {
    base_url: String,
    http: reqwest::Client,
    credentials: Arc<dyn CredentialSource>,
}

impl HttpDefinitionApi {
    /// Creates a client rooted at `base_url` (no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<T>, ClientError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport {
                message: e.to_string(),
            })?;
        let envelope: ApiResponse<T> =
            response.json().await.map_err(|e| ClientError::Decode {
                message: e.to_string(),
            })?;
        envelope.into_result().map_err(ClientError::from)
    }

    fn require<T>(data: Option<T>, what: &str) -> Result<T, ClientError> {
        data.ok_or_else(|| ClientError::Decode {
            message: format!("response missing {what}"),
        })
    }
}

#[async_trait]
impl DefinitionApi for HttpDefinitionApi {
    async fn save(&self, definition: &ProcessDefinition) -> Result<DefinitionId, ClientError> {
        let request = self
            .http
            .post(self.url("/workflow/definition"))
            .json(definition);
        let saved: ProcessDefinition =
            Self::require(self.execute(request).await?, "definition payload")?;
        Ok(saved.id)
    }

    async fn load(&self, id: DefinitionId) -> Result<ProcessDefinition, ClientError> {
        let request = self.http.get(self.url(&format!("/workflow/definition/{id}")));
        Self::require(self.execute(request).await?, "definition payload")
    }

    async fn publish(&self, id: DefinitionId) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url(&format!("/workflow/definition/{id}/publish")));
        self.execute::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn disable(&self, id: DefinitionId) -> Result<(), ClientError> {
        let request = self
            .http
            .post(self.url(&format!("/workflow/definition/{id}/disable")));
        self.execute::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn copy(&self, id: DefinitionId) -> Result<DefinitionId, ClientError> {
        let request = self
            .http
            .post(self.url(&format!("/workflow/definition/{id}/copy")));
        let copied: ProcessDefinition =
            Self::require(self.execute(request).await?, "definition payload")?;
        Ok(copied.id)
    }

    async fn delete(&self, id: DefinitionId) -> Result<(), ClientError> {
        let request = self
            .http
            .delete(self.url(&format!("/workflow/definition/{id}")));
        self.execute::<serde_json::Value>(request).await?;
        Ok(())
    }

    async fn list(
        &self,
        status: Option<DefinitionStatus>,
    ) -> Result<Vec<DefinitionSummary>, ClientError> {
        let mut request = self.http.get(self.url("/workflow/definition/list"));
        if let Some(status) = status {
            request = request.query(&[("status", status.as_str())]);
        }
        Ok(self.execute(request).await?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_error_display() {
        let err = ClientError::Transport {
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));

        let err = ClientError::from(ApiError {
            code: 500,
            message: "boom".to_string(),
        });
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn url_join() {
        let api = HttpDefinitionApi::new(
            "https://backend.test/api",
            opsdesk_core::SharedCredential::new(),
        );
        assert_eq!(
            api.url("/workflow/definition"),
            "https://backend.test/api/workflow/definition"
        );
    }

    #[test]
    fn require_rejects_missing_payload() {
        let err = HttpDefinitionApi::require::<u32>(None, "definition payload").unwrap_err();
        assert!(err.to_string().contains("definition payload"));
        assert_eq!(
            HttpDefinitionApi::require(Some(7), "definition payload").unwrap(),
            7
        );
    }
}
