//! reqwest transport for the study API.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use study_core::model::{CreateTopic, Subject, SubjectId, Topic, TopicId, UpdateTopic};
use study_core::stats::{DashboardStats, PomodoroStats};
use study_core::{TopicChange, TopicRemoval};
use tracing::debug;

use crate::error::ClientError;
use crate::record::Record;
use crate::remote::{RemoteCollection, RemoteTopics};

/// Bearer-authenticated client for one user of the API.
#[derive(Debug, Clone)]
pub struct HttpStudyApi {
    http: Client,
    base_url: String,
    token: String,
}

impl HttpStudyApi {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, token)
    }

    #[must_use]
    pub fn with_client(http: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            base_url,
            token: token.into(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        let url = resp.url().path().to_owned();
        let bytes = resp.bytes().await?;
        debug!(path = %url, status = status.as_u16(), "api response");

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_owned))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_owned());
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns `ClientError` if the server is unreachable or its store is down.
    pub async fn health(&self) -> Result<(), ClientError> {
        self.send(self.request(Method::GET, "/health")).await.map(drop)
    }

    /// # Errors
    ///
    /// Returns `ClientError` on any failed round trip.
    pub async fn dashboard(&self) -> Result<DashboardStats, ClientError> {
        let body = self.send(self.request(Method::GET, "/dashboard")).await?;
        unwrap_envelope(body, "dashboard")
    }

    /// # Errors
    ///
    /// Returns `ClientError` on any failed round trip.
    pub async fn pomodoro_stats(&self) -> Result<PomodoroStats, ClientError> {
        let body = self
            .send(self.request(Method::GET, "/pomodoro-sessions/stats"))
            .await?;
        unwrap_envelope(body, "stats")
    }

    /// Ask the server to recount a subject's topics.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` on any failed round trip.
    pub async fn refresh_subject_progress(&self, id: SubjectId) -> Result<Subject, ClientError> {
        let path = format!("/subjects/{id}/refresh-progress");
        let body = self.send(self.request(Method::POST, &path)).await?;
        unwrap_envelope(body, "subject")
    }
}

fn unwrap_envelope<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, ClientError> {
    let inner = body
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| ClientError::Decode(format!("missing `{key}` in response")))?;
    serde_json::from_value(inner).map_err(|e| ClientError::Decode(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ClientError> {
    serde_json::from_value(body).map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl<T: Record> RemoteCollection<T> for HttpStudyApi {
    async fn list(&self) -> Result<Vec<T>, ClientError> {
        let body = self.send(self.request(Method::GET, T::PATH)).await?;
        unwrap_envelope(body, T::MANY)
    }

    async fn create(&self, input: &T::Create) -> Result<T, ClientError> {
        let body = self
            .send(self.request(Method::POST, T::PATH).json(input))
            .await?;
        unwrap_envelope(body, T::ONE)
    }

    async fn update(&self, id: T::Id, patch: &T::Patch) -> Result<T, ClientError> {
        let path = format!("{}/{id}", T::PATH);
        let body = self
            .send(self.request(Method::PATCH, &path).json(patch))
            .await?;
        unwrap_envelope(body, T::ONE)
    }

    async fn delete(&self, id: T::Id) -> Result<(), ClientError> {
        let path = format!("{}/{id}", T::PATH);
        self.send(self.request(Method::DELETE, &path)).await.map(drop)
    }
}

#[async_trait]
impl RemoteTopics for HttpStudyApi {
    async fn list_topics(&self) -> Result<Vec<Topic>, ClientError> {
        RemoteCollection::<Topic>::list(self).await
    }

    async fn create_topic(&self, input: &CreateTopic) -> Result<TopicChange, ClientError> {
        let body = self
            .send(self.request(Method::POST, Topic::PATH).json(input))
            .await?;
        decode(body)
    }

    async fn update_topic(
        &self,
        id: TopicId,
        patch: &UpdateTopic,
    ) -> Result<TopicChange, ClientError> {
        let path = format!("{}/{id}", Topic::PATH);
        let body = self
            .send(self.request(Method::PATCH, &path).json(patch))
            .await?;
        decode(body)
    }

    async fn delete_topic(&self, id: TopicId) -> Result<TopicRemoval, ClientError> {
        let path = format!("{}/{id}", Topic::PATH);
        let body = self.send(self.request(Method::DELETE, &path)).await?;
        decode(body)
    }
}
