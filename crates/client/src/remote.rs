use async_trait::async_trait;
use study_core::model::{CreateTopic, Topic, TopicId, UpdateTopic};
use study_core::{TopicChange, TopicRemoval};

use crate::error::ClientError;
use crate::record::Record;

/// Server side of one collection as the optimistic layer sees it.
#[async_trait]
pub trait RemoteCollection<T: Record>: Send + Sync {
    async fn list(&self) -> Result<Vec<T>, ClientError>;
    async fn create(&self, input: &T::Create) -> Result<T, ClientError>;
    async fn update(&self, id: T::Id, patch: &T::Patch) -> Result<T, ClientError>;
    async fn delete(&self, id: T::Id) -> Result<(), ClientError>;
}

/// Topic writes with the subject progress the server recomputed alongside.
#[async_trait]
pub trait RemoteTopics: Send + Sync {
    async fn list_topics(&self) -> Result<Vec<Topic>, ClientError>;
    async fn create_topic(&self, input: &CreateTopic) -> Result<TopicChange, ClientError>;
    async fn update_topic(
        &self,
        id: TopicId,
        patch: &UpdateTopic,
    ) -> Result<TopicChange, ClientError>;
    async fn delete_topic(&self, id: TopicId) -> Result<TopicRemoval, ClientError>;
}
