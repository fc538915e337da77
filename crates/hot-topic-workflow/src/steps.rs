//! Production step implementations.

use async_trait::async_trait;

use hot_topic_agent::TopicAgent;
use hot_topic_core::types::TopicQuery;

use crate::TopicGenerator;

#[async_trait]
impl TopicGenerator for TopicAgent {
    async fn generate(&self, query: &TopicQuery, run_id: &str) -> anyhow::Result<String> {
        TopicAgent::generate(self, query, run_id).await
    }
}
