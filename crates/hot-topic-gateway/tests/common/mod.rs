//! Fake pipeline steps and gateway builders shared by the gateway tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hot_topic_core::audio::AudioPayload;
use hot_topic_core::config::{Config, EnvironmentFlags, GatewayConfig};
use hot_topic_core::events::DEVELOPER_HOT_TOPIC_WORKFLOW;
use hot_topic_core::types::TopicQuery;
use hot_topic_gateway::GatewayState;
use hot_topic_workflow::{PipelineRunner, SpeechSynthesizer, TopicGenerator, WorkflowRegistry};

pub const WAV_B64: &str = "UklGRiQAAABXQVZFZm10IBAAAAABAAEAwF0AAIC7AAACABAAZGF0YQAAAAA=";

/// Echoes the requested date back in the topic text.
pub struct DateEcho;

#[async_trait]
impl TopicGenerator for DateEcho {
    async fn generate(&self, query: &TopicQuery, _run_id: &str) -> anyhow::Result<String> {
        Ok(format!("話題: {}", query.prompt()))
    }
}

/// Never finishes on its own.
pub struct Stalled;

#[async_trait]
impl TopicGenerator for Stalled {
    async fn generate(&self, _query: &TopicQuery, _run_id: &str) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(600)).await;
        Ok(String::new())
    }
}

pub struct Panicking;

#[async_trait]
impl TopicGenerator for Panicking {
    async fn generate(&self, _query: &TopicQuery, _run_id: &str) -> anyhow::Result<String> {
        panic!("generator exploded");
    }
}

pub struct WavSynth;

#[async_trait]
impl SpeechSynthesizer for WavSynth {
    fn id(&self) -> &str {
        "wav"
    }

    async fn synthesize(&self, _text: &str) -> anyhow::Result<AudioPayload> {
        Ok(AudioPayload::from_base64(WAV_B64)?)
    }
}

pub struct FailingSynth;

#[async_trait]
impl SpeechSynthesizer for FailingSynth {
    fn id(&self) -> &str {
        "failing"
    }

    async fn synthesize(&self, _text: &str) -> anyhow::Result<AudioPayload> {
        anyhow::bail!("Google TTS returned 503")
    }
}

pub fn registry_with(
    generator: Arc<dyn TopicGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
) -> WorkflowRegistry {
    let mut registry = WorkflowRegistry::new();
    registry.register_runner(Arc::new(PipelineRunner::new(
        DEVELOPER_HOT_TOPIC_WORKFLOW,
        generator,
        synthesizer,
    )));
    registry
}

pub fn state_with(registry: WorkflowRegistry, config: Config) -> Arc<GatewayState> {
    Arc::new(GatewayState::new(Arc::new(config), registry).with_env(EnvironmentFlags {
        app_env: Some("test".into()),
        platform: None,
        platform_env: None,
    }))
}

pub fn working_state() -> Arc<GatewayState> {
    state_with(
        registry_with(Arc::new(DateEcho), Arc::new(WavSynth)),
        Config::default(),
    )
}

pub fn debug_config() -> Config {
    Config {
        gateway: Some(GatewayConfig {
            debug_skip_pipeline: true,
            ..GatewayConfig::default()
        }),
        ..Config::default()
    }
}

/// Bind the router on an ephemeral port and return its base URL.
pub async fn spawn_gateway(state: Arc<GatewayState>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = hot_topic_gateway::build_router(state, false);
    tokio::spawn(async move {
        let _ = hot_topic_gateway::serve(listener, router).await;
    });
    format!("http://{addr}")
}
