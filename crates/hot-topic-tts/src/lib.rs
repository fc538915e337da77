//! Speech synthesis.
//!
//! [`SpeechSynthesizer`] is the seam the pipeline's second step depends on;
//! [`google::GoogleTtsClient`] is the production implementation.

use async_trait::async_trait;

use hot_topic_core::audio::AudioPayload;

pub mod google;

pub use google::GoogleTtsClient;

/// Turns narration text into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizer identifier for logs (e.g., "google").
    fn id(&self) -> &str;

    /// Synthesize `text`. Any failure is a fault; callers do not retry.
    async fn synthesize(&self, text: &str) -> anyhow::Result<AudioPayload>;
}
