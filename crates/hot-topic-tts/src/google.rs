//! Google Cloud Text-to-Speech REST client.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use hot_topic_core::audio::AudioPayload;
use hot_topic_core::config::Config;

use crate::SpeechSynthesizer;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub struct GoogleTtsClient {
    base_url: String,
    api_key: Option<String>,
    voice: String,
    language_code: String,
    audio_encoding: String,
    speaking_rate: Option<f64>,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaking_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<serde_json::Value>,
}

impl GoogleTtsClient {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.tts_base_url().trim_end_matches('/').to_string(),
            api_key: config.tts_api_key(),
            voice: config.tts_voice(),
            language_code: config.tts_language_code(),
            audio_encoding: config.tts_audio_encoding(),
            speaking_rate: config.tts_speaking_rate(),
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SynthesizeRequest<'a> {
        SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language_code,
                name: &self.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: &self.audio_encoding,
                speaking_rate: self.speaking_rate,
            },
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTtsClient {
    fn id(&self) -> &str {
        "google"
    }

    async fn synthesize(&self, text: &str) -> anyhow::Result<AudioPayload> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No TTS API key configured"))?;

        debug!(voice = %self.voice, text_len = text.len(), "Requesting speech synthesis");

        let resp = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .query(&[("key", api_key)])
            .json(&self.request_body(text))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("TTS API error {status}: {body}");
        }

        let body: SynthesizeResponse = resp.json().await?;
        let content = body
            .audio_content
            .ok_or_else(|| anyhow::anyhow!("TTS response carried no audioContent"))?;
        let audio = AudioPayload::from_json(&content)?;

        info!(
            voice = %self.voice,
            bytes = audio.len(),
            mime = audio.mime_type(),
            "Speech synthesized"
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let client = GoogleTtsClient::from_config(&Config::default());
        let body = serde_json::to_value(client.request_body("こんにちは")).unwrap();
        assert_eq!(body["input"]["text"], "こんにちは");
        assert_eq!(body["voice"]["languageCode"], "ja-JP");
        assert_eq!(body["voice"]["name"], "ja-JP-Neural2-D");
        assert_eq!(body["audioConfig"]["audioEncoding"], "LINEAR16");
        assert!(body["audioConfig"].get("speakingRate").is_none());
    }

    #[tokio::test]
    async fn test_missing_key_is_fault() {
        let client = GoogleTtsClient::from_config(&Config::default())
            .with_base_url("http://127.0.0.1:9")
            .with_api_key(None);
        let err = client.synthesize("text").await.unwrap_err();
        assert!(err.to_string().contains("No TTS API key"));
    }
}
