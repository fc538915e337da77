//! Configuration loading and validation.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Well-known environment variable for the xAI key (agent LLM and live search).
pub const XAI_API_KEY_ENV: &str = "XAI_API_KEY";

/// Well-known environment variable for the Google Cloud TTS key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment flag that short-circuits `/workflow` without running the pipeline.
pub const DEBUG_SKIP_PIPELINE_ENV: &str = "DEBUG_SKIP_PIPELINE";

pub const DEFAULT_XAI_BASE_URL: &str = "https://api.x.ai";
pub const DEFAULT_XAI_MODEL: &str = "grok-4-fast";
pub const DEFAULT_TTS_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Top-level Hot Topic Radio configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<SearchConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<TtsConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// LLM settings for the Topic Agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tool_iterations: Option<u32>,

    /// Replaces the built-in persona instructions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl AgentConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }
}

/// Live search (xAI chat completions with `search_parameters`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_favorites: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_views: Option<u64>,
}

impl SearchConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }
}

/// Text-to-speech (Google Cloud TTS) configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Voice name (default: "ja-JP-Neural2-D").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,

    /// BCP-47 language code (default: "ja-JP").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,

    /// Audio encoding (default: "LINEAR16", which yields a WAV container).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_encoding: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaking_rate: Option<f64>,
}

impl TtsConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        resolve_secret_field(&self.api_key, &self.api_key_env)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,

    /// Serve the embedded browser UI at `/` (default: true).
    #[serde(default = "default_true")]
    pub ui: bool,

    /// Echo the request instead of running the pipeline.
    #[serde(default)]
    pub debug_skip_pipeline: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: None,
            ui: true,
            debug_skip_pipeline: false,
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "hot_topic_gateway=debug").
    #[serde(default)]
    pub filters: Vec<String>,

    /// Output target: "stderr" (default) or "stdout".
    #[serde(default = "default_log_output")]
    pub output: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
            output: default_log_output(),
        }
    }
}

fn default_log_format() -> String {
    "plain".into()
}

fn default_log_output() -> String {
    "stderr".into()
}

/// Resolve a secret: check the direct value first, then the env-var reference.
pub fn resolve_secret_field(direct: &Option<String>, env_var: &Option<String>) -> Option<String> {
    if let Some(val) = direct {
        if !val.is_empty() {
            return Some(val.clone());
        }
    }
    if let Some(env) = env_var {
        if let Ok(val) = std::env::var(env) {
            if !val.is_empty() {
                return Some(val);
            }
        }
    }
    None
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> crate::error::Result<String> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| crate::error::HotTopicError::Config(e.to_string()))?;
    Ok(re
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_default()
        })
        .into_owned())
}

/// Environment flags echoed by `POST /health` and logged per workflow request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentFlags {
    #[serde(rename = "APP_ENV")]
    pub app_env: Option<String>,
    #[serde(rename = "DEPLOY_PLATFORM")]
    pub platform: Option<String>,
    #[serde(rename = "DEPLOY_ENV")]
    pub platform_env: Option<String>,
}

impl EnvironmentFlags {
    pub fn from_env() -> Self {
        Self {
            app_env: env_non_empty("APP_ENV"),
            platform: env_non_empty("DEPLOY_PLATFORM"),
            platform_env: env_non_empty("DEPLOY_ENV"),
        }
    }

    /// Hosted deployments log more per request.
    pub fn is_hosted(&self) -> bool {
        self.platform.is_some()
    }
}

impl Config {
    /// Load config from a JSON5 file, substituting `${ENV_VAR}` references.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loading config");

        // Substitute ${ENV_VAR} references before parsing
        let substituted = substitute_env_vars(&raw)?;

        let config: Config = json5::from_str(&substituted)
            .map_err(|e| crate::error::HotTopicError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Default config file path.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway.as_ref().map(|g| g.port).unwrap_or_else(default_port)
    }

    pub fn gateway_bind(&self) -> String {
        self.gateway
            .as_ref()
            .and_then(|g| g.bind.clone())
            .unwrap_or_else(|| "0.0.0.0".to_string())
    }

    pub fn ui_enabled(&self) -> bool {
        self.gateway.as_ref().is_none_or(|g| g.ui)
    }

    /// Config flag, or `DEBUG_SKIP_PIPELINE=true` in the environment.
    pub fn debug_skip_pipeline(&self) -> bool {
        self.gateway.as_ref().is_some_and(|g| g.debug_skip_pipeline)
            || env_non_empty(DEBUG_SKIP_PIPELINE_ENV).is_some_and(|v| v == "true")
    }

    pub fn agent_base_url(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.base_url.clone())
            .unwrap_or_else(|| DEFAULT_XAI_BASE_URL.to_string())
    }

    pub fn agent_model(&self) -> String {
        self.agent
            .as_ref()
            .and_then(|a| a.model.clone())
            .unwrap_or_else(|| DEFAULT_XAI_MODEL.to_string())
    }

    pub fn max_tokens(&self) -> u32 {
        self.agent.as_ref().and_then(|a| a.max_tokens).unwrap_or(2048)
    }

    pub fn temperature(&self) -> Option<f64> {
        self.agent.as_ref().and_then(|a| a.temperature)
    }

    pub fn max_tool_iterations(&self) -> u32 {
        self.agent
            .as_ref()
            .and_then(|a| a.max_tool_iterations)
            .unwrap_or(8)
    }

    /// Agent LLM key: config, then `XAI_API_KEY`.
    pub fn agent_api_key(&self) -> Option<String> {
        self.agent
            .as_ref()
            .and_then(|a| a.resolve_api_key())
            .or_else(|| env_non_empty(XAI_API_KEY_ENV))
    }

    /// Live search key: config, then `XAI_API_KEY`.
    pub fn search_api_key(&self) -> Option<String> {
        self.search
            .as_ref()
            .and_then(|s| s.resolve_api_key())
            .or_else(|| env_non_empty(XAI_API_KEY_ENV))
    }

    /// TTS key: config, then `GOOGLE_API_KEY`.
    pub fn tts_api_key(&self) -> Option<String> {
        self.tts
            .as_ref()
            .and_then(|t| t.resolve_api_key())
            .or_else(|| env_non_empty(GOOGLE_API_KEY_ENV))
    }

    pub fn persona(&self) -> Option<&str> {
        self.agent.as_ref().and_then(|a| a.persona.as_deref())
    }

    pub fn search_base_url(&self) -> String {
        self.search
            .as_ref()
            .and_then(|s| s.base_url.clone())
            .unwrap_or_else(|| DEFAULT_XAI_BASE_URL.to_string())
    }

    pub fn search_model(&self) -> String {
        self.search
            .as_ref()
            .and_then(|s| s.model.clone())
            .unwrap_or_else(|| DEFAULT_XAI_MODEL.to_string())
    }

    pub fn search_max_results(&self) -> u32 {
        self.search.as_ref().and_then(|s| s.max_results).unwrap_or(10)
    }

    pub fn search_min_favorites(&self) -> u64 {
        self.search.as_ref().and_then(|s| s.min_favorites).unwrap_or(100)
    }

    pub fn search_min_views(&self) -> u64 {
        self.search.as_ref().and_then(|s| s.min_views).unwrap_or(1000)
    }

    pub fn tts_base_url(&self) -> String {
        self.tts
            .as_ref()
            .and_then(|t| t.base_url.clone())
            .unwrap_or_else(|| DEFAULT_TTS_BASE_URL.to_string())
    }

    pub fn tts_voice(&self) -> String {
        self.tts
            .as_ref()
            .and_then(|t| t.voice.clone())
            .unwrap_or_else(|| "ja-JP-Neural2-D".to_string())
    }

    pub fn tts_language_code(&self) -> String {
        self.tts
            .as_ref()
            .and_then(|t| t.language_code.clone())
            .unwrap_or_else(|| "ja-JP".to_string())
    }

    pub fn tts_audio_encoding(&self) -> String {
        self.tts
            .as_ref()
            .and_then(|t| t.audio_encoding.clone())
            .unwrap_or_else(|| "LINEAR16".to_string())
    }

    pub fn tts_speaking_rate(&self) -> Option<f64> {
        self.tts.as_ref().and_then(|t| t.speaking_rate)
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if self.agent_api_key().is_none() {
            warnings.push(format!(
                "Agent has no API key configured (set agent.api_key or {XAI_API_KEY_ENV})"
            ));
        }
        if self.search_api_key().is_none() {
            warnings.push(format!(
                "Live search has no API key configured (set search.api_key or {XAI_API_KEY_ENV})"
            ));
        }
        if self.tts_api_key().is_none() {
            warnings.push(format!(
                "TTS has no API key configured (set tts.api_key or {GOOGLE_API_KEY_ENV})"
            ));
        }

        if let Some(gw) = &self.gateway {
            if gw.port == 0 {
                errors.push("Gateway port cannot be 0".to_string());
            }
        }

        if let Some(logging) = &self.logging {
            if logging.format != "plain" && logging.format != "json" {
                errors.push(format!("Unknown log format: {}", logging.format));
            }
        }

        (warnings, errors)
    }
}

/// Base directory for Hot Topic Radio data: `~/.hot_topic_radio/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".hot_topic_radio")
}
