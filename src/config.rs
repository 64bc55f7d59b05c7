//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory
//! (or the path in `CHATBOT_CONFIG`), then applies `CHATBOT_LOG_LEVEL` and
//! `CHATBOT_HTTP_BIND` env overrides. The LLM credential is read from
//! `OPENAI_API_KEY` exactly once, here, and never from TOML.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

/// Env var holding the completion-service credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Socket address to bind the HTTP channel to.
    pub bind: String,
}

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature. `None` leaves it to the service default.
    pub temperature: Option<f32>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Extra attempts after a transient failure. `0` disables retrying.
    pub max_retries: u32,
    /// First backoff delay; doubled after every failed attempt.
    pub retry_base_delay_ms: u64,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"openai"` or `"dummy"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    /// Config for the OpenAI / OpenAI-compatible provider (`[llm.openai]`).
    pub openai: OpenAiConfig,
}

/// Conversation handling configuration.
#[derive(Debug, Clone, Default)]
pub struct ConversationConfig {
    /// Maximum number of stored turns replayed to the completion service.
    /// `None` sends the whole transcript.
    pub context_turns: Option<usize>,
}

/// Fully-resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub log_level: String,
    pub http: HttpConfig,
    pub llm: LlmConfig,
    pub conversation: ConversationConfig,
    /// API key from `OPENAI_API_KEY`. `None` when unset or blank.
    pub llm_api_key: Option<String>,
}

/// Env-sourced values, passed explicitly so tests never mutate the process env.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub http_bind: Option<String>,
    pub api_key: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("CHATBOT_LOG_LEVEL").ok(),
            http_bind: env::var("CHATBOT_HTTP_BIND").ok(),
            api_key: env::var(API_KEY_ENV).ok(),
        }
    }
}

/// Raw TOML shape — `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    app: RawApp,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    llm: RawLlm,
    #[serde(default)]
    conversation: RawConversation,
}

#[derive(Deserialize)]
struct RawApp {
    #[serde(default = "default_app_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

impl Default for RawApp {
    fn default() -> Self {
        Self { name: default_app_name(), log_level: default_log_level() }
    }
}

#[derive(Deserialize)]
struct RawHttp {
    /// Bind address for the HTTP listener.
    #[serde(default = "default_http_bind")]
    bind: String,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self { bind: default_http_bind() }
    }
}

#[derive(Deserialize)]
struct RawLlm {
    /// Maps to `default = "..."` in `[llm]`.
    #[serde(rename = "default", default = "default_llm_provider")]
    provider: String,
    #[serde(default)]
    openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self { provider: default_llm_provider(), openai: RawOpenAiConfig::default() }
    }
}

#[derive(Deserialize)]
struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    api_base_url: String,
    #[serde(default = "default_openai_model")]
    model: String,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default = "default_openai_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    retry_base_delay_ms: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: None,
            timeout_seconds: default_openai_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
        }
    }
}

#[derive(Deserialize, Default)]
struct RawConversation {
    /// `0` or absent means unlimited.
    #[serde(default)]
    context_turns: Option<usize>,
}

fn default_app_name() -> String { "chatbot".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_http_bind() -> String { "0.0.0.0:5000".to_string() }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_openai_api_base_url() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_openai_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_openai_timeout_seconds() -> u64 { 60 }
fn default_max_retries() -> u32 { 2 }
fn default_retry_base_delay_ms() -> u64 { 500 }

/// Load config from `config/default.toml` (or `CHATBOT_CONFIG`), then apply
/// env-var overrides.
pub fn load() -> Result<Config, AppError> {
    let path = env::var("CHATBOT_CONFIG")
        .map(|p| expand_home(&p))
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    load_from(&path, &Overrides::from_env())
}

/// Internal loader: accepts an explicit path and overrides.
/// Tests pass overrides directly instead of mutating env vars.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: &Overrides) -> Result<Config, AppError> {
    let provider = parsed.llm.provider;
    let llm_api_key = overrides
        .api_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToString::to_string);

    // Fail here, at startup, rather than on the first outbound call.
    if provider == "openai" && llm_api_key.is_none() {
        return Err(AppError::Config(format!(
            "{API_KEY_ENV} is not set; it is required by the \"openai\" provider \
             (set it in the environment or in .env, or select `default = \"dummy\"` under [llm])"
        )));
    }

    let o = parsed.llm.openai;
    if o.timeout_seconds == 0 {
        return Err(AppError::Config("llm.openai.timeout_seconds must be greater than 0".into()));
    }

    Ok(Config {
        app_name: parsed.app.name,
        log_level: overrides.log_level.clone().unwrap_or(parsed.app.log_level),
        http: HttpConfig {
            bind: overrides.http_bind.clone().unwrap_or(parsed.http.bind),
        },
        llm: LlmConfig {
            provider,
            openai: OpenAiConfig {
                api_base_url: o.api_base_url,
                model: o.model,
                temperature: o.temperature,
                timeout_seconds: o.timeout_seconds,
                max_retries: o.max_retries,
                retry_base_delay_ms: o.retry_base_delay_ms,
            },
        },
        conversation: ConversationConfig {
            context_turns: parsed.conversation.context_turns.filter(|n| *n > 0),
        },
        llm_api_key,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Safe `Config` for tests: dummy LLM, no API key, no external calls.
    pub fn test_default() -> Self {
        Self {
            app_name: "test".into(),
            log_level: "info".into(),
            http: HttpConfig { bind: "127.0.0.1:0".into() },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: None,
                    timeout_seconds: 1,
                    max_retries: 0,
                    retry_base_delay_ms: 1,
                },
            },
            conversation: ConversationConfig::default(),
            llm_api_key: None,
        }
    }
}
