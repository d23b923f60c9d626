use clap::Parser;
use std::fmt;
use std::time::Duration;

const MAX_TEMPERATURE: f32 = 1.0;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// API key for the completion service. Classification is disabled when unset
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub base_url: String,

    /// Model identifier sent with every completion request
    #[arg(long, env = "MODEL", default_value = "gpt-3.5-turbo")]
    pub model: String,

    /// Sampling temperature for classification requests, between 0.0 and 1.0
    #[arg(long, env = "TEMPERATURE", default_value = "0.2", value_parser = parse_temperature)]
    pub temperature: f32,

    /// Request timeout in seconds. No timeout when unset
    #[arg(long, env = "REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Category used when reviewing the comment feed
    #[arg(long, env = "REVIEW_CATEGORY", default_value = "general")]
    pub review_category: String,

    /// Apply the archiving mode and custom category when reviewing the feed
    #[arg(long, env = "HONOR_SETTINGS")]
    pub honor_settings: bool,

    /// Emit logs as JSON
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

/// Settings the completion client is built from.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Option<Duration>,
}

impl Config {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Client settings, or `None` when no API key was supplied.
    pub fn client_config(&self) -> Option<ClientConfig> {
        let api_key = self.openai_api_key.as_ref()?.trim();
        if api_key.is_empty() {
            return None;
        }

        Some(ClientConfig {
            api_key: api_key.to_string(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: self.request_timeout_secs.map(Duration::from_secs),
        })
    }
}

/// Accepts temperatures from 0.0 up to `MAX_TEMPERATURE`.
fn parse_temperature(value: &str) -> Result<f32, String> {
    let temperature: f32 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(format!("must be between 0.0 and {MAX_TEMPERATURE}"));
    }
    Ok(temperature)
}

fn redact(key: &Option<String>) -> &'static str {
    match key {
        Some(_) => "<redacted>",
        None => "<unset>",
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("review_category", &self.review_category)
            .field("honor_settings", &self.honor_settings)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}
