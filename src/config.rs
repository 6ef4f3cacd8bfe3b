use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    pub openrouter_api_key: Option<String>,
    pub firecrawl_api_key: Option<String>,
    pub poke_api_key: Option<String>,

    #[serde(default = "default_digest_model")]
    pub digest_model: String,

    #[serde(default = "default_poke_api_url")]
    pub poke_api_url: String,

    #[serde(default = "default_poke_chat_id")]
    pub poke_chat_id: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_digest_interval")]
    pub digest_interval_minutes: u64,

    #[serde(default = "default_scrape_workers")]
    pub scrape_workers: usize,

    #[serde(default = "default_share_url_prefix")]
    pub share_url_prefix: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("riff-digest");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("riff.db").to_string_lossy().to_string()
}

fn default_digest_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}

fn default_poke_api_url() -> String {
    "https://api.poke.so/v1/messages".to_string()
}

fn default_poke_chat_id() -> String {
    "default_group".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8001
}

fn default_digest_interval() -> u64 {
    3
}

fn default_scrape_workers() -> usize {
    1
}

fn default_share_url_prefix() -> String {
    "https://chatgpt.com/share/".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            openrouter_api_key: None,
            firecrawl_api_key: None,
            poke_api_key: None,
            digest_model: default_digest_model(),
            poke_api_url: default_poke_api_url(),
            poke_chat_id: default_poke_chat_id(),
            host: default_host(),
            port: default_port(),
            digest_interval_minutes: default_digest_interval(),
            scrape_workers: default_scrape_workers(),
            share_url_prefix: default_share_url_prefix(),
            request_timeout_secs: default_request_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load the config file (creating it with defaults on first run), then
    /// apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("riff-digest")
            .join("config.toml")
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATABASE_PATH") {
            self.db_path = v;
        }
        if let Some(v) = get("OPENROUTER_API_KEY") {
            self.openrouter_api_key = Some(v);
        }
        if let Some(v) = get("FIRECRAWL_API_KEY") {
            self.firecrawl_api_key = Some(v);
        }
        if let Some(v) = get("POKE_API_KEY") {
            self.poke_api_key = Some(v);
        }
        if let Some(v) = get("DIGEST_MODEL") {
            self.digest_model = v;
        }
        if let Some(v) = get("POKE_API_URL") {
            self.poke_api_url = v;
        }
        if let Some(v) = get("POKE_CHAT_ID") {
            self.poke_chat_id = v;
        }
        if let Some(v) = get("WEBHOOK_PORT") {
            self.port = parse_var("WEBHOOK_PORT", &v)?;
        }
        if let Some(v) = get("DIGEST_INTERVAL_MINUTES") {
            self.digest_interval_minutes = parse_var("DIGEST_INTERVAL_MINUTES", &v)?;
        }
        if let Some(v) = get("SCRAPE_WORKERS") {
            self.scrape_workers = parse_var("SCRAPE_WORKERS", &v)?;
        }

        if self.digest_interval_minutes == 0 {
            return Err(AppError::Config(
                "digest_interval_minutes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn digest_interval(&self) -> Duration {
        Duration::from_secs(self.digest_interval_minutes * 60)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, value)))
}
