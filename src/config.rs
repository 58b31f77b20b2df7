use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::str::FromStr;

/// How updates reach the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Telegram POSTs each update to our HTTP listener.
    #[default]
    Webhook,
    /// We long-poll `getUpdates` ourselves.
    Polling,
}

impl FromStr for TransportMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webhook" | "push" => Ok(TransportMode::Webhook),
            "polling" | "poll" | "pull" => Ok(TransportMode::Polling),
            other => bail!("Unknown transport mode '{}' (expected webhook or polling)", other),
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Webhook => write!(f, "webhook"),
            TransportMode::Polling => write!(f, "polling"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: TransportMode,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub polling: PollingConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Registered with `setWebhook` at startup when present.
    pub webhook_url: Option<Url>,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Long-poll wait passed to `getUpdates`, in seconds.
    pub timeout_secs: u32,
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_llm_timeout_secs() -> u64 {
    30
}

fn default_poll_timeout_secs() -> u32 {
    60
}

impl Config {
    /// Load from the process environment, after applying a `.env` file if one exists.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Unset and blank are treated the same.
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN environment variable not set")?;
        let api_key =
            get("OPENAI_API_KEY").context("OPENAI_API_KEY environment variable not set")?;

        let mode = match get("BOT_MODE") {
            Some(raw) => raw.parse().context("Invalid BOT_MODE")?,
            None => TransportMode::default(),
        };

        let webhook_url = get("WEBHOOK_URL")
            .map(|raw| Url::parse(&raw).with_context(|| format!("Invalid WEBHOOK_URL: {}", raw)))
            .transpose()?;

        let port = parse_or(get("PORT"), "PORT", default_port)?;
        let timeout_secs = parse_or(
            get("OPENAI_TIMEOUT_SECS"),
            "OPENAI_TIMEOUT_SECS",
            default_llm_timeout_secs,
        )?;
        let poll_timeout_secs = parse_or(
            get("POLL_TIMEOUT_SECS"),
            "POLL_TIMEOUT_SECS",
            default_poll_timeout_secs,
        )?;

        Ok(Config {
            mode,
            telegram: TelegramConfig {
                bot_token,
                webhook_url,
            },
            llm: LlmConfig {
                api_key,
                base_url: get("OPENAI_BASE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_base_url),
                model: get("OPENAI_MODEL").unwrap_or_else(default_model),
                timeout_secs,
            },
            server: ServerConfig { port },
            polling: PollingConfig {
                timeout_secs: poll_timeout_secs,
            },
        })
    }
}

fn parse_or<T, D>(raw: Option<String>, key: &str, default: D) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    D: FnOnce() -> T,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {}", key, raw)),
        None => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const SECRETS: [(&str, &str); 2] = [
        ("TELEGRAM_BOT_TOKEN", "123:abc"),
        ("OPENAI_API_KEY", "sk-test"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = load(&SECRETS).unwrap();
        assert_eq!(config.mode, TransportMode::Webhook);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(config.llm.model, "gpt-3.5-turbo");
        assert_eq!(config.llm.timeout_secs, 30);
        assert_eq!(config.polling.timeout_secs, 60);
        assert!(config.telegram.webhook_url.is_none());
    }

    #[test]
    fn test_missing_bot_token_is_fatal() {
        let err = load(&[("OPENAI_API_KEY", "sk-test")]).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "123:abc")]).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_blank_secret_counts_as_missing() {
        let err = load(&[("TELEGRAM_BOT_TOKEN", "  "), ("OPENAI_API_KEY", "sk-test")])
            .unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = SECRETS.to_vec();
        vars.extend([
            ("PORT", "9000"),
            ("BOT_MODE", "polling"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1/"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("POLL_TIMEOUT_SECS", "25"),
            ("WEBHOOK_URL", "https://bot.example.com/"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.mode, TransportMode::Polling);
        assert_eq!(config.llm.base_url, "http://localhost:11434/v1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.polling.timeout_secs, 25);
        assert_eq!(
            config.telegram.webhook_url.as_ref().map(Url::as_str),
            Some("https://bot.example.com/")
        );
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut vars = SECRETS.to_vec();
        vars.push(("PORT", "eighty"));
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_transport_mode_parse() {
        assert_eq!("Webhook".parse::<TransportMode>().unwrap(), TransportMode::Webhook);
        assert_eq!("poll".parse::<TransportMode>().unwrap(), TransportMode::Polling);
        assert!("carrier-pigeon".parse::<TransportMode>().is_err());
    }
}
