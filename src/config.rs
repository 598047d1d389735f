use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bybit: BybitConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BybitConfig {
    pub rest_base_url: String,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    pub recv_window: u64,
    pub request_timeout_secs: u64,
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub api_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub api_base_url: String,
    pub poll_timeout_secs: u64,
    #[serde(skip)]
    pub bot_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn default_symbols() -> Vec<String> {
    vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]
}

impl BybitConfig {
    /// Symbols offered in the order / leverage pickers, normalized and deduped.
    pub fn tradable_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for sym in &self.symbols {
            let s = sym.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.iter().any(|v| v == &s) {
                out.push(s);
            }
        }
        if out.is_empty() {
            out = default_symbols();
        }
        out
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = Path::new("config/default.toml");
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;

        let mut config: Config =
            toml::from_str(&config_str).context("failed to parse config/default.toml")?;

        config.bybit.api_key = std::env::var("BYBIT_API_KEY")
            .context("BYBIT_API_KEY not set in .env or environment")?;
        config.bybit.api_secret = std::env::var("BYBIT_API_SECRET")
            .context("BYBIT_API_SECRET not set in .env or environment")?;
        config.telegram.bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN not set in .env or environment")?;

        Ok(config)
    }
}
