use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("bybit API error (code {code}): {msg}")]
    BybitApi { code: i64, msg: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("telegram API error: {0}")]
    Telegram(String),

    #[error("invalid exchange record: {0}")]
    InvalidRecord(String),
}
