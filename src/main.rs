use std::sync::Arc;

use anyhow::Result;

use tradegram::bybit::rest::BybitRestClient;
use tradegram::chat::telegram::{decode_update, TelegramClient};
use tradegram::config::Config;
use tradegram::dispatch::SessionRouter;
use tradegram::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load config
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!(
                "Make sure .env exists with BYBIT_API_KEY, BYBIT_API_SECRET and TELEGRAM_BOT_TOKEN"
            );
            std::process::exit(1);
        }
    };

    // Init tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                config
                    .logging
                    .level
                    .parse()
                    .unwrap_or_else(|_| "info".parse().unwrap())
            }),
        )
        .json()
        .init();

    tracing::info!(
        rest_url = %config.bybit.rest_base_url,
        symbols = ?config.bybit.tradable_symbols(),
        "Starting tradegram"
    );

    let gateway = BybitRestClient::new(&config.bybit)?;
    let telegram = Arc::new(TelegramClient::new(&config.telegram)?);
    let orchestrator = Arc::new(Orchestrator::new(gateway));
    let mut router = SessionRouter::new(
        orchestrator,
        Arc::clone(&telegram),
        config.bybit.tradable_symbols(),
    );

    let mut offset: i64 = 0;
    loop {
        let updates = tokio::select! {
            res = telegram.get_updates(offset) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        };

        let updates = match updates {
            Ok(u) => u,
            Err(e) => {
                tracing::error!(error = %e, "getUpdates failed, retrying");
                tokio::time::sleep(std::time::Duration::from_secs(3)).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            if let Some(cb) = &update.callback_query {
                if let Err(e) = telegram.answer_callback_query(&cb.id).await {
                    tracing::debug!(error = %e, "answerCallbackQuery failed");
                }
            }
            if let Some(event) = decode_update(&update) {
                router.route(event);
            }
        }
    }

    Ok(())
}
