use std::sync::Arc;

use tracing::{error, info};

use tus_core::{config::Config, engine::{CorrelationEngine, ExchangeOptions}, transport::BotTransport};
use tus_http::{AppState, Bridge};
use tus_telegram::TelegramTransport;

#[tokio::main]
async fn main() -> Result<(), tus_core::Error> {
    tus_core::logging::init("tus")?;

    // Missing credentials abort here, before anything binds.
    let cfg = Arc::new(Config::load()?);

    // A failed Telegram connection is fatal to readiness, not to the process:
    // we still serve `/status` (offline) and fail `/search` fast with 503.
    let bridge = match TelegramTransport::connect(&cfg).await {
        Ok(transport) => {
            let transport: Arc<dyn BotTransport> = Arc::new(transport);
            let engine = Arc::new(CorrelationEngine::new(
                Arc::clone(&transport),
                ExchangeOptions::from_config(&cfg),
            ));
            info!("bridge ready for @{}", cfg.bot_username);
            Some(Bridge { transport, engine })
        }
        Err(e) => {
            error!("telegram startup failed, serving unready: {e}");
            None
        }
    };

    tus_http::serve(AppState { cfg, bridge }).await
}
