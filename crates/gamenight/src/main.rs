//! Game Night server binary.
//!
//! Listens on `0.0.0.0:$PORT` (default 3000). Logging follows `RUST_LOG`,
//! falling back to `info`.

use gamenight::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 3000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let port = match std::env::var("PORT") {
        Ok(raw) => raw.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };

    let server = GameNightServer::builder()
        .bind(&format!("0.0.0.0:{port}"))
        .game(gamenight_fishbowl::GAME_TYPE, gamenight_fishbowl::new_session)
        .game(gamenight_codenames::GAME_TYPE, gamenight_codenames::new_session)
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "listening");

    server.run().await?;
    Ok(())
}
