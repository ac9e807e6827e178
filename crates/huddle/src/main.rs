//! The `huddle-server` binary: configuration and process bootstrap.
//!
//! The relay itself lives in the library; this is just logging setup,
//! port selection from the environment, and the run loop.

use huddle::{DEFAULT_PORT, HuddleServerBuilder};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = match std::env::var("PORT") {
        Ok(value) => value.parse()?,
        Err(_) => {
            tracing::info!(port = DEFAULT_PORT, "PORT not set, using default");
            DEFAULT_PORT
        }
    };

    tracing::info!(port, "starting huddle relay server");
    let server = HuddleServerBuilder::new()
        .bind(&format!("0.0.0.0:{port}"))
        .build()
        .await?;

    server.run().await?;
    Ok(())
}
