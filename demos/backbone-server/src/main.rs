//! The backbone server binary.
//!
//! Runs a Gamespine backbone with the mirror login policy. Optionally
//! takes a JSON config file as its single argument:
//!
//! ```json
//! { "host": "0.0.0.0", "port": 45000, "log_filter": "info" }
//! ```

use gamespine::prelude::*;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerConfig {
    host: String,
    port: u16,
    /// Tracing filter directive; `RUST_LOG` overrides it.
    log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 45000,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    fn load() -> Result<Self, Box<dyn std::error::Error>> {
        match std::env::args().nth(1) {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)?;
                Ok(serde_json::from_str(&raw)?)
            }
            None => Ok(Self::default()),
        }
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .init();

    let addr = config.bind_addr();
    tracing::info!(%addr, "starting backbone server");

    let server = BackboneServer::builder()
        .bind(&addr)
        .build(MirrorValidator)
        .await?;
    server.run().await?;
    Ok(())
}
