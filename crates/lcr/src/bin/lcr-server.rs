//! Runs the LCR game server.
//!
//! ```bash
//! LCR_BIND=0.0.0.0:8080 RUST_LOG=debug cargo run --bin lcr-server
//! ```

use std::time::Duration;

use lcr::prelude::*;

/// Reads a whole number of seconds from `var`, if set and valid.
fn secs_from_env(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            tracing::warn!(var, value = %raw, error = %e, "ignoring invalid duration");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let addr = std::env::var("LCR_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let mut builder = LcrServer::builder().bind(&addr);
    if let Some(grace) = secs_from_env("LCR_RECONNECT_GRACE_SECS") {
        builder = builder.reconnect_grace(grace);
    }
    if let Some(idle) = secs_from_env("LCR_ROOM_IDLE_SECS") {
        builder = builder.idle_timeout(idle);
    }

    let server = builder.build().await?;
    println!("LCR server listening on ws://{}", server.local_addr()?);
    server.run().await?;
    Ok(())
}
