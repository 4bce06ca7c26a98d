//! Command-line probe for hedged HTTP requests.
//!
//! Sends a batch of hedged `GET` requests to one target and reports, per call,
//! which attempt won and how long it took, followed by the hedger's counters.
//! Configuration comes from the environment, see [`env::settings_from_env`].

mod env;

use std::time::Instant;

use color_eyre::Result;
use env::build_client_from_env;
use hedged_http::{winning_attempt, CancellationToken};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let (client, settings) = build_client_from_env()?;
    tracing::info!(
        target_url = %settings.target,
        config = ?settings.config,
        calls = settings.calls,
        "starting hedged probe"
    );

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    for call_idx in 0..settings.calls {
        let start = Instant::now();
        let mut request = http::Request::new(bytes::Bytes::new());
        *request.uri_mut() = settings.target.clone();

        match client.request_with(request, &shutdown).await {
            Ok(response) => {
                tracing::info!(
                    call = call_idx,
                    status = %response.status(),
                    winner = ?winning_attempt(&response),
                    latency = ?start.elapsed(),
                    "call succeeded"
                );
            }
            Err(err) if err.is_cancellation() => {
                tracing::warn!(call = call_idx, error = %err, "call abandoned");
                break;
            }
            Err(err) => {
                tracing::warn!(call = call_idx, latency = ?start.elapsed(), error = %err, "call failed");
            }
        }
    }

    println!("\n=== summary ===");
    println!("{}", client.stats().snapshot());

    Ok(())
}
