//! An HTTP client that implements fixed-interval request hedging.
//!
//! Instead of sending one request and waiting out its latency tail, the client
//! sends the original request, then a duplicate every `interval`, up to
//! `max_attempts` copies. The first successful response is returned and every
//! other copy still in flight is cancelled.
//!
//! # Quick Start
//!
//! ```no_run
//! use hedged_http::HedgedClient;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, stats) = HedgedClient::new(Duration::from_millis(20), 3)?;
//!
//! let response = client.get("http://127.0.0.1:8080/quote".parse()?).await?;
//! println!("got {} after {} attempts", response.status(), stats.actual_round_trips());
//! # Ok(())
//! # }
//! ```
//!
//! # Hedging Strategy
//!
//! 1. The original attempt is sent immediately
//! 2. While nothing has succeeded, another attempt is sent every `interval`
//! 3. The first successful response wins; the rest are cancelled
//! 4. If every attempt fails, all of their errors are returned together
//!
//! Transports and middleware running underneath the hedger can tell duplicates
//! from the original with [`is_hedged_request`].
//!
//! # Preset Configurations
//!
//! Use `HedgeConfig::low_latency()`, `::conservative()`, or `::aggressive()` for
//! common hedging strategies, or build a custom configuration.

mod attempt;
pub mod client;
pub mod config;
pub mod errors;
pub mod hedger;
pub mod stats;
pub mod tag;
pub mod transport;

pub use client::HedgedClient;
pub use config::HedgeConfig;
pub use errors::{AttemptError, AttemptErrors, ConfigError, HedgeError};
pub use hedger::Hedger;
pub use stats::{Stats, StatsSnapshot};
pub use tag::{attempt_index, is_hedged_request, winning_attempt};
pub use tokio_util::sync::CancellationToken;
pub use transport::{transport_fn, BoxError, BoxFuture, HyperTransport, Transport};
