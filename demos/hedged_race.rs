//! High-volume stress test for hedged HTTP requests.
//!
//! This demo performs thousands of concurrent hedged GETs with a cap on calls in
//! flight, then reports which attempt index tends to win and the hedger's
//! counters. Useful for choosing an interval against a real backend.

use std::{
    collections::BTreeMap,
    env,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use hedged_http::{winning_attempt, HedgeConfig, HedgedClient};
use http::Uri;
use tokio::sync::{mpsc, Semaphore};

const NUM_CALLS: usize = 5_000;
const MAX_IN_FLIGHT: usize = 256;

#[derive(Debug)]
enum CallOutcome {
    Ok { winner: usize, latency: Duration },
    Err { error: String, latency: Duration },
}

#[derive(Debug)]
struct CallResult {
    call_idx: usize,
    outcome: CallOutcome,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Ok(target) = env::var("HEDGED_TARGET_URL") else {
        eprintln!("No target configured.");
        eprintln!("Set HEDGED_TARGET_URL to the endpoint to race against");
        return Ok(());
    };
    let target: Uri = target.parse().context("parsing HEDGED_TARGET_URL")?;

    let cfg = HedgeConfig::aggressive();
    let client = HedgedClient::from_config(cfg);
    let stats = client.stats();

    let (tx, mut rx) = mpsc::channel::<CallResult>(MAX_IN_FLIGHT * 2);
    let semaphore = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let consumer = tokio::spawn(async move {
        let mut results: Vec<CallResult> = Vec::with_capacity(NUM_CALLS);

        while let Some(res) = rx.recv().await {
            match &res.outcome {
                CallOutcome::Ok { winner, latency } => {
                    println!(
                        "[call {:05}] OK   attempt={} latency={:?}",
                        res.call_idx, winner, latency
                    );
                }
                CallOutcome::Err { error, latency } => {
                    println!(
                        "[call {:05}] ERR  latency={:?} error={}",
                        res.call_idx,
                        latency,
                        error.lines().next().unwrap_or_default()
                    );
                }
            }

            results.push(res);
        }

        results
    });

    for i in 0..NUM_CALLS {
        let client = client.clone();
        let tx = tx.clone();
        let target = target.clone();
        let sem = semaphore.clone();

        tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.expect("semaphore closed");

            let start = Instant::now();
            let res = client.get(target).await;
            let elapsed = start.elapsed();

            let outcome = match res {
                Ok(resp) => CallOutcome::Ok {
                    winner: winning_attempt(&resp).unwrap_or_default(),
                    latency: elapsed,
                },
                Err(e) => CallOutcome::Err {
                    error: e.to_string(),
                    latency: elapsed,
                },
            };

            let _ = tx
                .send(CallResult {
                    call_idx: i,
                    outcome,
                })
                .await;
        });
    }

    drop(tx);
    let mut results = consumer.await?;

    results.sort_by_key(|r| r.call_idx);

    let mut wins: BTreeMap<usize, usize> = BTreeMap::new();
    let mut total_latency: BTreeMap<usize, Duration> = BTreeMap::new();
    let mut error_count = 0usize;

    for r in &results {
        match &r.outcome {
            CallOutcome::Ok { winner, latency } => {
                *wins.entry(*winner).or_insert(0) += 1;
                *total_latency.entry(*winner).or_insert(Duration::ZERO) += *latency;
            }
            CallOutcome::Err { .. } => {
                error_count += 1;
            }
        }
    }

    println!("\n=== summary ===");
    println!("total calls          : {}", NUM_CALLS);
    println!("successes            : {}", NUM_CALLS - error_count);
    println!("errors (any kind)    : {}", error_count);

    for (attempt, count) in wins.iter() {
        let total = total_latency[attempt];
        let avg_ms = total.as_secs_f64() * 1000.0 / (*count as f64);
        println!(
            "attempt {:>2}: wins = {:6}, avg_latency = {:8.3} ms",
            attempt, count, avg_ms,
        );
    }
    println!("stats: {}", stats.snapshot());

    Ok(())
}
