use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::{
    sync::mpsc,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::{
    attempt::{Attempt, Completion, Outcome},
    config::HedgeConfig,
    errors::{AttemptError, AttemptErrors, ConfigError, HedgeError},
    stats::Stats,
    tag::AttemptTag,
    transport::{HyperTransport, Transport},
};

/// Upper bound on how long a losing response body is read before it is dropped.
const LOSER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Races duplicate attempts of one request and returns the first success.
///
/// The original attempt is sent immediately. While no attempt has succeeded,
/// another one is launched every [`HedgeConfig::interval`], up to
/// [`HedgeConfig::max_attempts`] in total. The first successful response wins and
/// every other attempt still in flight is cancelled. Transport errors do not end
/// the race; only when every attempt has failed does the call fail, with all of
/// their errors.
///
/// Cloning a `Hedger` is cheap and clones share the same [`Stats`].
pub struct Hedger<T> {
    transport: Arc<T>,
    config: HedgeConfig,
    stats: Arc<Stats>,
}

impl<T> Clone for Hedger<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<T> std::fmt::Debug for Hedger<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hedger")
            .field("config", &self.config)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

impl Hedger<HyperTransport> {
    /// Creates a hedger over the default hyper transport.
    pub fn with_defaults(config: HedgeConfig) -> Self {
        Self::new(config, HyperTransport::new())
    }
}

impl<T: Transport> Hedger<T> {
    /// Creates a hedger that sends every attempt through `transport`.
    pub fn new(config: HedgeConfig, transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            stats: Arc::new(Stats::new()),
        }
    }

    /// Validates `(interval, max_attempts)` and builds a hedger, falling back to
    /// `T::default()` when no transport is given.
    pub fn build(
        interval: Duration,
        max_attempts: usize,
        transport: Option<T>,
    ) -> Result<Self, ConfigError>
    where
        T: Default,
    {
        let config = HedgeConfig::new(interval, max_attempts)?;
        Ok(Self::new(config, transport.unwrap_or_default()))
    }

    /// The configuration every call is hedged with.
    pub fn config(&self) -> &HedgeConfig {
        &self.config
    }

    /// Counters shared by every call made through this hedger and its clones.
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// Runs a hedged call that only ends on success or when every attempt failed
    /// (or the configured timeout elapsed).
    pub async fn execute(&self, request: Request<Bytes>) -> Result<Response<T::Body>, HedgeError> {
        self.execute_with(request, &CancellationToken::new()).await
    }

    /// Runs a hedged call that is abandoned as soon as `caller` is cancelled.
    ///
    /// Every attempt runs under a child of `caller`. Dropping the returned future
    /// cancels all attempts still in flight and is counted like a caller
    /// cancellation.
    pub async fn execute_with(
        &self,
        request: Request<Bytes>,
        caller: &CancellationToken,
    ) -> Result<Response<T::Body>, HedgeError> {
        self.stats.record_requested();

        let call_scope = caller.child_token();
        let interval = self.config.interval();
        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut guard = RaceGuard::new(Race::new(self.config.max_attempts()), &self.stats);

        guard
            .race
            .launch(&request, &call_scope, &self.transport, &done_tx, &self.stats);

        let next_launch = time::sleep(interval);
        tokio::pin!(next_launch);

        let timeout = self.config.overall_timeout();
        let deadline = time::sleep(timeout.unwrap_or(Duration::ZERO));
        tokio::pin!(deadline);

        let decision = loop {
            let race = &mut guard.race;
            tokio::select! {
                biased;

                _ = caller.cancelled() => {
                    tracing::debug!(launched = race.launched(), "hedged call cancelled by caller");
                    break Decision::Abandoned(HedgeError::Cancelled);
                }

                _ = &mut deadline, if timeout.is_some() => {
                    let timeout = timeout.unwrap_or_default();
                    tracing::debug!(launched = race.launched(), ?timeout, "hedged call timed out");
                    call_scope.cancel();
                    break Decision::Abandoned(HedgeError::Timeout(timeout));
                }

                Some(Completion { index, outcome }) = done_rx.recv() => match outcome {
                    Outcome::Success(response) => {
                        tracing::trace!(attempt.index = index, "attempt won the race");
                        race.resolve(index);
                        break Decision::Won(index, response);
                    }
                    Outcome::Failure(source) => {
                        self.stats.record_failed();
                        tracing::debug!(attempt.index = index, error = %source, "attempt failed");
                        race.fail(index, source);
                        if race.is_exhausted() {
                            break Decision::Exhausted;
                        }
                    }
                    Outcome::Cancelled => race.resolve(index),
                },

                _ = &mut next_launch, if race.can_launch() => {
                    tracing::debug!(attempt.index = race.launched(), "launching hedged attempt");
                    race.launch(&request, &call_scope, &self.transport, &done_tx, &self.stats);
                    next_launch.as_mut().reset(Instant::now() + interval);
                }
            }
        };

        match decision {
            Decision::Won(index, mut response) => {
                response.extensions_mut().insert(AttemptTag::new(index));
                guard.settle(false);
                drain_losers(done_rx);
                Ok(response)
            }
            Decision::Abandoned(err) => {
                guard.settle(true);
                drain_losers(done_rx);
                Err(err)
            }
            Decision::Exhausted => {
                guard.settle(false);
                Err(HedgeError::AllFailed(guard.race.take_errors()))
            }
        }
    }
}

/// How the race loop ended.
enum Decision<B> {
    Won(usize, Response<B>),
    Abandoned(HedgeError),
    Exhausted,
}

/// Bookkeeping for the attempts of one call.
struct Race {
    attempts: Vec<Attempt>,
    errors: Vec<AttemptError>,
    max_attempts: usize,
}

impl Race {
    fn new(max_attempts: usize) -> Self {
        Self {
            attempts: Vec::new(),
            errors: Vec::new(),
            max_attempts,
        }
    }

    fn launched(&self) -> usize {
        self.attempts.len()
    }

    fn can_launch(&self) -> bool {
        self.attempts.len() < self.max_attempts
    }

    fn launch<T: Transport>(
        &mut self,
        request: &Request<Bytes>,
        scope: &CancellationToken,
        transport: &Arc<T>,
        done: &mpsc::UnboundedSender<Completion<T::Body>>,
        stats: &Stats,
    ) {
        let index = self.attempts.len();
        stats.record_dispatched();
        self.attempts
            .push(Attempt::spawn(index, request, scope, transport, done.clone()));
    }

    fn resolve(&mut self, index: usize) {
        if let Some(attempt) = self.attempts.get_mut(index) {
            attempt.resolve();
        }
    }

    fn fail(&mut self, index: usize, source: crate::transport::BoxError) {
        self.resolve(index);
        self.errors.push(AttemptError { index, source });
    }

    /// All attempts have been launched and none is left in flight.
    fn is_exhausted(&self) -> bool {
        !self.can_launch() && self.attempts.iter().all(Attempt::is_resolved)
    }

    /// Cancels every attempt still in flight and returns how many there were.
    fn cancel_pending(&mut self) -> u64 {
        self.attempts
            .iter_mut()
            .map(|attempt| attempt.cancel() as u64)
            .sum()
    }

    fn take_errors(&mut self) -> AttemptErrors {
        let mut errors = std::mem::take(&mut self.errors);
        errors.sort_by_key(|err| err.index);
        AttemptErrors::new(errors)
    }
}

/// Owns the [`Race`] of one call and settles its counters exactly once.
///
/// A call future dropped before the race is decided counts as cancelled by
/// the caller, and every attempt still in flight is cancelled with it.
struct RaceGuard<'a> {
    race: Race,
    stats: &'a Stats,
    settled: bool,
}

impl<'a> RaceGuard<'a> {
    fn new(race: Race, stats: &'a Stats) -> Self {
        Self {
            race,
            stats,
            settled: false,
        }
    }

    fn settle(&mut self, canceled_by_user: bool) {
        if std::mem::replace(&mut self.settled, true) {
            return;
        }
        let canceled = self.race.cancel_pending();
        self.stats.record_finished(canceled, canceled_by_user);
    }
}

impl Drop for RaceGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::debug!(launched = self.race.launched(), "hedged call dropped before completion");
            self.settle(true);
        }
    }
}

/// Reads and discards responses from attempts that finished after the call
/// was decided, so their connections go back to the pool.
fn drain_losers<B>(mut done_rx: mpsc::UnboundedReceiver<Completion<B>>)
where
    B: Body<Data = Bytes> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(Completion { index, outcome }) = done_rx.recv().await {
            if let Outcome::Success(response) = outcome {
                let drained = time::timeout(LOSER_DRAIN_TIMEOUT, response.into_body().collect()).await;
                tracing::trace!(attempt.index = index, drained = drained.is_ok(), "released losing response");
            }
        }
    });
}
