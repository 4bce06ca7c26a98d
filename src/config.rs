use std::time::Duration;

use crate::errors::ConfigError;

/// Hedging strategy configuration.
///
/// Controls how many duplicate attempts a single call may dispatch and how far
/// apart they are launched. Built through [`HedgeConfig::new`] or
/// [`HedgeConfig::from_millis`], both of which validate their input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HedgeConfig {
    interval: Duration,
    max_attempts: usize,
    overall_timeout: Option<Duration>,
}

impl HedgeConfig {
    /// Creates a configuration that launches up to `max_attempts` attempts,
    /// one every `interval`.
    ///
    /// A zero `interval` launches attempts back-to-back.
    pub fn new(interval: Duration, max_attempts: usize) -> Result<Self, ConfigError> {
        if max_attempts < 1 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts as i64));
        }

        Ok(Self {
            interval,
            max_attempts,
            overall_timeout: None,
        })
    }

    /// Creates a configuration from signed inputs, as read from the environment
    /// or another untyped source.
    pub fn from_millis(interval_ms: i64, max_attempts: i64) -> Result<Self, ConfigError> {
        if interval_ms < 0 {
            return Err(ConfigError::NegativeInterval(interval_ms));
        }
        if max_attempts < 1 {
            return Err(ConfigError::InvalidMaxAttempts(max_attempts));
        }

        Self::new(
            Duration::from_millis(interval_ms as u64),
            max_attempts as usize,
        )
    }

    /// Bounds the total time a call may take. When it elapses the call is
    /// abandoned exactly as if the caller had cancelled it.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = Some(timeout);
        self
    }

    /// Delay between successive attempt launches.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Upper bound on attempts dispatched for one call.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Upper bound on a whole hedged call, if one was set with [`Self::with_timeout`].
    pub fn overall_timeout(&self) -> Option<Duration> {
        self.overall_timeout
    }

    /// Creates a low-latency hedging configuration.
    ///
    /// - Up to 3 attempts
    /// - 20ms between attempts
    /// - 1 second timeout
    pub fn low_latency() -> Self {
        Self {
            interval: Duration::from_millis(20),
            max_attempts: 3,
            overall_timeout: Some(Duration::from_secs(1)),
        }
    }

    /// Creates a conservative hedging configuration.
    ///
    /// Only hedges once, and only if the original is slow:
    /// - Up to 2 attempts
    /// - 100ms between attempts
    /// - 3 second timeout
    pub fn conservative() -> Self {
        Self {
            interval: Duration::from_millis(100),
            max_attempts: 2,
            overall_timeout: Some(Duration::from_secs(3)),
        }
    }

    /// Creates an aggressive hedging configuration.
    ///
    /// Prioritizes latency over backend load:
    /// - Up to 5 attempts
    /// - 10ms between attempts
    /// - 1 second timeout
    pub fn aggressive() -> Self {
        Self {
            interval: Duration::from_millis(10),
            max_attempts: 5,
            overall_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl Default for HedgeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(80),
            max_attempts: 2,
            overall_timeout: None,
        }
    }
}
