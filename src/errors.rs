use std::{fmt, time::Duration};

use crate::transport::BoxError;

/// Errors raised while validating a [`HedgeConfig`](crate::HedgeConfig).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The delay between attempts was negative.
    #[error("interval must be non-negative, got {0}ms")]
    NegativeInterval(i64),

    /// Fewer than one attempt was requested.
    #[error("max attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(i64),
}

/// A single attempt's transport failure.
#[derive(thiserror::Error, Debug)]
#[error("attempt {index}: {source}")]
pub struct AttemptError {
    /// Launch index of the failed attempt (0 is the original request).
    pub index: usize,
    /// The error reported by the transport.
    #[source]
    pub source: BoxError,
}

/// Every failure of a call in which no attempt succeeded, in launch order.
#[derive(Debug, Default)]
pub struct AttemptErrors(Vec<AttemptError>);

impl AttemptErrors {
    pub(crate) fn new(errors: Vec<AttemptError>) -> Self {
        Self(errors)
    }

    /// Number of attempts that contributed a failure.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttemptError> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<AttemptError> {
        self.0
    }
}

impl fmt::Display for AttemptErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            writeln!(f, "1 error occurred:")?;
        } else {
            writeln!(f, "{} errors occurred:", self.0.len())?;
        }
        for err in &self.0 {
            writeln!(f, "\t* {err}")?;
        }
        writeln!(f)
    }
}

/// Errors that can end a hedged call.
#[derive(thiserror::Error, Debug)]
pub enum HedgeError {
    /// Every launched attempt failed.
    ///
    /// Contains each attempt's error in launch order.
    #[error("{0}")]
    AllFailed(AttemptErrors),

    /// The caller's cancellation token fired before any attempt succeeded.
    #[error("hedged call cancelled by caller")]
    Cancelled,

    /// The configured overall timeout elapsed before any attempt succeeded.
    #[error("hedged call timed out after {0:?}")]
    Timeout(Duration),
}

impl HedgeError {
    /// Returns `true` when the call ended because the caller gave up, either
    /// through its token or the overall timeout.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, HedgeError::Cancelled | HedgeError::Timeout(_))
    }

    /// The per-attempt errors, if the call failed because every attempt failed.
    pub fn attempt_errors(&self) -> Option<&AttemptErrors> {
        match self {
            HedgeError::AllFailed(errors) => Some(errors),
            _ => None,
        }
    }
}
