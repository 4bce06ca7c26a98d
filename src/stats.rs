use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        PoisonError, RwLock, RwLockReadGuard,
    },
};

/// Outcome counters for every call made through one [`Hedger`](crate::Hedger).
///
/// Counters only ever grow. Each one can be read on its own, or all five can be
/// captured together with [`Stats::snapshot`].
///
/// Writers increment the atomics while holding the shared side of `gate`;
/// `snapshot` takes the exclusive side, so it never observes half of an
/// update that touches several counters at once.
#[derive(Debug, Default)]
pub struct Stats {
    requested_round_trips: AtomicU64,
    actual_round_trips: AtomicU64,
    failed_round_trips: AtomicU64,
    canceled_by_user_round_trips: AtomicU64,
    canceled_sub_requests: AtomicU64,
    gate: RwLock<()>,
}

/// All five [`Stats`] counters captured at the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatsSnapshot {
    /// Logical calls started.
    pub requested_round_trips: u64,
    /// Attempts dispatched to the transport.
    pub actual_round_trips: u64,
    /// Attempts that ended in a transport error.
    pub failed_round_trips: u64,
    /// Calls abandoned because the caller cancelled or timed out.
    pub canceled_by_user_round_trips: u64,
    /// Attempts cancelled by the hedger after a winner or a caller cancellation.
    pub canceled_sub_requests: u64,
}

impl Stats {
    /// Creates a set of counters, all at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested_round_trips(&self) -> u64 {
        self.requested_round_trips.load(Ordering::Acquire)
    }

    pub fn actual_round_trips(&self) -> u64 {
        self.actual_round_trips.load(Ordering::Acquire)
    }

    pub fn failed_round_trips(&self) -> u64 {
        self.failed_round_trips.load(Ordering::Acquire)
    }

    pub fn canceled_by_user_round_trips(&self) -> u64 {
        self.canceled_by_user_round_trips.load(Ordering::Acquire)
    }

    pub fn canceled_sub_requests(&self) -> u64 {
        self.canceled_sub_requests.load(Ordering::Acquire)
    }

    /// Captures all counters together.
    pub fn snapshot(&self) -> StatsSnapshot {
        let _exclusive = self.gate.write().unwrap_or_else(PoisonError::into_inner);

        StatsSnapshot {
            requested_round_trips: self.requested_round_trips(),
            actual_round_trips: self.actual_round_trips(),
            failed_round_trips: self.failed_round_trips(),
            canceled_by_user_round_trips: self.canceled_by_user_round_trips(),
            canceled_sub_requests: self.canceled_sub_requests(),
        }
    }

    fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn record_requested(&self) {
        let _shared = self.shared();
        self.requested_round_trips.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_dispatched(&self) {
        let _shared = self.shared();
        self.actual_round_trips.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn record_failed(&self) {
        let _shared = self.shared();
        self.failed_round_trips.fetch_add(1, Ordering::AcqRel);
    }

    /// Records the attempts a call cancelled on its way out, and whether the
    /// call ended because the caller gave up.
    pub(crate) fn record_finished(&self, canceled_sub_requests: u64, canceled_by_user: bool) {
        let _shared = self.shared();
        if canceled_sub_requests > 0 {
            self.canceled_sub_requests
                .fetch_add(canceled_sub_requests, Ordering::AcqRel);
        }
        if canceled_by_user {
            self.canceled_by_user_round_trips
                .fetch_add(1, Ordering::AcqRel);
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requested={} actual={} failed={} canceled_by_user={} canceled_sub_requests={}",
            self.requested_round_trips,
            self.actual_round_trips,
            self.failed_round_trips,
            self.canceled_by_user_round_trips,
            self.canceled_sub_requests,
        )
    }
}
