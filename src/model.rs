use super::errors::Failure;


/// Per-worker record returned by the settled mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(Failure<E>),
}

impl<T, E> Settled<T, E> {
    #[inline]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Settled::Rejected(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&Failure<E>> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<T, Failure<E>> {
        match self {
            Settled::Fulfilled(value) => Ok(value),
            Settled::Rejected(failure) => Err(failure),
        }
    }
}

impl<T, E> From<Result<T, Failure<E>>> for Settled<T, E> {
    fn from(result: Result<T, Failure<E>>) -> Self {
        match result {
            Ok(value) => Settled::Fulfilled(value),
            Err(failure) => Settled::Rejected(failure),
        }
    }
}


/// Snapshot of a runner's counters, accumulated over every run it started.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub runs_started: usize,
    pub items_pulled: usize,
    pub units_completed: usize,
    pub units_failed: usize,
    pub active_workers: usize,
}

impl RunMetrics {
    pub fn success_rate(&self) -> f64 {
        let total = self.units_completed + self.units_failed;
        if total == 0 {
            return 1.0;
        }
        self.units_completed as f64 / total as f64
    }

    /// Units that were pulled but have not settled yet.
    pub fn in_flight(&self) -> usize {
        self.items_pulled
            .saturating_sub(self.units_completed + self.units_failed)
    }

    #[inline]
    pub fn idle(&self) -> bool {
        self.active_workers == 0
    }
}
