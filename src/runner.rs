use super::{
    cursor::SharedCursor,
    errors::{panic_message, ConfigError, Failure},
    handle::WorkerHandle,
    model::{RunMetrics, Settled},
    result::{RunResult, WorkerOutcome},
};
use std::{
    future::Future,
    num::NonZeroUsize,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use crossbeam::utils::CachePadded;
use futures::{
    future::join_all,
    stream::{FuturesUnordered, StreamExt},
    FutureExt,
};
use tracing::{debug, debug_span, trace, Instrument};


/// Runner configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub max_concurrency: NonZeroUsize,
}

fn cpus_times(factor: usize) -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get() * factor).unwrap_or(NonZeroUsize::MIN)
}

impl Default for Config {
    fn default() -> Self {
        // Work units are usually I/O-bound
        Self {
            max_concurrency: cpus_times(2),
        }
    }
}

impl Config {
    pub fn new(max_concurrency: NonZeroUsize) -> Self {
        Self { max_concurrency }
    }

    pub fn cpu_bound() -> Self {
        Self {
            max_concurrency: cpus_times(1),
        }
    }

    pub fn io_bound() -> Self {
        Self {
            max_concurrency: cpus_times(2),
        }
    }
}

impl TryFrom<usize> for Config {
    type Error = ConfigError;

    fn try_from(max_concurrency: usize) -> Result<Self, Self::Error> {
        NonZeroUsize::new(max_concurrency)
            .map(Self::new)
            .ok_or(ConfigError::ZeroConcurrency)
    }
}


#[derive(Default)]
struct Counters {
    runs_started: CachePadded<AtomicUsize>,
    items_pulled: CachePadded<AtomicUsize>,
    units_completed: CachePadded<AtomicUsize>,
    units_failed: CachePadded<AtomicUsize>,
    active_workers: CachePadded<AtomicUsize>,
}


/// Drains a shared source with a fixed number of workers.
///
/// Every run spawns `max_concurrency` tokio tasks that pull from one cursor,
/// so each item goes to exactly one worker. Workers are never cancelled: in
/// the short-circuiting modes the siblings of a failed worker keep running
/// after the run has already returned.
pub struct ConcurrentRunner {
    config: Config,
    counters: Arc<Counters>,
}

impl ConcurrentRunner {
    pub fn new(max_concurrency: NonZeroUsize) -> Self {
        Self::with_config(Config::new(max_concurrency))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> RunMetrics {
        RunMetrics {
            runs_started: self.counters.runs_started.load(Ordering::Relaxed),
            items_pulled: self.counters.items_pulled.load(Ordering::Relaxed),
            units_completed: self.counters.units_completed.load(Ordering::Relaxed),
            units_failed: self.counters.units_failed.load(Ordering::Relaxed),
            active_workers: self.counters.active_workers.load(Ordering::Relaxed),
        }
    }

    /// Spawns the workers of one run and returns their handles in launch
    /// order. Must be called inside a tokio runtime.
    pub(crate) fn spawn_workers<S, F, Fut, R, E>(&self, factory: F, source: S) -> Vec<WorkerHandle<R, E>>
    where
        S: IntoIterator,
        S::IntoIter: Send + 'static,
        S::Item: Send + 'static,
        F: Fn(S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let workers = self.config.max_concurrency.get();
        let cursor = Arc::new(SharedCursor::new(source.into_iter()));
        let factory = Arc::new(factory);

        let run = self.counters.runs_started.fetch_add(1, Ordering::Relaxed);
        debug!(run, workers, "starting run");

        (0..workers)
            .map(|index| {
                let worker = Worker {
                    cursor: Arc::clone(&cursor),
                    factory: Arc::clone(&factory),
                    counters: Arc::clone(&self.counters),
                };
                let span = debug_span!("worker", run, index);
                WorkerHandle::new(index, tokio::spawn(worker.drain().instrument(span)))
            })
            .collect()
    }

    /// One result sequence per worker, in launch order. Resolves with the
    /// first failure observed, without waiting for the other workers.
    pub async fn collect_all<S, F, Fut, R, E>(&self, factory: F, source: S) -> RunResult<Vec<Vec<R>>, E>
    where
        S: IntoIterator,
        S::IntoIter: Send + 'static,
        S::Item: Send + 'static,
        F: Fn(S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let handles = self.spawn_workers(factory, source);
        let mut slots: Vec<Option<Vec<R>>> = Vec::with_capacity(handles.len());
        slots.resize_with(handles.len(), || None);

        let mut pending: FuturesUnordered<_> = handles
            .into_iter()
            .map(|handle| {
                let index = handle.index();
                handle.map(move |outcome| (index, outcome))
            })
            .collect();

        // Returning early drops `pending`, which detaches the workers still running.
        while let Some((index, outcome)) = pending.next().await {
            slots[index] = Some(outcome?);
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Like [`collect_all`](Self::collect_all), concatenated in launch order.
    pub async fn flatten<S, F, Fut, R, E>(&self, factory: F, source: S) -> RunResult<Vec<R>, E>
    where
        S: IntoIterator,
        S::IntoIter: Send + 'static,
        S::Item: Send + 'static,
        F: Fn(S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        let per_worker = self.collect_all(factory, source).await?;
        Ok(per_worker.into_iter().flatten().collect())
    }

    /// Waits for every worker and returns one record per worker in launch
    /// order. Never fails as a whole.
    pub async fn settled<S, F, Fut, R, E>(&self, factory: F, source: S) -> Vec<Settled<Vec<R>, E>>
    where
        S: IntoIterator,
        S::IntoIter: Send + 'static,
        S::Item: Send + 'static,
        F: Fn(S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
    {
        join_all(self.spawn_workers(factory, source))
            .await
            .into_iter()
            .map(Settled::from)
            .collect()
    }
}


/// Holds one slot of `active_workers`; released on drop so a worker torn
/// down mid-run still leaves the counter balanced.
struct ActiveWorker<'a>(&'a AtomicUsize);

impl<'a> ActiveWorker<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for ActiveWorker<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}


struct Worker<I, F> {
    cursor: Arc<SharedCursor<I>>,
    factory: Arc<F>,
    counters: Arc<Counters>,
}

impl<I, F, Fut, R, E> Worker<I, F>
where
    I: Iterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    async fn drain(self) -> WorkerOutcome<R, E> {
        let _active = ActiveWorker::enter(&self.counters.active_workers);
        self.drain_inner().await
    }

    async fn drain_inner(&self) -> WorkerOutcome<R, E> {
        let mut results = Vec::new();

        loop {
            let item = match self.cursor.pull() {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(failure) => {
                    debug!(processed = results.len(), "source panicked, worker stopping");
                    return Err(failure);
                }
            };
            self.counters.items_pulled.fetch_add(1, Ordering::Relaxed);
            trace!("pulled item");

            match self.run_unit(item).await {
                Ok(result) => {
                    self.counters.units_completed.fetch_add(1, Ordering::Relaxed);
                    results.push(result);
                }
                Err(failure) => {
                    self.counters.units_failed.fetch_add(1, Ordering::Relaxed);
                    debug!(processed = results.len(), "work unit failed, worker stopping");
                    return Err(failure);
                }
            }
        }

        debug!(processed = results.len(), "source exhausted");
        Ok(results)
    }

    async fn run_unit(&self, item: I::Item) -> Result<R, Failure<E>> {
        let unit = catch_unwind(AssertUnwindSafe(|| (*self.factory)(item)))
            .map_err(|payload| Failure::Panicked(panic_message(payload.as_ref())))?;

        AssertUnwindSafe(unit)
            .catch_unwind()
            .await
            .map_err(|payload| Failure::Panicked(panic_message(payload.as_ref())))?
            .map_err(Failure::Rejected)
    }
}


/// Collect-all mode with a one-off runner.
pub async fn run_collect_all<S, F, Fut, R, E>(
    max_concurrency: NonZeroUsize,
    factory: F,
    source: S,
) -> RunResult<Vec<Vec<R>>, E>
where
    S: IntoIterator,
    S::IntoIter: Send + 'static,
    S::Item: Send + 'static,
    F: Fn(S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    ConcurrentRunner::new(max_concurrency).collect_all(factory, source).await
}

/// Flatten mode with a one-off runner.
pub async fn run_flatten<S, F, Fut, R, E>(
    max_concurrency: NonZeroUsize,
    factory: F,
    source: S,
) -> RunResult<Vec<R>, E>
where
    S: IntoIterator,
    S::IntoIter: Send + 'static,
    S::Item: Send + 'static,
    F: Fn(S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    ConcurrentRunner::new(max_concurrency).flatten(factory, source).await
}

/// Settled mode with a one-off runner.
pub async fn run_settled<S, F, Fut, R, E>(
    max_concurrency: NonZeroUsize,
    factory: F,
    source: S,
) -> Vec<Settled<Vec<R>, E>>
where
    S: IntoIterator,
    S::IntoIter: Send + 'static,
    S::Item: Send + 'static,
    F: Fn(S::Item) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
{
    ConcurrentRunner::new(max_concurrency).settled(factory, source).await
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_spawn_workers_handles() {
        let runner = ConcurrentRunner::new(NonZeroUsize::new(3).unwrap());
        let handles = runner.spawn_workers(|i: u32| async move { Ok::<_, ()>(i) }, 0..30u32);
        assert_eq!(handles.iter().map(|h| h.index()).collect::<Vec<_>>(), vec![0, 1, 2]);

        let mut seen = HashSet::new();
        for handle in handles {
            for i in handle.await.unwrap() {
                assert!(seen.insert(i));
            }
        }
        assert_eq!(seen.len(), 30);
    }
}
