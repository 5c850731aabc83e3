use super::{
    errors::{panic_message, Failure},
    result::WorkerOutcome,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll}
};
use tokio::task::JoinError;


/// Handle on one spawned worker.
///
/// Dropping it detaches the worker: the task keeps draining the source, its
/// outcome is just never observed.
pub(crate) struct WorkerHandle<R, E> {
    index: usize,
    task: tokio::task::JoinHandle<WorkerOutcome<R, E>>,
}

impl<R, E> WorkerHandle<R, E> {

    pub(crate) fn new(index: usize, task: tokio::task::JoinHandle<WorkerOutcome<R, E>>) -> Self {
        Self {
            index,
            task,
        }
    }

    /// Launch index, 0..N-1.
    #[inline]
    pub(crate) fn index(&self) -> usize {
        self.index
    }
}

fn join_failure<E>(join_err: JoinError) -> Failure<E> {
    if join_err.is_panic() {
        Failure::Panicked(panic_message(join_err.into_panic().as_ref()))
    } else {
        Failure::Aborted
    }
}

impl<R, E> Future for WorkerHandle<R, E> {
    type Output = WorkerOutcome<R, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.task).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(join_err)) => Poll::Ready(Err(join_failure(join_err))),
            Poll::Pending => Poll::Pending,
        }
    }
}
