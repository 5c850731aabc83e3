//! Callback-style work units.
//!
//! Lets a factory hand out a one-shot [`Settle`] handle instead of writing an
//! `async` block, for code that completes through callbacks:
//!
//! ```no_run
//! use concurrent_runner::settle::{executor, Settle};
//!
//! let unit = executor(|settle: Settle<u32, String>| {
//!     std::thread::spawn(move || settle.resolve(21 * 2));
//! });
//! ```
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;
use tracing::warn;


/// One-shot completion handle. Every method consumes it, so a unit settles
/// at most once.
pub struct Settle<R, E> {
    tx: oneshot::Sender<Result<R, E>>,
}

impl<R, E> Settle<R, E> {
    #[inline]
    pub fn resolve(self, value: R) {
        self.settle(Ok(value));
    }

    #[inline]
    pub fn reject(self, reason: E) {
        self.settle(Err(reason));
    }

    pub fn settle(self, result: Result<R, E>) {
        // Receiver gone means nobody is waiting on this unit any more.
        let _ = self.tx.send(result);
    }
}


/// Future side of a callback unit, created by [`executor`].
///
/// If the [`Settle`] handle is dropped unsettled this never completes.
pub struct Executor<R, E> {
    rx: oneshot::Receiver<Result<R, E>>,
    abandoned: bool,
}

/// Runs `body` right away with a fresh [`Settle`] handle and returns the
/// future that completes when the handle is used.
pub fn executor<R, E, F>(body: F) -> Executor<R, E>
where
    F: FnOnce(Settle<R, E>),
{
    let (tx, rx) = oneshot::channel();
    body(Settle { tx });
    Executor {
        rx,
        abandoned: false,
    }
}

impl<R, E> Future for Executor<R, E> {
    type Output = Result<R, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if this.abandoned {
            return Poll::Pending;
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => {
                this.abandoned = true;
                warn!("settle handle dropped without resolving; work unit will never complete");
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
