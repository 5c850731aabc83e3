use super::errors::{panic_message, Failure};
use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Mutex, PoisonError},
};


/// The single iteration cursor shared by all workers of a run.
///
/// `pull` holds the lock for exactly one `next()` call. After the first
/// `None` (or a panic inside `next()`) the iterator is dropped and every
/// later pull reports exhaustion.
pub(crate) struct SharedCursor<I> {
    inner: Mutex<Option<I>>,
}

impl<I: Iterator> SharedCursor<I> {
    pub(crate) fn new(iter: I) -> Self {
        Self {
            inner: Mutex::new(Some(iter)),
        }
    }

    pub(crate) fn pull<E>(&self) -> Result<Option<I::Item>, Failure<E>> {
        // Panics from `next()` are caught below, so the lock cannot be
        // poisoned by this type.
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(iter) = guard.as_mut() else {
            return Ok(None);
        };

        match catch_unwind(AssertUnwindSafe(|| iter.next())) {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => {
                *guard = None;
                Ok(None)
            }
            Err(payload) => {
                *guard = None;
                Err(Failure::Panicked(panic_message(payload.as_ref())))
            }
        }
    }
}
