use std::any::Any;
use thiserror::Error;


/// Why a worker stopped before draining the source.
///
/// `Rejected` carries the caller's reason untouched; the other variants are
/// produced by the runner itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure<E> {
    #[error("work unit rejected: {0}")]
    Rejected(E),
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("worker task aborted before settling")]
    Aborted,
}

impl<E> Failure<E> {
    /// The caller-supplied reason, if this is a rejection.
    pub fn reason(&self) -> Option<&E> {
        match self {
            Failure::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn into_reason(self) -> Option<E> {
        match self {
            Failure::Rejected(reason) => Some(reason),
            _ => None,
        }
    }

    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, Failure::Panicked(_))
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
}


pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
