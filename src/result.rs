use super::errors::Failure;

/// Outcome of a whole run in the short-circuiting modes.
pub type RunResult<T, E> = Result<T, Failure<E>>;

/// Everything one worker produced, in the order it pulled items, or the
/// failure that ended it.
pub type WorkerOutcome<R, E> = Result<Vec<R>, Failure<E>>;
