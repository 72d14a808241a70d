use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, absorbing poison.
///
/// Fault dispatch must keep working after a handler panicked while holding
/// one of our locks, so poison is never treated as fatal: the guard is
/// recovered and the caller proceeds with whatever state the panicking
/// thread left behind.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
