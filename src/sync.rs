use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};

/// Mutex that ignores poisoning. A writer thread that panics halfway through
/// a line must not take the sinks away from every other handle.
pub(crate) struct Mutex<T> {
    std: StdMutex<T>,
}

impl<T> Mutex<T> {
    pub(crate) fn new(value: T) -> Self {
        Mutex {
            std: StdMutex::new(value),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<T> {
        self.std.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn into_inner(self) -> T {
        self.std.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
