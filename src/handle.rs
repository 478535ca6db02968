use super::Inner;
use crate::stamp::Timestamp;
use crate::sync::Mutex;
use std::fmt::{self, Debug};
use std::io::{Result, Write};
use std::sync::Arc;

/// Shared access to a [`Tee`](super::Tee) from other threads.
///
/// A handle can inject forced messages and change the timestamp settings
/// while the owner of the tee keeps writing. Changes to the settings take
/// effect at the next line start handled by the tee; when two threads toggle
/// the same setting, the last one wins.
///
/// ```
/// use dualout::Tee;
/// use std::io::Write;
/// use std::thread;
///
/// let mut tee = Tee::new(Vec::<u8>::new(), Vec::<u8>::new());
/// let handle = tee.handle();
///
/// writeln!(tee, "acquisition started").unwrap();
/// thread::spawn(move || {
///     handle.enable_timestamp_b();
///     handle.force_message("buffer underrun").unwrap();
/// })
/// .join()
/// .unwrap();
///
/// let (console, log) = tee.into_inner().unwrap();
/// assert_eq!(console, b"acquisition started\nbuffer underrun\n");
///
/// let log = String::from_utf8(log).unwrap();
/// let forced = log.lines().last().unwrap();
/// assert!(forced.starts_with('[') && forced.ends_with(" buffer underrun"));
/// ```
pub struct Handle<A, B> {
    pub(super) inner: Arc<Mutex<Inner<A, B>>>,
}

impl<A, B> Handle<A, B> {
    pub(super) fn new(inner: Arc<Mutex<Inner<A, B>>>) -> Self {
        Handle { inner }
    }

    /// Turns on timestamps for sink A.
    pub fn enable_timestamp_a(&self) {
        self.inner.lock().timestamp_a = true;
    }

    /// Turns on timestamps for sink B.
    pub fn enable_timestamp_b(&self) {
        self.inner.lock().timestamp_b = true;
    }

    /// Turns off timestamps for sink A.
    pub fn disable_timestamp_a(&self) {
        self.inner.lock().timestamp_a = false;
    }

    /// Turns off timestamps for sink B.
    pub fn disable_timestamp_b(&self) {
        self.inner.lock().timestamp_b = false;
    }

    /// The most recently computed timestamp, or an empty string.
    pub fn last_timestamp(&self) -> String {
        self.inner
            .lock()
            .last
            .as_ref()
            .map_or_else(String::new, Timestamp::to_string)
    }

    /// The most recently computed timestamp as a value, if any.
    pub fn last_stamp(&self) -> Option<Timestamp> {
        self.inner.lock().last.clone()
    }
}

impl<A: Write, B: Write> Handle<A, B> {
    /// Writes `message` followed by a newline to both sinks, as a line of its
    /// own at the current position of the stream.
    ///
    /// A line in progress is ended first. The forced line is timestamped on
    /// each sink that has timestamps enabled, and the stream is left at the
    /// start of a new line.
    ///
    /// This blocks until any write in progress on another thread has finished,
    /// then returns only after the forced line has been handed to both sinks.
    /// It never waits for the owner of the tee to write anything.
    pub fn force_message(&self, message: &str) -> Result<()> {
        self.inner.lock().force(message)?;
        Ok(())
    }
}

impl<A, B> Clone for Handle<A, B> {
    fn clone(&self) -> Self {
        Handle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, B> Debug for Handle<A, B> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_tuple("Handle")
            .field(&Arc::as_ptr(&self.inner))
            .finish()
    }
}
