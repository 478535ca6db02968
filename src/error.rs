use std::io;
use thiserror::Error;

/// Failure of one or both sinks behind a [`Tee`](crate::Tee).
///
/// Tee operations return a plain [`io::Error`] so that the tee can stand in
/// for any other writer. That error has the kind of the failing sink (sink
/// A's kind if both failed) and wraps a `SinkError` saying which sink it
/// was.
///
/// ```
/// use dualout::{SinkError, Tee};
/// use std::io::{self, Write};
///
/// struct Broken;
///
/// impl Write for Broken {
///     fn write(&mut self, _: &[u8]) -> io::Result<usize> {
///         Err(io::Error::new(io::ErrorKind::BrokenPipe, "console went away"))
///     }
///     fn flush(&mut self) -> io::Result<()> {
///         Ok(())
///     }
/// }
///
/// let mut log: Vec<u8> = Vec::new();
/// let mut tee = Tee::new(Broken, &mut log);
/// let err = tee.write_all(b"still logged\n").unwrap_err();
///
/// assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
/// let sink = SinkError::find(&err).unwrap();
/// assert!(sink.failed_a() && !sink.failed_b());
///
/// drop(tee);
/// assert_eq!(log, b"still logged\n");
/// ```
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink A: {0}")]
    A(#[source] io::Error),
    #[error("sink B: {0}")]
    B(#[source] io::Error),
    #[error("sink A: {a}; sink B: {b}")]
    Both { a: io::Error, b: io::Error },
}

impl SinkError {
    /// Combines the outcome of the same operation on both sinks.
    pub(crate) fn check(a: io::Result<()>, b: io::Result<()>) -> Result<(), Self> {
        match (a, b) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(a), Ok(())) => Err(SinkError::A(a)),
            (Ok(()), Err(b)) => Err(SinkError::B(b)),
            (Err(a), Err(b)) => Err(SinkError::Both { a, b }),
        }
    }

    /// Finds the `SinkError` carried by an error returned from a tee.
    pub fn find(err: &io::Error) -> Option<&SinkError> {
        err.get_ref()?.downcast_ref()
    }

    pub fn failed_a(&self) -> bool {
        matches!(self, SinkError::A(_) | SinkError::Both { .. })
    }

    pub fn failed_b(&self) -> bool {
        matches!(self, SinkError::B(_) | SinkError::Both { .. })
    }

    fn kind(&self) -> io::ErrorKind {
        match self {
            SinkError::A(err) | SinkError::B(err) | SinkError::Both { a: err, .. } => err.kind(),
        }
    }
}

impl From<SinkError> for io::Error {
    fn from(err: SinkError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
