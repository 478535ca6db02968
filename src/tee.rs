#[path = "handle.rs"]
mod handle;

use crate::error::SinkError;
use crate::stamp::{self, Timestamp};
use crate::sync::Mutex;
use chrono::Local;
use std::fmt::{self, Debug};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;
use termcolor::ColorChoice::Auto;
use termcolor::{ColorSpec, NoColor, StandardStream, WriteColor};

pub use self::handle::Handle;

/// Writer that duplicates everything written to it into two sinks.
///
/// Every line can be prefixed with a [`Timestamp`] padded to 32 columns,
/// chosen independently for sink A and sink B. Another thread holding a
/// [`Handle`] can inject a forced line at the current position of the stream
/// without it interleaving with ordinary output.
///
/// Sinks are taken by value. To keep ownership of a sink, pass `&mut sink`;
/// the tee then borrows it for its lifetime. The tee never closes or flushes
/// a sink on its own.
///
/// # Errors
///
/// A failing sink never keeps data from the other one. Each sink receives
/// the timestamp column and the content of a line as one unit. Once a sink
/// fails, it is skipped for the rest of that `write` call, and the healthy
/// sink still receives the whole buffer. The call then returns an error
/// wrapping a [`SinkError`](crate::SinkError).
///
/// Unlike most writers, an error from [`write`](Write::write) does not mean
/// that nothing was written. It means at least one sink missed part of the
/// buffer. Retrying the same bytes duplicates them in the healthy sink.
/// `write_all` does not retry after such an error.
///
/// # Console and log file
///
/// ```
/// use dualout::Tee;
/// use std::io::Write;
///
/// # fn main() -> std::io::Result<()> {
/// let mut console: Vec<u8> = Vec::new();
/// let mut log: Vec<u8> = Vec::new();
///
/// // Timestamps go to the log only.
/// let mut tee = Tee::with_timestamps(&mut console, &mut log, false, true);
/// writeln!(tee, "connected to {}", "camera0")?;
/// writeln!(tee, "grabbing")?;
/// let stamp = tee.last_timestamp();
/// tee.flush()?;
/// drop(tee);
///
/// assert_eq!(console, b"connected to camera0\ngrabbing\n");
///
/// let log = String::from_utf8(log).unwrap();
/// let last_line = log.lines().last().unwrap();
/// assert!(last_line.starts_with(&stamp));
/// assert!(last_line.ends_with("grabbing"));
/// # Ok(())
/// # }
/// ```
///
/// # Forced messages from another thread
///
/// ```
/// use dualout::Tee;
/// use std::io::Write;
///
/// let mut tee: Tee<Vec<u8>, Vec<u8>> = Tee::new(Vec::new(), Vec::new());
/// let handle = tee.handle();
///
/// rayon::scope(|scope| {
///     let tee = &mut tee;
///     scope.spawn(move |_| {
///         for i in 0..100 {
///             writeln!(tee, "frame {}", i).unwrap();
///         }
///     });
///     scope.spawn(move |_| {
///         // Returns once the line is in both sinks.
///         handle.force_message("trigger lost").unwrap();
///     });
/// });
///
/// let (a, b) = tee.into_inner().unwrap();
/// assert_eq!(a, b);
/// assert!(String::from_utf8(a).unwrap().lines().any(|line| line == "trigger lost"));
/// ```
pub struct Tee<A, B> {
    handle: Handle<A, B>,
}

#[cfg(test)]
struct _Test
where
    Tee<Vec<u8>, Vec<u8>>: Send + Sync,
    Handle<Vec<u8>, Vec<u8>>: Send + Sync;

struct Inner<A, B> {
    a: A,
    b: B,
    timestamp_a: bool,
    timestamp_b: bool,
    at_line_start: bool,
    /// Reference point of the elapsed time, set by the first timestamp.
    started: Option<Instant>,
    last: Option<Timestamp>,
}

impl<A, B> Tee<A, B> {
    /// Makes a tee over two sinks, with timestamps disabled on both.
    pub fn new(a: A, b: B) -> Self {
        Tee::with_timestamps(a, b, false, false)
    }

    /// Makes a tee over two sinks, with timestamps preset per sink.
    pub fn with_timestamps(a: A, b: B, timestamp_a: bool, timestamp_b: bool) -> Self {
        let inner = Inner {
            a,
            b,
            timestamp_a,
            timestamp_b,
            at_line_start: true,
            started: None,
            last: None,
        };
        Tee {
            handle: Handle::new(Arc::new(Mutex::new(inner))),
        }
    }

    /// Returns a handle to this tee that can be sent to other threads.
    pub fn handle(&self) -> Handle<A, B> {
        self.handle.clone()
    }

    /// Prefixes lines of sink A with a timestamp, starting at the next line.
    pub fn enable_timestamp_a(&self) {
        self.handle.enable_timestamp_a();
    }

    /// Prefixes lines of sink B with a timestamp, starting at the next line.
    pub fn enable_timestamp_b(&self) {
        self.handle.enable_timestamp_b();
    }

    /// Stops timestamping sink A, starting at the next line.
    pub fn disable_timestamp_a(&self) {
        self.handle.disable_timestamp_a();
    }

    /// Stops timestamping sink B, starting at the next line.
    pub fn disable_timestamp_b(&self) {
        self.handle.disable_timestamp_b();
    }

    /// The most recently computed timestamp, exactly as it was prefixed to
    /// the line. Empty if no timestamp has been computed yet.
    pub fn last_timestamp(&self) -> String {
        self.handle.last_timestamp()
    }

    /// The most recently computed timestamp as a value.
    pub fn last_stamp(&self) -> Option<Timestamp> {
        self.handle.last_stamp()
    }

    /// Whether the next byte written begins a new line.
    pub fn at_line_start(&self) -> bool {
        self.handle.inner.lock().at_line_start
    }

    /// Gives back both sinks, unless a [`Handle`] to this tee is still alive.
    pub fn into_inner(self) -> Result<(A, B), Self> {
        match Arc::try_unwrap(self.handle.inner) {
            Ok(inner) => {
                let inner = inner.into_inner();
                Ok((inner.a, inner.b))
            }
            Err(inner) => Err(Tee {
                handle: Handle::new(inner),
            }),
        }
    }
}

impl<A: Write, B: Write> Tee<A, B> {
    /// Writes `message` and a newline to both sinks as a line of its own.
    ///
    /// See [`Handle::force_message`].
    pub fn force_message(&self, message: &str) -> io::Result<()> {
        self.handle.force_message(message)
    }
}

impl<W: Write> Tee<StandardStream, NoColor<W>> {
    /// Makes a tee whose sink A is stdout and whose sink B is `log`.
    ///
    /// Stdout is colored when it is a terminal. Color changes made through
    /// [`WriteColor`] never reach `log`.
    pub fn stdout(log: W) -> Self {
        Tee::new(StandardStream::stdout(Auto), NoColor::new(log))
    }

    /// Makes a tee whose sink A is stderr and whose sink B is `log`.
    pub fn stderr(log: W) -> Self {
        Tee::new(StandardStream::stderr(Auto), NoColor::new(log))
    }
}

impl<A, B> Debug for Tee<A, B> {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let inner = self.handle.inner.lock();
        formatter
            .debug_struct("Tee")
            .field("timestamp_a", &inner.timestamp_a)
            .field("timestamp_b", &inner.timestamp_b)
            .field("at_line_start", &inner.at_line_start)
            .finish_non_exhaustive()
    }
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle.inner.lock().write_lines(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.inner.lock().flush()?;
        Ok(())
    }
}

impl<A: WriteColor, B: WriteColor> WriteColor for Tee<A, B> {
    fn supports_color(&self) -> bool {
        let inner = self.handle.inner.lock();
        inner.a.supports_color() || inner.b.supports_color()
    }

    fn set_color(&mut self, spec: &ColorSpec) -> io::Result<()> {
        self.handle.inner.lock().color(Some(spec))?;
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        self.handle.inner.lock().color(None)?;
        Ok(())
    }
}

impl<A: Write, B: Write> Inner<A, B> {
    /// Forwards `buf` line by line. A sink that fails is skipped for the
    /// rest of `buf` while the other one keeps receiving it.
    fn write_lines(&mut self, buf: &[u8]) -> Result<(), SinkError> {
        let mut a = Ok(());
        let mut b = Ok(());
        let mut rest = buf;
        while !rest.is_empty() {
            let end = rest
                .iter()
                .position(|&byte| byte == b'\n')
                .map_or(rest.len(), |newline| newline + 1);
            let (line, tail) = rest.split_at(end);
            let column = if self.at_line_start {
                self.column()
            } else {
                String::new()
            };
            self.at_line_start = line.ends_with(b"\n");
            let (column_a, column_b) = self.columns(&column);
            if a.is_ok() {
                a = emit(&mut self.a, &[column_a, line]);
            }
            if b.is_ok() {
                b = emit(&mut self.b, &[column_b, line]);
            }
            rest = tail;
        }
        SinkError::check(a, b).map_err(report)
    }

    fn force(&mut self, message: &str) -> Result<(), SinkError> {
        log::debug!("forcing message of {} bytes", message.len());
        let line_break: &[u8] = if self.at_line_start { b"" } else { b"\n" };
        self.at_line_start = true;
        let column = self.column();
        let (column_a, column_b) = self.columns(&column);
        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');
        let parts_a = [line_break, column_a, line.as_bytes()];
        let parts_b = [line_break, column_b, line.as_bytes()];
        let a = emit(&mut self.a, &parts_a);
        let b = emit(&mut self.b, &parts_b);
        SinkError::check(a, b).map_err(report)
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        let a = self.a.flush();
        let b = self.b.flush();
        SinkError::check(a, b).map_err(report)
    }
}

impl<A, B> Inner<A, B> {
    /// Timestamp column for a line starting now, or an empty string if
    /// neither sink wants one.
    fn column(&mut self) -> String {
        if !self.timestamp_a && !self.timestamp_b {
            return String::new();
        }
        let timestamp = self.now();
        let column = format!("{:<width$}", timestamp, width = stamp::WIDTH);
        self.last = Some(timestamp);
        column
    }

    fn columns<'a>(&self, column: &'a str) -> (&'a [u8], &'a [u8]) {
        let pick = |enabled: bool| if enabled { column.as_bytes() } else { &b""[..] };
        (pick(self.timestamp_a), pick(self.timestamp_b))
    }

    fn now(&mut self) -> Timestamp {
        let started = match self.started {
            Some(started) => started,
            None => {
                log::trace!("starting timestamp clock");
                *self.started.get_or_insert_with(Instant::now)
            }
        };
        Timestamp::new(Local::now(), started.elapsed())
    }
}

impl<A: WriteColor, B: WriteColor> Inner<A, B> {
    fn color(&mut self, spec: Option<&ColorSpec>) -> Result<(), SinkError> {
        let (a, b) = match spec {
            Some(spec) => (self.a.set_color(spec), self.b.set_color(spec)),
            None => (self.a.reset(), self.b.reset()),
        };
        SinkError::check(a, b).map_err(report)
    }
}

/// Writes `parts` to one sink in order, stopping at the first failure.
fn emit<W: Write>(sink: &mut W, parts: &[&[u8]]) -> io::Result<()> {
    for part in parts {
        sink.write_all(part)?;
    }
    Ok(())
}

fn report(err: SinkError) -> SinkError {
    log::debug!("tee sink failed: {}", err);
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::{Ansi, Color};

    type Buffers = Tee<Vec<u8>, Vec<u8>>;

    fn text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    fn strip_column(line: &str) -> &str {
        assert!(line.starts_with('['), "missing timestamp: {:?}", line);
        let end = line.find("] ").unwrap() + 2;
        line[end..].trim_start_matches(' ')
    }

    #[test]
    fn copies_without_timestamps() {
        let mut tee = Buffers::new(Vec::new(), Vec::new());
        tee.write_all(b"line1\nline2\n").unwrap();
        let (a, b) = tee.into_inner().unwrap();
        assert_eq!(a, b"line1\nline2\n");
        assert_eq!(a, b);
    }

    #[test]
    fn tracks_line_start_across_writes() {
        let mut tee = Buffers::new(Vec::new(), Vec::new());
        assert!(tee.at_line_start());
        tee.write_all(b"par").unwrap();
        assert!(!tee.at_line_start());
        tee.write_all(b"tial\nnext").unwrap();
        assert!(!tee.at_line_start());
        tee.write_all(b"\n").unwrap();
        assert!(tee.at_line_start());
    }

    #[test]
    fn stamps_only_at_line_start() {
        let mut tee = Buffers::with_timestamps(Vec::new(), Vec::new(), true, false);
        tee.write_all(b"one ").unwrap();
        tee.write_all(b"line\ntwo").unwrap();
        tee.write_all(b"\n").unwrap();
        let (a, b) = tee.into_inner().unwrap();

        assert_eq!(text(b), "one line\ntwo\n");
        let a = text(a);
        let lines: Vec<&str> = a.lines().map(strip_column).collect();
        assert_eq!(lines, ["one line", "two"]);
        assert_eq!(a.matches('[').count(), 2);
    }

    #[test]
    fn column_is_padded() {
        let mut tee = Buffers::with_timestamps(Vec::new(), Vec::new(), false, true);
        tee.write_all(b"x\n").unwrap();
        let stamp = tee.last_timestamp();
        let (_, b) = tee.into_inner().unwrap();
        let b = text(b);
        let column = format!("{:<32}", stamp);
        assert!(b.starts_with(&column));
        assert_eq!(&b[column.len()..], "x\n");
    }

    #[test]
    fn empty_write_starts_no_line() {
        let mut tee = Buffers::with_timestamps(Vec::new(), Vec::new(), true, true);
        assert_eq!(tee.write(b"").unwrap(), 0);
        assert_eq!(tee.last_timestamp(), "");
        assert!(tee.last_stamp().is_none());
        let (a, b) = tee.into_inner().unwrap();
        assert!(a.is_empty() && b.is_empty());
    }

    #[test]
    fn toggling_applies_from_next_line() {
        let mut tee = Buffers::new(Vec::new(), Vec::new());
        tee.write_all(b"plain\n").unwrap();
        tee.enable_timestamp_b();
        tee.write_all(b"stamped").unwrap();
        tee.disable_timestamp_b();
        tee.write_all(b" still same line\nplain again\n").unwrap();
        let (a, b) = tee.into_inner().unwrap();

        assert_eq!(text(a), "plain\nstamped still same line\nplain again\n");
        let b = text(b);
        let lines: Vec<&str> = b.lines().collect();
        assert_eq!(lines[0], "plain");
        assert_eq!(strip_column(lines[1]), "stamped still same line");
        assert_eq!(lines[2], "plain again");
    }

    #[test]
    fn forced_message_breaks_current_line() {
        let mut tee = Buffers::new(Vec::new(), Vec::new());
        tee.write_all(b"half").unwrap();
        tee.force_message("hello").unwrap();
        assert!(tee.at_line_start());
        tee.write_all(b"rest\n").unwrap();
        let (a, b) = tee.into_inner().unwrap();
        assert_eq!(text(a), "half\nhello\nrest\n");
        assert_eq!(b, b"half\nhello\nrest\n");
    }

    #[test]
    fn forced_message_at_line_start() {
        let mut tee = Buffers::new(Vec::new(), Vec::new());
        tee.write_all(b"done\n").unwrap();
        tee.force_message("hello").unwrap();
        let (a, b) = tee.into_inner().unwrap();
        assert_eq!(text(a.clone()), "done\nhello\n");
        assert_eq!(a, b);
    }

    #[test]
    fn forced_message_is_stamped() {
        let tee = Buffers::with_timestamps(Vec::new(), Vec::new(), true, false);
        tee.force_message("hello").unwrap();
        let stamp = tee.last_timestamp();
        assert!(!stamp.is_empty());
        let (a, b) = tee.into_inner().unwrap();
        assert_eq!(text(a), format!("{:<32}hello\n", stamp));
        assert_eq!(text(b), "hello\n");
    }

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn forced_message_survives_failing_sink() {
        let mut tee = Tee::with_timestamps(Closed, Vec::<u8>::new(), true, true);
        tee.write_all(b"half").unwrap_err();
        let err = tee.force_message("hello").unwrap_err();
        assert!(SinkError::find(&err).unwrap().failed_a());
        let stamp = tee.last_timestamp();
        let (_, b) = tee.into_inner().unwrap();

        let b = text(b);
        let lines: Vec<&str> = b.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(strip_column(lines[0]), "half");
        assert_eq!(lines[1], format!("{:<32}hello", stamp));
    }

    #[test]
    fn into_inner_waits_for_handles() {
        let tee = Buffers::new(Vec::new(), Vec::new());
        let handle = tee.handle();
        let tee = tee.into_inner().unwrap_err();
        drop(handle);
        assert!(tee.into_inner().is_ok());
    }

    #[test]
    fn colors_reach_both_color_sinks() {
        let mut tee = Tee::new(Ansi::new(Vec::<u8>::new()), NoColor::new(Vec::<u8>::new()));
        assert!(tee.supports_color());
        tee.set_color(ColorSpec::new().set_fg(Some(Color::Red))).unwrap();
        tee.write_all(b"alert\n").unwrap();
        tee.reset().unwrap();
        let (a, b) = tee.into_inner().unwrap();

        let a = text(a.into_inner());
        assert!(a.starts_with("\x1b[0m\x1b[31m"));
        assert!(a.contains("alert\n"));
        assert_eq!(b.into_inner(), b"alert\n");
    }

    #[test]
    fn debug_shows_flags() {
        let tee = Buffers::with_timestamps(Vec::new(), Vec::new(), true, false);
        let debug = format!("{:?}", tee);
        assert!(debug.contains("timestamp_a: true"));
        assert!(debug.contains("timestamp_b: false"));
    }
}
