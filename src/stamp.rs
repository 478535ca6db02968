use chrono::{DateTime, Datelike, Local, Timelike};
use std::fmt::{self, Display};
use std::time::Duration;

/// Width of the timestamp column at the start of each stamped line.
pub(crate) const WIDTH: usize = 32;

/// Moment at which a line was started.
///
/// Renders as `[YYYY-M-D|H:M:S|S.ffffff] `, with calendar fields taken from
/// the local wall clock and without zero-padding. The last part is the
/// number of seconds elapsed since the owning tee computed its first
/// timestamp.
///
/// ```
/// use dualout::Tee;
/// use std::io::Write;
///
/// let mut tee: Tee<Vec<u8>, Vec<u8>> = Tee::with_timestamps(Vec::new(), Vec::new(), true, false);
/// writeln!(tee, "hello").unwrap();
///
/// let stamp = tee.last_stamp().unwrap();
/// assert!(stamp.elapsed.as_secs() < 60);
/// assert_eq!(stamp.to_string(), tee.last_timestamp());
/// ```
///
/// The fields are read-only; assigning to them will not compile.
#[readonly::make]
#[derive(Clone, Debug, PartialEq)]
pub struct Timestamp {
    /// Local wall-clock time at which the timestamp was taken.
    pub local: DateTime<Local>,
    /// Time since the owning tee's clock was started.
    pub elapsed: Duration,
}

impl Timestamp {
    pub(crate) fn new(local: DateTime<Local>, elapsed: Duration) -> Self {
        Timestamp { local, elapsed }
    }
}

impl Display for Timestamp {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        let local = &self.local;
        let text = format!(
            "[{}-{}-{}|{}:{}:{}|{:.6}] ",
            local.year(),
            local.month(),
            local.day(),
            local.hour(),
            local.minute(),
            local.second(),
            self.elapsed.as_secs_f64(),
        );
        formatter.pad(&text)
    }
}
