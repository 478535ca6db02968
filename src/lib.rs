//! Writer that tees text output into two sinks, usually a console and a log
//! file, with optional line timestamps and synchronous out-of-band messages.
//!
//! # Use case
//!
//! A long-running tool prints progress to the terminal and wants the very
//! same output kept in a log file, where each line carries the wall-clock
//! time and the time elapsed since the first line. The terminal copy stays
//! uncluttered. Meanwhile a watchdog or callback thread occasionally needs
//! to put an urgent line into both outputs *now*, at whatever position the
//! main output has reached, and know that it has been written before it
//! carries on.
//!
//! # Behavior
//!
//!   - Everything written to a [`Tee`] reaches both sinks in the same order.
//!     Without timestamps both sinks receive identical bytes.
//!
//!   - Timestamps are enabled per sink. A stamped line begins with a column
//!     of 32 characters such as `[2019-3-7|9:5:2|0.000132]` followed by
//!     padding. The elapsed-time clock starts with the first timestamp.
//!
//!   - [`Handle::force_message`] injects a whole line from another thread.
//!     It ends a line in progress first, never interleaves with ordinary
//!     writes, and returns once the line is in both sinks.
//!
//!   - A failing sink fails the write, but the data is still written to the
//!     other sink. The returned error says which sink failed; see
//!     [`SinkError`].
//!
//! ```
//! use dualout::Tee;
//! use std::io::Write;
//!
//! # fn main() -> std::io::Result<()> {
//! let log = tempfile::tempfile()?;
//! let mut out = Tee::stdout(log);
//! out.enable_timestamp_b();
//!
//! writeln!(out, "hello world!")?;
//! out.force_message("hello world!")?;
//! out.flush()?;
//! # Ok(())
//! # }
//! ```

mod error;
mod stamp;
mod sync;
mod tee;

pub use crate::error::SinkError;
pub use crate::stamp::Timestamp;
pub use crate::tee::{Handle, Tee};

#[doc(no_inline)]
pub use termcolor::{Color, ColorSpec, WriteColor};
