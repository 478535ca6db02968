use dualout::{Color::Red, ColorSpec, Handle, Tee, WriteColor};
use rayon::ThreadPoolBuilder;
use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use termcolor::{NoColor, StandardStream};

type Result<T> = std::result::Result<T, Box<dyn Error>>;
type Out = Tee<StandardStream, NoColor<File>>;

fn main() -> Result<()> {
    env_logger::init();

    // Pretend to perform work on each file in the current directory.
    let mut files = Vec::new();
    for entry in fs::read_dir(".")? {
        files.push(entry?.path());
    }
    files.sort();

    // Console on stderr, everything also kept in a log file. Only the log
    // gets timestamps.
    let log_dir = tempfile::tempdir()?;
    let log_path = log_dir.path().join("readme.log");
    let mut out = Tee::stderr(File::create(&log_path)?);
    out.enable_timestamp_b();

    let handle = out.handle();
    let done = AtomicBool::new(false);
    let mut result = Ok(());

    // One thread does the work, the other watches over it.
    let pool = ThreadPoolBuilder::new().num_threads(2).build()?;
    pool.scope(|scope| {
        let (out, done, result) = (&mut out, &done, &mut result);
        scope.spawn(move |_| {
            *result = work(out, &files);
            done.store(true, Ordering::Release);
        });
        scope.spawn(move |_| watchdog(&handle, done));
    });
    result?;

    out.flush()?;
    drop(out);
    eprintln!("\nlog written to {}:\n", log_path.display());
    eprint!("{}", fs::read_to_string(&log_path)?);
    Ok(())
}

fn work(out: &mut Out, inputs: &[PathBuf]) -> std::io::Result<()> {
    for path in inputs {
        evaluate(out, path)?;
    }
    Ok(())
}

fn evaluate(out: &mut Out, path: &Path) -> std::io::Result<()> {
    write!(out, "evaluating ")?;
    out.set_color(ColorSpec::new().set_bold(true))?;
    writeln!(out, "{}", path.display())?;
    out.reset()?;

    // Do some expensive work...
    let string = path.to_string_lossy();
    thread::sleep(Duration::from_millis(40 * string.len() as u64));

    // ... which may fail or succeed.
    if string.contains('c') {
        out.set_color(ColorSpec::new().set_bold(true).set_fg(Some(Red)))?;
        write!(out, "  ERROR")?;
        out.reset()?;
        writeln!(out, ": path contains the letter 'c'")?;
    }
    Ok(())
}

fn watchdog(handle: &Handle<StandardStream, NoColor<File>>, done: &AtomicBool) {
    let mut ticks = 0;
    while !done.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(250));
        ticks += 1;
        if ticks % 4 == 0 {
            let message = format!("watchdog: still running after {}s", ticks / 4);
            if let Err(err) = handle.force_message(&message) {
                eprintln!("watchdog: {}", err);
                return;
            }
        }
    }
}
