//! Session logger — one log file per run in the OS data directory.
//!
//! The file is truncated when the logger starts, so it only ever holds the
//! latest run:
//!   Windows:  `%APPDATA%\PixelFE\pixelfe.log`
//!   Linux:    `$XDG_DATA_HOME/PixelFE/pixelfe.log` (or `~/.local/share/...`)
//!   macOS:    `~/Library/Application Support/PixelFE/pixelfe.log`
//!
//! Use the `log_info!` / `log_warn!` / `log_err!` macros anywhere in the
//! crate. Before [`init`] runs (library use, unit tests) lines go nowhere,
//! unless stderr mirroring is switched on with [`set_echo_stderr`].

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info  => "INFO",
            Level::Warn  => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

struct Sink {
    path: PathBuf,
    file: Mutex<File>,
}

static SINK: OnceLock<Sink> = OnceLock::new();
static ECHO_STDERR: AtomicBool = AtomicBool::new(false);

/// Where this run's log is being written, once [`init`] succeeded.
pub fn log_path() -> Option<&'static Path> {
    SINK.get().map(|s| s.path.as_path())
}

/// Mirror every log line to stderr as well (`--verbose`).
pub fn set_echo_stderr(on: bool) {
    ECHO_STDERR.store(on, Ordering::Relaxed);
}

/// Append a raw line. I/O errors are swallowed: logging never fails an edit.
pub fn write_line(line: &str) {
    if ECHO_STDERR.load(Ordering::Relaxed) {
        eprintln!("{line}");
    }
    if let Some(sink) = SINK.get()
        && let Ok(mut file) = sink.file.lock()
    {
        let _ = writeln!(file, "{line}");
    }
}

/// Append a `[HH:MM:SS] [LEVEL] message` line.
pub fn write(level: Level, msg: &str) {
    write_line(&format_line(level, &clock(), msg));
}

fn format_line(level: Level, clock: &str, msg: &str) -> String {
    format!("[{clock}] [{level}] {msg}")
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::Level::Error, &format!($($arg)*))
    };
}

/// Start logging to the default location.
pub fn init() {
    init_at(&data_dir().join("PixelFE").join("pixelfe.log"));
}

/// Start logging to `path`, truncating it, and mirror panics into the log.
/// Only the first successful call in a process has any effect.
pub fn init_at(path: &Path) {
    if SINK.get().is_some() {
        return;
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    if SINK.set(Sink { path: path.to_path_buf(), file: Mutex::new(file) }).is_err() {
        return;
    }

    let started = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    write_line(&format!(
        "=== PixelFE {} run started (unix {}) ===",
        env!("CARGO_PKG_VERSION"),
        started
    ));
    write_line(&format!("Log file: {}", path.display()));

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(Level::Panic, &info.to_string());
        previous_hook(info);
    }));
}

/// Platform data directory, without the app folder.
fn data_dir() -> PathBuf {
    let from_env = |key: &str| std::env::var_os(key).map(PathBuf::from);

    #[cfg(target_os = "windows")]
    if let Some(appdata) = from_env("APPDATA") {
        return appdata;
    }
    #[cfg(target_os = "macos")]
    if let Some(home) = from_env("HOME") {
        return home.join("Library").join("Application Support");
    }

    from_env("XDG_DATA_HOME")
        .or_else(|| from_env("HOME").map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Wall-clock time of day (UTC), HH:MM:SS.
fn clock() -> String {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs() % 86_400;
            format!("{:02}:{:02}:{:02}", secs / 3600, secs % 3600 / 60, secs % 60)
        }
        Err(_) => "??:??:??".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_layout() {
        assert_eq!(
            format_line(Level::Warn, "01:02:03", "crop: no image loaded"),
            "[01:02:03] [WARN] crop: no image loaded"
        );
        assert_eq!(Level::Error.to_string(), "ERROR");
    }

    #[test]
    fn clock_is_time_of_day() {
        let c = clock();
        assert_eq!(c.len(), 8);
        assert_eq!(&c[2..3], ":");
        assert_eq!(&c[5..6], ":");
    }

    #[test]
    fn logging_without_init_is_silent() {
        crate::log_info!("loaded {}x{}", 2, 2);
        crate::log_warn!("render: {}", "degenerate");
        crate::log_err!("{}", 3);
    }
}
