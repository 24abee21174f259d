use anyhow::Context;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{Level, debug, error, info, trace, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::constants::{LOG_FILE_NAME, LOG_TO_FILE_ENV};
use crate::env_file::get_parley_dir;

/// Append-only copy of every diagnostic line, open when PARLEY_LOG_TO_FILE is set
static MIRROR: Mutex<Option<File>> = Mutex::new(None);

/// Diagnostics reach stderr only when RUST_LOG is set, so nothing lands
/// between the chat prompts by default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = env::var_os("RUST_LOG").map(|_| {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .init();

    if env::var_os(LOG_TO_FILE_ENV).is_some() {
        match open_mirror() {
            Ok(path) => log_info(&format!("Mirroring diagnostics to {}", path.display())),
            Err(e) => eprintln!("Warning: could not open the parley log file: {e:#}"),
        }
    }
}

fn open_mirror() -> anyhow::Result<PathBuf> {
    let dir = get_parley_dir()?;
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    if let Ok(mut mirror) = MIRROR.lock() {
        *mirror = Some(file);
    }
    Ok(path)
}

fn mirror_line(level: Level, msg: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{timestamp}] [{level}] [parley] {msg}")
}

fn mirror(level: Level, msg: &str) {
    if let Ok(mut guard) = MIRROR.lock()
        && let Some(file) = guard.as_mut()
    {
        let _ = writeln!(file, "{}", mirror_line(level, msg));
        let _ = file.flush();
    }
}

pub fn log_error(msg: &str) {
    error!("{msg}");
    mirror(Level::ERROR, msg);
}

pub fn log_warn(msg: &str) {
    warn!("{msg}");
    mirror(Level::WARN, msg);
}

pub fn log_info(msg: &str) {
    info!("{msg}");
    mirror(Level::INFO, msg);
}

pub fn log_debug(msg: &str) {
    debug!("{msg}");
    mirror(Level::DEBUG, msg);
}

pub fn log_trace(msg: &str) {
    trace!("{msg}");
    mirror(Level::TRACE, msg);
}
