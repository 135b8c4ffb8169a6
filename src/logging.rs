use crate::config::{default_log_path, Config};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

/// Sends tracing output to a file; the terminal belongs to the UI.
pub fn init(config: &Config) -> io::Result<PathBuf> {
    let path = config
        .log_file
        .clone()
        .or_else(default_log_path)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no data directory for logs"))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(config.log_level)
        .init();

    Ok(path)
}
