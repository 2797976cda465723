use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;

/// Routes `tracing` output to an append-only log file.
///
/// The terminal belongs to the UI, so nothing is ever written to stdout or
/// stderr. Returns an error if a global subscriber is already installed or
/// the file cannot be opened.
pub fn init(path: &Path, level: Level) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_events_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("typist.log");
        // only one global subscriber per test binary
        if init(&path, Level::INFO).is_ok() {
            tracing::info!(round = 1, "round completed");
            let contents = fs::read_to_string(&path).unwrap();
            assert!(contents.contains("round completed"));
        }
        assert!(path.exists());
    }
}
