//! Append-only line logs on disk

use errs::{ResultExt, Wrapped};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait FileLog: Send + Sync {
    fn log(&self, msg: &str) -> Result<(), Wrapped>;
}

/// Discards every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLog;

impl FileLog for NopLog {
    fn log(&self, _msg: &str) -> Result<(), Wrapped> {
        Ok(())
    }
}

/// Appends each message as one line, creating the file on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogger {
    path: PathBuf,
}

impl FileLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileLog for FileLogger {
    fn log(&self, msg: &str) -> Result<(), Wrapped> {
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .wrap("unable to open file")?;

        writeln!(file, "{msg}").wrap("unable to write to file")
    }
}
