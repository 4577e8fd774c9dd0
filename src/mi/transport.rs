//! Outgoing side of the protocol: backend input and traffic log.

use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Backend input channel.
pub trait Transport: Send {
    /// Send a complete line (including line end) to the backend.
    fn inject(&mut self, line: &str) -> std::io::Result<()>;

    /// Echo diagnostic text to the user visible debugger console.
    fn log(&mut self, text: &str);
}

/// Transport over any writer, usually the stdin pipe of the debugger process.
///
/// Diagnostics go to the `mi::console` log target.
pub struct WriterTransport<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> Transport for WriterTransport<W> {
    fn inject(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()
    }

    fn log(&mut self, text: &str) {
        log::info!(target: "mi::console", "{}", text.trim_end());
    }
}

/// Append-only record of protocol traffic.
pub trait TrafficLog: Send + Sync {
    fn log_message(&self, text: &str);

    /// Backing file, if any.
    fn file_name(&self) -> Option<&Path>;
}

/// File based traffic log.
#[derive(Clone)]
pub struct FileTracer {
    path: PathBuf,
    file: Arc<Mutex<std::fs::File>>,
}

impl FileTracer {
    pub fn new(path: &Path) -> anyhow::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open log file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl TrafficLog for FileTracer {
    fn log_message(&self, text: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", text.trim_end_matches('\n'));
        }
    }

    fn file_name(&self) -> Option<&Path> {
        Some(&self.path)
    }
}
