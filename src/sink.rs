//! Append-only prediction log: one JSON record per line.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::model::PredictionRecord;

/// Writes prediction records as JSON lines. The engine flushes once per
/// dispatched batch, so a crash loses at most the batch in flight.
pub struct PredictionSink {
    writer: BufWriter<File>,
    path: PathBuf,
    written: u64,
}

impl PredictionSink {
    /// Open the output log for appending, creating it if absent. Existing
    /// records are never touched.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(path = %path.display(), "prediction sink open");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            written: 0,
        })
    }

    /// Append one record.
    pub fn append(&mut self, record: &PredictionRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        writeln!(self.writer, "{line}")?;
        self.written += 1;
        Ok(())
    }

    /// Push buffered records to the OS.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Records appended since open.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
